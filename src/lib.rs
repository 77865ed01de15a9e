//! Release build orchestration for a single Go binary.
//!
//! Stamps the build date and toolchain version into a version source file,
//! cross-compiles and compresses the binary for one platform, then reverts the
//! version file to its placeholder form.

pub mod cli;
pub mod color;
pub mod commands;
pub mod driver;
pub mod metadata;
pub mod orchestrator;
pub mod platform;
pub mod process;
pub mod stamp;
pub mod toolchain;
