//! CLI subcommand handlers.
//!
//! This module groups the implementations for each `release-stamp`
//! subcommand, keeping `cli.rs` focused on argument definitions.

pub mod build;
pub mod completions;
pub mod stamp;
pub mod version;
