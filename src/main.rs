//! release-stamp - Stamp, build, compress, and revert a Go release binary
//!
//! This is the main entry point for the CLI application.

fn main() {
  release_stamp::cli::run();
}
