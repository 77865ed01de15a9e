//! Toolchain version probe.
//!
//! Asks the Go toolchain for its version so it can be stamped next to the
//! build date. This is a one-shot preflight: any failure aborts the run.

use std::fmt;

use tracing::debug;

use crate::process::{CommandRunner, CommandSpec, ProcessError};

/// Errors from probing the toolchain version.
#[derive(Debug)]
pub enum ProbeError {
  /// The version command could not be run or failed
  Command(ProcessError),
  /// The version command printed something other than `<tool> version <tokens...>`
  UnexpectedOutput(String),
}

impl fmt::Display for ProbeError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Command(err) => write!(f, "toolchain version query failed: {err}"),
      Self::UnexpectedOutput(output) => write!(f, "unexpected toolchain version output: {output:?}"),
    }
  }
}

impl std::error::Error for ProbeError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      Self::Command(err) => Some(err),
      Self::UnexpectedOutput(_) => None,
    }
  }
}

impl From<ProcessError> for ProbeError {
  fn from(err: ProcessError) -> Self {
    Self::Command(err)
  }
}

/// The command used to query the toolchain version.
pub fn version_command(program: &str) -> CommandSpec {
  CommandSpec::new(program).arg("version")
}

/// Run `<program> version` and extract the version tokens.
pub fn probe_toolchain_version(runner: &dyn CommandRunner, program: &str) -> Result<String, ProbeError> {
  let output = runner.capture(&version_command(program))?;
  let version = parse_version_output(&output)?;
  debug!("Toolchain version: {version}");
  Ok(version)
}

/// Extract the version from `go version` style output.
///
/// The output is `<tool> version <version> <platform>...`; everything after the
/// literal `version` field is joined with single spaces.
pub fn parse_version_output(output: &str) -> Result<String, ProbeError> {
  let fields: Vec<&str> = output.split_whitespace().collect();

  match fields.as_slice() {
    [_tool, "version", rest @ ..] if !rest.is_empty() => Ok(rest.join(" ")),
    _ => Err(ProbeError::UnexpectedOutput(output.trim().to_string())),
  }
}
