//! External process invocation.
//!
//! Every tool this crate drives (the Go toolchain, UPX) goes through the
//! [`CommandRunner`] trait so tests can substitute a recording double for the
//! real process launcher.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::process::{Command, ExitStatus, Stdio};

use tracing::debug;

/// A fully described external command.
///
/// `envs` are applied to the child only; the orchestrator's own environment is
/// never modified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
  pub program: String,
  pub args: Vec<String>,
  pub envs: BTreeMap<String, String>,
  pub current_dir: Option<PathBuf>,
}

impl CommandSpec {
  pub fn new(program: impl Into<String>) -> Self {
    Self {
      program: program.into(),
      args: Vec::new(),
      envs: BTreeMap::new(),
      current_dir: None,
    }
  }

  pub fn arg(mut self, arg: impl Into<String>) -> Self {
    self.args.push(arg.into());
    self
  }

  pub fn args<I, S>(mut self, args: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.args.extend(args.into_iter().map(Into::into));
    self
  }

  pub fn envs(mut self, envs: BTreeMap<String, String>) -> Self {
    self.envs.extend(envs);
    self
  }

  pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
    self.current_dir = Some(dir.into());
    self
  }

  fn to_command(&self) -> Command {
    let mut command = Command::new(&self.program);
    command.args(&self.args).envs(&self.envs);
    if let Some(dir) = &self.current_dir {
      command.current_dir(dir);
    }
    command
  }
}

/// Renders as a copy-pasteable shell line: `KEY=value program arg...`.
impl fmt::Display for CommandSpec {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let mut parts: Vec<String> = self.envs.iter().map(|(k, v)| format!("{k}={}", shell_quote(v))).collect();
    parts.push(shell_quote(&self.program));
    parts.extend(self.args.iter().map(|a| shell_quote(a)));
    write!(f, "{}", parts.join(" "))
  }
}

fn shell_quote(value: &str) -> String {
  let plain = !value.is_empty()
    && value
      .chars()
      .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/' | '=' | ':' | ','));

  if plain {
    value.to_string()
  } else {
    format!("'{}'", value.replace('\'', r"'\''"))
  }
}

/// Errors from launching or waiting on an external process.
#[derive(Debug)]
pub enum ProcessError {
  /// The program could not be started (missing binary, permissions)
  Spawn { program: String, source: std::io::Error },
  /// The program ran but exited unsuccessfully
  Failed { program: String, status: ExitStatus },
  /// The program's standard output was not UTF-8
  NonUtf8Output { program: String },
}

impl fmt::Display for ProcessError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Spawn { program, source } => write!(f, "failed to start `{program}`: {source}"),
      Self::Failed { program, status } => write!(f, "`{program}` exited with {status}"),
      Self::NonUtf8Output { program } => write!(f, "`{program}` produced non UTF-8 output"),
    }
  }
}

impl std::error::Error for ProcessError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      Self::Spawn { source, .. } => Some(source),
      _ => None,
    }
  }
}

/// Runs external commands and blocks until they exit.
pub trait CommandRunner {
  /// Run a command with inherited stdio; succeed only on a zero exit status.
  fn run(&self, spec: &CommandSpec) -> Result<(), ProcessError>;

  /// Run a command and capture its standard output.
  fn capture(&self, spec: &CommandSpec) -> Result<String, ProcessError>;
}

/// Launches real processes. There is no timeout: a hung tool hangs the caller.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
  fn run(&self, spec: &CommandSpec) -> Result<(), ProcessError> {
    debug!("Running: {spec}");

    let status = spec.to_command().status().map_err(|source| ProcessError::Spawn {
      program: spec.program.clone(),
      source,
    })?;

    if !status.success() {
      return Err(ProcessError::Failed {
        program: spec.program.clone(),
        status,
      });
    }

    Ok(())
  }

  fn capture(&self, spec: &CommandSpec) -> Result<String, ProcessError> {
    debug!("Capturing: {spec}");

    let output = spec
      .to_command()
      .stdin(Stdio::null())
      .stderr(Stdio::inherit())
      .output()
      .map_err(|source| ProcessError::Spawn {
        program: spec.program.clone(),
        source,
      })?;

    if !output.status.success() {
      return Err(ProcessError::Failed {
        program: spec.program.clone(),
        status: output.status,
      });
    }

    String::from_utf8(output.stdout).map_err(|_| ProcessError::NonUtf8Output {
      program: spec.program.clone(),
    })
  }
}
