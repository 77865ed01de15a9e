//! Recording command runner for testing
//!
//! Records every command the pipeline issues instead of launching processes,
//! answers `go version` with a canned string, and can be told to fail
//! specific programs.

use std::cell::RefCell;
use std::collections::HashSet;
use std::fs;
use std::os::unix::process::ExitStatusExt;
use std::path::PathBuf;
use std::process::ExitStatus;

use release_stamp::process::{CommandRunner, CommandSpec, ProcessError};

pub const GO_VERSION_OUTPUT: &str = "go version go1.22.1 linux/amd64\n";

/// A fake runner that records commands and returns scripted results
pub struct FakeRunner {
  version_output: Option<String>,
  failing_programs: HashSet<String>,
  watched_file: Option<PathBuf>,
  commands: RefCell<Vec<CommandSpec>>,
  observed: RefCell<Vec<String>>,
}

impl FakeRunner {
  /// Create a runner where every command succeeds
  pub fn new() -> Self {
    Self {
      version_output: Some(GO_VERSION_OUTPUT.to_string()),
      failing_programs: HashSet::new(),
      watched_file: None,
      commands: RefCell::new(Vec::new()),
      observed: RefCell::new(Vec::new()),
    }
  }

  /// Make `run` calls of `program` exit with status 1 (the version probe
  /// is scripted separately)
  pub fn failing(mut self, program: &str) -> Self {
    self.failing_programs.insert(program.to_string());
    self
  }

  /// Replace the `go version` output, or make the probe fail with `None`
  pub fn with_version_output(mut self, output: Option<&str>) -> Self {
    self.version_output = output.map(str::to_string);
    self
  }

  /// Snapshot `path` every time a command runs
  pub fn watching(mut self, path: impl Into<PathBuf>) -> Self {
    self.watched_file = Some(path.into());
    self
  }

  /// Every command issued so far, in order
  pub fn commands(&self) -> Vec<CommandSpec> {
    self.commands.borrow().clone()
  }

  /// Programs issued so far, in order
  pub fn programs(&self) -> Vec<String> {
    self.commands.borrow().iter().map(|c| c.program.clone()).collect()
  }

  /// Watched file contents captured at each `run` call
  pub fn observed(&self) -> Vec<String> {
    self.observed.borrow().clone()
  }

  fn failure(program: &str) -> ProcessError {
    ProcessError::Failed {
      program: program.to_string(),
      status: ExitStatus::from_raw(1 << 8),
    }
  }
}

impl CommandRunner for FakeRunner {
  fn run(&self, spec: &CommandSpec) -> Result<(), ProcessError> {
    self.commands.borrow_mut().push(spec.clone());

    if let Some(path) = &self.watched_file {
      self.observed.borrow_mut().push(fs::read_to_string(path).unwrap_or_default());
    }

    if self.failing_programs.contains(&spec.program) {
      return Err(Self::failure(&spec.program));
    }

    Ok(())
  }

  fn capture(&self, spec: &CommandSpec) -> Result<String, ProcessError> {
    self.commands.borrow_mut().push(spec.clone());

    match &self.version_output {
      Some(output) => Ok(output.clone()),
      None => Err(ProcessError::Spawn {
        program: spec.program.clone(),
        source: std::io::Error::from(std::io::ErrorKind::NotFound),
      }),
    }
  }
}
