//! Release pipeline: probe, stamp, build, revert.
//!
//! The metadata file is stamped through a [`StampGuard`], so it is reverted on
//! every exit path once stamping succeeds, including build failures and an
//! unsupported host.

use std::fmt;
use std::path::PathBuf;

use chrono::NaiveDate;
use tracing::{error, info, warn};

use crate::driver::{BuildDriver, BuildError, BuildSettings};
use crate::metadata::MetadataFields;
use crate::platform::TargetPlatform;
use crate::process::CommandRunner;
use crate::stamp::{StampError, StampGuard, StampState, Stamper};
use crate::toolchain::{ProbeError, probe_toolchain_version};

/// How the target platform is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformSelection {
  /// Build for the machine running the pipeline
  Host,
  /// Build for an explicitly requested platform
  Explicit(TargetPlatform),
}

impl PlatformSelection {
  /// The platform to build, or `None` when the host OS is unsupported.
  pub fn resolve(self, host_os: &str) -> Option<TargetPlatform> {
    match self {
      Self::Host => TargetPlatform::from_os(host_os),
      Self::Explicit(platform) => Some(platform),
    }
  }
}

/// What a completed pipeline run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
  /// A binary was built and compressed
  Built { platform: TargetPlatform, artifact: PathBuf },
  /// The host OS matches no supported platform; nothing was built
  Unsupported { os: String },
}

/// Errors that abort the pipeline.
#[derive(Debug)]
pub enum PipelineError {
  /// The toolchain version could not be determined (nothing was stamped)
  Probe(ProbeError),
  /// The metadata file was not in the unstamped state before the run
  NotUnstamped { path: PathBuf, state: StampState },
  /// Reading, stamping, or reverting the metadata file failed
  Stamp(StampError),
  /// Compiling or compressing failed (the metadata file has been reverted)
  Build(BuildError),
}

impl fmt::Display for PipelineError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Probe(err) => write!(f, "{err}"),
      Self::NotUnstamped { path, state } => write!(
        f,
        "{} is {state}, expected every metadata literal at its placeholder; restore it before releasing",
        path.display()
      ),
      Self::Stamp(err) => write!(f, "{err}"),
      Self::Build(err) => write!(f, "{err}"),
    }
  }
}

impl std::error::Error for PipelineError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      Self::Probe(err) => Some(err),
      Self::Stamp(err) => Some(err),
      Self::Build(err) => Some(err),
      Self::NotUnstamped { .. } => None,
    }
  }
}

impl PipelineError {
  /// Process exit code reported for this failure.
  pub fn exit_code(&self) -> i32 {
    match self {
      Self::Build(_) => 1,
      Self::Probe(_) => 2,
      Self::NotUnstamped { .. } | Self::Stamp(_) => 5,
    }
  }
}

impl From<ProbeError> for PipelineError {
  fn from(err: ProbeError) -> Self {
    Self::Probe(err)
  }
}

impl From<StampError> for PipelineError {
  fn from(err: StampError) -> Self {
    Self::Stamp(err)
  }
}

impl From<BuildError> for PipelineError {
  fn from(err: BuildError) -> Self {
    Self::Build(err)
  }
}

/// Sequences the stamper and the build driver.
pub struct Orchestrator<'a> {
  runner: &'a dyn CommandRunner,
  stamper: Stamper,
  settings: BuildSettings,
  host_os: String,
  today: Option<NaiveDate>,
}

impl<'a> Orchestrator<'a> {
  pub fn new(runner: &'a dyn CommandRunner, stamper: Stamper, settings: BuildSettings) -> Self {
    Self {
      runner,
      stamper,
      settings,
      host_os: std::env::consts::OS.to_string(),
      today: None,
    }
  }

  /// Pretend to run on a different operating system.
  pub fn with_host_os(mut self, os: impl Into<String>) -> Self {
    self.host_os = os.into();
    self
  }

  /// Stamp a fixed date instead of today's local date.
  pub fn with_date(mut self, date: NaiveDate) -> Self {
    self.today = Some(date);
    self
  }

  pub fn host_os(&self) -> &str {
    &self.host_os
  }

  /// Probe the toolchain and resolve the values this run will stamp.
  pub fn resolve_fields(&self) -> Result<MetadataFields, PipelineError> {
    let toolchain = probe_toolchain_version(self.runner, &self.settings.go_program)?;
    Ok(match self.today {
      Some(date) => MetadataFields::resolve(date, toolchain),
      None => MetadataFields::resolve_today(toolchain),
    })
  }

  /// Run the whole pipeline.
  ///
  /// The metadata file ends unstamped whether the build succeeds or fails. If
  /// both the build and the revert fail, the build error is returned and the
  /// revert error is logged.
  pub fn run(&self, selection: PlatformSelection) -> Result<RunOutcome, PipelineError> {
    let fields = self.resolve_fields()?;

    let state = self.stamper.inspect(&fields)?;
    if state != StampState::Unstamped {
      return Err(PipelineError::NotUnstamped {
        path: self.stamper.path().to_path_buf(),
        state,
      });
    }

    let guard = StampGuard::acquire(&self.stamper, &fields)?;
    let result = self.dispatch(selection);

    match (result, guard.release()) {
      (Ok(outcome), Ok(_)) => Ok(outcome),
      (Ok(_), Err(revert)) => Err(revert.into()),
      (Err(build), Ok(_)) => Err(build.into()),
      (Err(build), Err(revert)) => {
        error!("Failed to revert metadata after build failure: {revert}");
        Err(build.into())
      }
    }
  }

  fn dispatch(&self, selection: PlatformSelection) -> Result<RunOutcome, BuildError> {
    let Some(platform) = selection.resolve(&self.host_os) else {
      warn!("No build target for host OS {}", self.host_os);
      return Ok(RunOutcome::Unsupported {
        os: self.host_os.clone(),
      });
    };

    let artifact = BuildDriver::new(self.runner, &self.settings).build(platform)?;
    info!("Built {}", artifact.display());
    Ok(RunOutcome::Built { platform, artifact })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_selection_prefers_explicit_platform() {
    let selection = PlatformSelection::Explicit(TargetPlatform::WindowsAmd64);
    assert_eq!(selection.resolve("linux"), Some(TargetPlatform::WindowsAmd64));
  }

  #[test]
  fn test_selection_host_unsupported() {
    assert_eq!(PlatformSelection::Host.resolve("freebsd"), None);
    assert_eq!(
      PlatformSelection::Host.resolve("linux"),
      Some(TargetPlatform::LinuxAmd64)
    );
  }
}
