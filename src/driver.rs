//! Platform build driver.
//!
//! Compiles the Go binary for one target platform with stripped symbols, then
//! compresses it in place with UPX. Both steps are separate processes and each
//! must exit successfully; a failed compile never reaches compression.

use std::fmt;
use std::path::PathBuf;

use tracing::info;

use crate::platform::TargetPlatform;
use crate::process::{CommandRunner, CommandSpec, ProcessError};

/// Linker flags that drop the symbol table and DWARF debug info.
pub const STRIP_LDFLAGS: &str = "-ldflags=-s -w";

/// Everything the driver needs to know about the project being built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSettings {
  /// Directory containing the Go module; the artifact is written here
  pub project_dir: PathBuf,
  /// Base name of the output binary (platform suffix is added)
  pub binary_name: String,
  /// Go toolchain executable
  pub go_program: String,
  /// UPX executable
  pub upx_program: String,
  /// Whether to run the compression pass
  pub compress: bool,
}

/// Errors from a single platform build.
#[derive(Debug)]
pub enum BuildError {
  /// The compiler could not be started or exited non-zero
  Compile { platform: TargetPlatform, source: ProcessError },
  /// The compressor could not be started or exited non-zero
  Compress { platform: TargetPlatform, source: ProcessError },
}

impl fmt::Display for BuildError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Compile { platform, source } => write!(f, "{platform} compile failed: {source}"),
      Self::Compress { platform, source } => write!(f, "{platform} compression failed: {source}"),
    }
  }
}

impl std::error::Error for BuildError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      Self::Compile { source, .. } | Self::Compress { source, .. } => Some(source),
    }
  }
}

/// Builds and compresses the binary for a target platform.
pub struct BuildDriver<'a> {
  runner: &'a dyn CommandRunner,
  settings: &'a BuildSettings,
}

impl<'a> BuildDriver<'a> {
  pub fn new(runner: &'a dyn CommandRunner, settings: &'a BuildSettings) -> Self {
    Self { runner, settings }
  }

  /// Artifact file name; both commands run inside `project_dir`, so this is
  /// what they receive.
  pub fn artifact_name(&self, platform: TargetPlatform) -> String {
    platform.artifact_name(&self.settings.binary_name)
  }

  /// Where the artifact for `platform` is written.
  pub fn artifact_path(&self, platform: TargetPlatform) -> PathBuf {
    self.settings.project_dir.join(self.artifact_name(platform))
  }

  /// `CGO_ENABLED=0 GOOS=.. GOARCH=.. go build -ldflags="-s -w" -o <artifact>`
  pub fn compile_command(&self, platform: TargetPlatform) -> CommandSpec {
    CommandSpec::new(&self.settings.go_program)
      .args(["build", STRIP_LDFLAGS, "-o"])
      .arg(self.artifact_name(platform))
      .envs(platform.build_env())
      .current_dir(&self.settings.project_dir)
  }

  /// `upx --best --lzma <artifact>`
  pub fn compress_command(&self, platform: TargetPlatform) -> CommandSpec {
    CommandSpec::new(&self.settings.upx_program)
      .args(["--best", "--lzma"])
      .arg(self.artifact_name(platform))
      .current_dir(&self.settings.project_dir)
  }

  /// Every command a build for `platform` issues, in order.
  pub fn planned_commands(&self, platform: TargetPlatform) -> Vec<CommandSpec> {
    let mut commands = vec![self.compile_command(platform)];
    if self.settings.compress {
      commands.push(self.compress_command(platform));
    }
    commands
  }

  /// Compile and compress the binary for `platform`.
  ///
  /// # Returns
  /// Path of the produced artifact. Only exit statuses are checked; the binary
  /// itself is not inspected.
  pub fn build(&self, platform: TargetPlatform) -> Result<PathBuf, BuildError> {
    info!("Building {platform}");
    self
      .runner
      .run(&self.compile_command(platform))
      .map_err(|source| BuildError::Compile { platform, source })?;

    if self.settings.compress {
      info!("Compressing {platform} binary");
      self
        .runner
        .run(&self.compress_command(platform))
        .map_err(|source| BuildError::Compress { platform, source })?;
    }

    Ok(self.artifact_path(platform))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn settings() -> BuildSettings {
    BuildSettings {
      project_dir: PathBuf::from("/src/qback"),
      binary_name: "qBack".to_string(),
      go_program: "go".to_string(),
      upx_program: "upx".to_string(),
      compress: true,
    }
  }

  struct Unused;

  impl CommandRunner for Unused {
    fn run(&self, _spec: &CommandSpec) -> Result<(), ProcessError> {
      unreachable!("command construction tests never run anything")
    }

    fn capture(&self, _spec: &CommandSpec) -> Result<String, ProcessError> {
      unreachable!("command construction tests never run anything")
    }
  }

  #[test]
  fn test_linux_compile_command() {
    let settings = settings();
    let driver = BuildDriver::new(&Unused, &settings);
    insta::assert_snapshot!(
      driver.compile_command(TargetPlatform::LinuxAmd64),
      @"CGO_ENABLED=0 GOARCH=amd64 GOOS=linux go build '-ldflags=-s -w' -o qBack"
    );
  }

  #[test]
  fn test_windows_compile_command() {
    let settings = settings();
    let driver = BuildDriver::new(&Unused, &settings);
    insta::assert_snapshot!(
      driver.compile_command(TargetPlatform::WindowsAmd64),
      @"CGO_ENABLED=0 GOARCH=amd64 GOOS=windows go build '-ldflags=-s -w' -o qBack.exe"
    );
  }

  #[test]
  fn test_compress_command_has_no_env() {
    let settings = settings();
    let driver = BuildDriver::new(&Unused, &settings);
    let command = driver.compress_command(TargetPlatform::WindowsAmd64);
    assert!(command.envs.is_empty());
    insta::assert_snapshot!(command, @"upx --best --lzma qBack.exe");
  }

  #[test]
  fn test_planned_commands_without_compression() {
    let settings = BuildSettings {
      compress: false,
      ..settings()
    };
    let driver = BuildDriver::new(&Unused, &settings);
    let planned = driver.planned_commands(TargetPlatform::LinuxAmd64);
    assert_eq!(planned.len(), 1);
    assert_eq!(planned[0].program, "go");
  }

  #[test]
  fn test_compile_runs_in_project_dir() {
    let settings = settings();
    let driver = BuildDriver::new(&Unused, &settings);
    let command = driver.compile_command(TargetPlatform::LinuxAmd64);
    assert_eq!(command.current_dir, Some(PathBuf::from("/src/qback")));
    assert_eq!(command.args[1], "-ldflags=-s -w");
  }

  #[test]
  fn test_relative_project_dir_is_applied_once() {
    let settings = BuildSettings {
      project_dir: PathBuf::from("proj"),
      ..settings()
    };
    let driver = BuildDriver::new(&Unused, &settings);

    for command in driver.planned_commands(TargetPlatform::LinuxAmd64) {
      assert_eq!(command.current_dir, Some(PathBuf::from("proj")));
      assert_eq!(command.args.last().map(String::as_str), Some("qBack"));
    }
    assert_eq!(driver.artifact_path(TargetPlatform::LinuxAmd64), PathBuf::from("proj/qBack"));
  }
}
