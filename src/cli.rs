//! Command-line interface definitions for release-stamp.
//!
//! Every option can also come from a `RELEASE_STAMP_*` environment variable,
//! so CI jobs can configure a project without long command lines.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

use crate::color::ColorScheme;
use crate::commands::build::handle_build_command;
use crate::commands::completions::handle_completions_command;
use crate::commands::stamp::{handle_stamp_command, handle_status_command, handle_unstamp_command};
use crate::commands::version::handle_version_command;
use crate::driver::BuildSettings;
use crate::metadata::DATE_FORMAT;
use crate::platform::TargetPlatform;

/// release-stamp - Stamp, cross-compile, and compress a Go release binary
#[derive(Debug, Parser)]
#[command(
  name = "release-stamp",
  version,
  about = "Stamp build metadata, cross-compile, compress, and revert",
  long_about = "Stamps the build date and Go toolchain version into a version source file,\n\
                builds a stripped binary for the host platform, compresses it with UPX,\n\
                and always reverts the version file to its placeholder form.",
  styles = get_clap_styles()
)]
pub struct Cli {
  /// Subcommand to execute (defaults to `build`)
  #[command(subcommand)]
  pub command: Option<Command>,

  /// Build options
  #[command(flatten)]
  pub build: BuildArgs,

  /// Project options
  #[command(flatten)]
  pub project: ProjectOptions,

  /// Toolchain options
  #[command(flatten)]
  pub tools: ToolOptions,

  /// Behavior options
  #[command(flatten)]
  pub behavior: BehaviorOptions,
}

/// Pipeline steps and maintenance commands
#[derive(Debug, Subcommand)]
pub enum Command {
  /// Stamp metadata, build for one platform, compress, and revert (default)
  Build,

  /// Stamp metadata into the version file and leave it stamped
  Stamp(ValueOverrides),

  /// Revert stamped metadata back to placeholders
  Unstamp(ValueOverrides),

  /// Report whether the version file is stamped
  Status(ValueOverrides),

  /// Display version and build information
  Version {
    /// Output in JSON format
    #[arg(long)]
    json: bool,

    /// Show only version number
    #[arg(long)]
    short: bool,
  },

  /// Generate shell completion scripts
  Completions {
    /// Target shell for completions
    #[arg(value_enum)]
    shell: Shell,
  },
}

/// Options for the build pipeline
///
/// Global so they apply both to `build` and to a bare invocation.
#[derive(Debug, Default, Args)]
pub struct BuildArgs {
  /// Build for this platform instead of the host platform
  #[arg(long, global = true, value_enum, env = "RELEASE_STAMP_TARGET", value_name = "PLATFORM")]
  pub target: Option<TargetPlatform>,

  /// Skip the UPX compression pass
  #[arg(long, global = true)]
  pub no_compress: bool,
}

/// Explicit metadata values, used instead of probing
#[derive(Debug, Default, Args)]
pub struct ValueOverrides {
  /// Build date to stamp or revert (YYYYMMDD, defaults to today)
  #[arg(long, value_name = "YYYYMMDD", value_parser = parse_date)]
  pub date: Option<NaiveDate>,

  /// Toolchain version to stamp or revert (defaults to the `go version` output)
  #[arg(long, value_name = "VERSION")]
  pub toolchain: Option<String>,
}

/// Supported shells for completion scripts
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Shell {
  Bash,
  Zsh,
  Fish,
  Powershell,
  Elvish,
}

fn parse_date(value: &str) -> Result<NaiveDate, String> {
  NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(|e| format!("Invalid date '{value}': {e}"))
}

/// Project layout options
#[derive(Debug, Parser)]
pub struct ProjectOptions {
  /// Root directory of the Go project
  #[arg(
    long,
    global = true,
    env = "RELEASE_STAMP_PROJECT_DIR",
    default_value = ".",
    value_name = "DIR"
  )]
  pub project_dir: PathBuf,

  /// Version source file holding the placeholders (relative to the project)
  #[arg(
    long,
    global = true,
    env = "RELEASE_STAMP_VERSION_FILE",
    default_value = "utils/version.go",
    value_name = "FILE"
  )]
  pub version_file: PathBuf,

  /// Output binary name (defaults to the project directory name)
  #[arg(long, global = true, env = "RELEASE_STAMP_BINARY_NAME", value_name = "NAME")]
  pub binary_name: Option<String>,
}

impl ProjectOptions {
  /// Absolute or project-relative path of the version source file.
  pub fn version_file_path(&self) -> PathBuf {
    self.project_dir.join(&self.version_file)
  }

  /// The binary name, falling back to the project directory's name.
  pub fn resolved_binary_name(&self) -> Option<String> {
    if let Some(name) = &self.binary_name {
      return Some(name.clone());
    }

    let dir = self
      .project_dir
      .canonicalize()
      .unwrap_or_else(|_| self.project_dir.clone());
    dir.file_name().map(|name| name.to_string_lossy().into_owned())
  }
}

/// External tool options
#[derive(Debug, Parser)]
pub struct ToolOptions {
  /// Go toolchain executable
  #[arg(long = "go", global = true, env = "RELEASE_STAMP_GO", default_value = "go", value_name = "PROGRAM")]
  pub go_program: String,

  /// UPX executable
  #[arg(long = "upx", global = true, env = "RELEASE_STAMP_UPX", default_value = "upx", value_name = "PROGRAM")]
  pub upx_program: String,
}

/// Behavior options
#[derive(Debug, Parser)]
pub struct BehaviorOptions {
  /// Print the planned stamp values and commands without changing anything
  #[arg(long, global = true)]
  pub dry_run: bool,

  /// Increase verbosity (-v info, -vv debug, -vvv trace)
  #[arg(short, long, global = true, action = clap::ArgAction::Count)]
  pub verbose: u8,

  /// Suppress all output except errors
  #[arg(short, long, global = true, conflicts_with = "verbose")]
  pub quiet: bool,

  /// Colorize output
  #[arg(long, global = true, value_enum, default_value = "auto", value_name = "WHEN")]
  pub color: ColorOption,
}

/// Color output options
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ColorOption {
  Auto,
  Always,
  Never,
}

impl Cli {
  /// Parse CLI arguments from the environment
  pub fn parse_args() -> Self {
    Self::parse()
  }

  /// Validate CLI arguments
  ///
  /// Returns an error if the CLI configuration is invalid.
  pub fn validate(&self) -> Result<(), String> {
    match self.project.resolved_binary_name() {
      None => return Err("--binary-name is required when the project directory has no name".to_string()),
      Some(name) if name.trim().is_empty() => return Err("--binary-name must not be empty".to_string()),
      Some(name) if name.contains(['/', '\\']) => {
        return Err("--binary-name must be a file name, not a path".to_string());
      }
      Some(_) => {}
    }

    if self.project.version_file.as_os_str().is_empty() {
      return Err("--version-file must not be empty".to_string());
    }

    if let Some(Command::Stamp(overrides) | Command::Unstamp(overrides) | Command::Status(overrides)) = &self.command
      && let Some(toolchain) = &overrides.toolchain
      && toolchain.trim().is_empty()
    {
      return Err("--toolchain must not be empty".to_string());
    }

    Ok(())
  }

  /// Build driver settings derived from the project and tool options.
  pub fn build_settings(&self, compress: bool) -> BuildSettings {
    BuildSettings {
      project_dir: self.project.project_dir.clone(),
      binary_name: self.project.resolved_binary_name().unwrap_or_default(),
      go_program: self.tools.go_program.clone(),
      upx_program: self.tools.upx_program.clone(),
      compress,
    }
  }

  /// Path of the version source file.
  pub fn version_file(&self) -> PathBuf {
    self.project.version_file_path()
  }

  /// The project directory as given on the command line.
  pub fn project_dir(&self) -> &Path {
    &self.project.project_dir
  }
}

/// Parse CLI arguments, initialize shared services, and dispatch to the chosen
/// command.
pub fn run() {
  let cli = Cli::parse_args();

  init_tracing(&cli.behavior);

  // Create color scheme based on user preference
  let colors = ColorScheme::new(cli.behavior.color);

  // Validate CLI arguments
  if let Err(e) = cli.validate() {
    eprintln!("{} {}", colors.error("Error:"), e);
    std::process::exit(4); // Invalid arguments exit code
  }

  match &cli.command {
    None | Some(Command::Build) => handle_build_command(&cli.build, &cli, &colors),
    Some(Command::Stamp(overrides)) => handle_stamp_command(overrides, &cli, &colors),
    Some(Command::Unstamp(overrides)) => handle_unstamp_command(overrides, &cli, &colors),
    Some(Command::Status(overrides)) => handle_status_command(overrides, &cli, &colors),
    Some(Command::Version { json, short }) => handle_version_command(*json, *short, &colors),
    Some(Command::Completions { shell }) => handle_completions_command(*shell),
  }
}

fn init_tracing(behavior: &BehaviorOptions) {
  let level = if behavior.quiet {
    LevelFilter::ERROR
  } else {
    match behavior.verbose {
      0 => LevelFilter::WARN,
      1 => LevelFilter::INFO,
      2 => LevelFilter::DEBUG,
      _ => LevelFilter::TRACE,
    }
  };

  let env_filter = EnvFilter::builder()
    .with_default_directive(level.into())
    .from_env_lossy();

  let _ = tracing_subscriber::fmt()
    .with_env_filter(env_filter)
    .with_target(false)
    .with_writer(std::io::stderr)
    .try_init();
}

/// Get custom styles for clap help output
fn get_clap_styles() -> clap::builder::Styles {
  use clap::builder::styling::{AnsiColor, Effects};

  clap::builder::Styles::styled()
    .header(AnsiColor::BrightYellow.on_default() | Effects::BOLD)
    .usage(AnsiColor::BrightYellow.on_default() | Effects::BOLD)
    .literal(AnsiColor::BrightGreen.on_default())
    .placeholder(AnsiColor::BrightCyan.on_default())
    .error(AnsiColor::BrightRed.on_default() | Effects::BOLD)
    .valid(AnsiColor::BrightGreen.on_default())
    .invalid(AnsiColor::BrightRed.on_default())
}
