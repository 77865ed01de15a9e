//! The release build pipeline command.
//!
//! Stamps the version file, builds and compresses the binary for one
//! platform, and reverts the version file no matter how the build ends.

use std::process;

use crate::cli::{BuildArgs, Cli};
use crate::color::ColorScheme;
use crate::driver::BuildDriver;
use crate::metadata::{DATE_SENTINEL, TOOLCHAIN_SENTINEL};
use crate::orchestrator::{Orchestrator, PlatformSelection, RunOutcome};
use crate::process::SystemRunner;
use crate::stamp::Stamper;
use crate::toolchain::version_command;

/// Exit code when the host OS has no matching build target.
const UNSUPPORTED_PLATFORM_EXIT: i32 = 3;

/// Handle the `build` command (also the default with no subcommand).
pub(crate) fn handle_build_command(args: &BuildArgs, cli: &Cli, colors: &ColorScheme) {
  let selection = match args.target {
    Some(platform) => PlatformSelection::Explicit(platform),
    None => PlatformSelection::Host,
  };
  let settings = cli.build_settings(!args.no_compress);
  let version_file = cli.version_file();

  println!("{} {}", colors.progress("→"), colors.info("Building release"));
  println!("  {}: {}", colors.emphasis("Project"), colors.path(cli.project_dir().display()));
  println!("  {}: {}", colors.emphasis("Version file"), colors.path(version_file.display()));

  if cli.behavior.dry_run {
    print_plan(selection, cli, colors, !args.no_compress);
    return;
  }

  let runner = SystemRunner;
  let orchestrator = Orchestrator::new(&runner, Stamper::new(&version_file), settings);

  match orchestrator.run(selection) {
    Ok(RunOutcome::Built { platform, artifact }) => {
      println!(
        "\n{} {} {}",
        colors.success("✓"),
        colors.success("Built"),
        colors.emphasis(platform)
      );
      println!("  {}: {}", colors.emphasis("Artifact"), colors.path(artifact.display()));
      println!("  {} {}", colors.success("✓"), colors.info("Version file reverted"));
    }
    Ok(RunOutcome::Unsupported { os }) => {
      eprintln!(
        "{} {}",
        colors.error("✗"),
        colors.error(format!("No build target for host OS '{os}'"))
      );
      eprintln!("  Use {} to pick a platform explicitly", colors.code("--target"));
      process::exit(UNSUPPORTED_PLATFORM_EXIT);
    }
    Err(e) => {
      eprintln!("{} {}", colors.error("✗"), colors.error("Release build failed"));
      eprintln!("  {}: {}", colors.emphasis("Error"), e);
      process::exit(e.exit_code());
    }
  }
}

/// Describe what a real run would do without touching anything.
fn print_plan(selection: PlatformSelection, cli: &Cli, colors: &ColorScheme, compress: bool) {
  println!(
    "\n{} {}",
    colors.warning("⚠"),
    colors.warning("DRY RUN: No files will be modified")
  );

  println!("\n{} {}", colors.info("→"), colors.info("Would stamp"));
  println!("  {} = {}", colors.code(DATE_SENTINEL), colors.dimmed("today's date (YYYYMMDD)"));
  println!(
    "  {} = {}",
    colors.code(TOOLCHAIN_SENTINEL),
    colors.dimmed(format!("output of `{}`", version_command(&cli.tools.go_program)))
  );

  let host_os = std::env::consts::OS;
  let Some(platform) = selection.resolve(host_os) else {
    println!(
      "\n{} {}",
      colors.warning("⚠"),
      colors.warning(format!("No build target for host OS '{host_os}'"))
    );
    return;
  };

  let settings = cli.build_settings(compress);
  let runner = SystemRunner;
  let driver = BuildDriver::new(&runner, &settings);

  println!("\n{} {} {}", colors.info("→"), colors.info("Would run for"), colors.emphasis(platform));
  for command in driver.planned_commands(platform) {
    println!("  {}", colors.code(command));
  }
}
