//! Manual stamping commands.
//!
//! `stamp` and `unstamp` operate on the version file alone, for debugging a
//! build by hand or for reverting values left behind by an interrupted run.
//! `status` reports which form the file is in and exits non-zero unless it is
//! unstamped, so it can gate commits in CI.

use std::path::Path;
use std::process;

use anyhow::Context;

use crate::cli::{Cli, ValueOverrides};
use crate::color::ColorScheme;
use crate::metadata::{DATE_FORMAT, DATE_SENTINEL, MetadataFields, TOOLCHAIN_SENTINEL};
use crate::process::{CommandRunner, SystemRunner};
use crate::stamp::{StampState, Stamper};
use crate::toolchain::{probe_toolchain_version, version_command};

/// Exit code for a version-file I/O or state error.
const VERSION_FILE_ERROR_EXIT: i32 = 5;

/// Exit code from `status` when the file is stamped or unrecognized.
pub(crate) const NOT_UNSTAMPED_EXIT: i32 = 6;

/// Resolve the values to stamp or revert, running `go version` only when no
/// toolchain override was given.
pub(crate) fn resolve_fields(
  overrides: &ValueOverrides,
  go_program: &str,
  runner: &dyn CommandRunner,
) -> anyhow::Result<MetadataFields> {
  let toolchain = match &overrides.toolchain {
    Some(value) => value.trim().to_string(),
    None => probe_toolchain_version(runner, go_program)
      .context("Could not determine the toolchain version; pass --toolchain to set it explicitly")?,
  };

  Ok(match overrides.date {
    Some(date) => MetadataFields::resolve(date, toolchain),
    None => MetadataFields::resolve_today(toolchain),
  })
}

/// Replace placeholders with `fields`, returning how many literals changed.
pub(crate) fn stamp_version_file(path: &Path, fields: &MetadataFields) -> anyhow::Result<usize> {
  Stamper::new(path)
    .stamp(fields)
    .with_context(|| format!("Failed to stamp {}", path.display()))
}

/// Put placeholders back where `fields` were stamped.
pub(crate) fn unstamp_version_file(path: &Path, fields: &MetadataFields) -> anyhow::Result<usize> {
  Stamper::new(path)
    .unstamp(fields)
    .with_context(|| format!("Failed to revert {}", path.display()))
}

/// Classify the version file against `fields`.
pub(crate) fn version_file_status(path: &Path, fields: &MetadataFields) -> anyhow::Result<StampState> {
  Stamper::new(path)
    .inspect(fields)
    .with_context(|| format!("Failed to inspect {}", path.display()))
}

fn print_fields(fields: &MetadataFields, colors: &ColorScheme) {
  for field in fields {
    println!(
      "  {} {} {}",
      colors.code(field.sentinel),
      colors.dimmed("↔"),
      colors.number(&field.resolved)
    );
  }
}

/// Dry runs never execute the toolchain; unknown values are described instead.
fn print_planned_fields(overrides: &ValueOverrides, cli: &Cli, colors: &ColorScheme) {
  let date = match overrides.date {
    Some(date) => colors.number(date.format(DATE_FORMAT)),
    None => colors.dimmed("today's date (YYYYMMDD)"),
  };
  let toolchain = match &overrides.toolchain {
    Some(value) => colors.number(value.trim()),
    None => colors.dimmed(format!("output of `{}`", version_command(&cli.tools.go_program))),
  };
  println!("  {} {} {}", colors.code(DATE_SENTINEL), colors.dimmed("↔"), date);
  println!("  {} {} {}", colors.code(TOOLCHAIN_SENTINEL), colors.dimmed("↔"), toolchain);
  println!("\n{} {}", colors.warning("⚠"), colors.warning("DRY RUN: File not modified"));
}

fn fail(action: &str, err: anyhow::Error, colors: &ColorScheme) -> ! {
  eprintln!("{} {}", colors.error("✗"), colors.error(action));
  eprintln!("  {}: {:#}", colors.emphasis("Error"), err);
  process::exit(VERSION_FILE_ERROR_EXIT);
}

fn resolve_or_exit(overrides: &ValueOverrides, cli: &Cli, colors: &ColorScheme) -> MetadataFields {
  match resolve_fields(overrides, &cli.tools.go_program, &SystemRunner) {
    Ok(fields) => fields,
    Err(e) => fail("Failed to resolve metadata", e, colors),
  }
}

/// Handle `release-stamp stamp`.
pub(crate) fn handle_stamp_command(overrides: &ValueOverrides, cli: &Cli, colors: &ColorScheme) {
  let path = cli.version_file();
  println!("{} {}", colors.progress("→"), colors.info("Stamping version file"));
  println!("  {}: {}", colors.emphasis("File"), colors.path(path.display()));

  if cli.behavior.dry_run {
    print_planned_fields(overrides, cli, colors);
    return;
  }

  let fields = resolve_or_exit(overrides, cli, colors);
  print_fields(&fields, colors);

  match stamp_version_file(&path, &fields) {
    Ok(0) => println!("\n{} {}", colors.warning("⚠"), colors.warning("No placeholders found")),
    Ok(count) => {
      println!("\n{} Stamped {} literal(s)", colors.success("✓"), colors.number(count));
      println!(
        "  {} Run {} before committing",
        colors.warning("⚠"),
        colors.code("release-stamp unstamp")
      );
    }
    Err(e) => fail("Failed to stamp version file", e, colors),
  }
}

/// Handle `release-stamp unstamp`.
pub(crate) fn handle_unstamp_command(overrides: &ValueOverrides, cli: &Cli, colors: &ColorScheme) {
  let path = cli.version_file();
  println!("{} {}", colors.progress("→"), colors.info("Reverting version file"));
  println!("  {}: {}", colors.emphasis("File"), colors.path(path.display()));

  if cli.behavior.dry_run {
    print_planned_fields(overrides, cli, colors);
    return;
  }

  let fields = resolve_or_exit(overrides, cli, colors);
  print_fields(&fields, colors);

  match unstamp_version_file(&path, &fields) {
    Ok(0) => println!("\n{} {}", colors.success("✓"), colors.info("Already unstamped")),
    Ok(count) => println!("\n{} Reverted {} literal(s)", colors.success("✓"), colors.number(count)),
    Err(e) => fail("Failed to revert version file", e, colors),
  }
}

/// Handle `release-stamp status`.
pub(crate) fn handle_status_command(overrides: &ValueOverrides, cli: &Cli, colors: &ColorScheme) {
  let path = cli.version_file();
  let fields = resolve_or_exit(overrides, cli, colors);

  let state = match version_file_status(&path, &fields) {
    Ok(state) => state,
    Err(e) => fail("Failed to read version file status", e, colors),
  };

  let label = match state {
    StampState::Unstamped => colors.success(state),
    StampState::Stamped => colors.warning(state),
    StampState::Unrecognized => colors.error(state),
  };
  println!("{}: {}", colors.path(path.display()), label);

  if state != StampState::Unstamped {
    process::exit(NOT_UNSTAMPED_EXIT);
  }
}
