//! End-to-end pipeline tests using the recording runner
//!
//! These tests drive the orchestrator against a scratch project directory and
//! check which commands are issued and that the version file always ends in
//! its unstamped form.

#![cfg(unix)]

mod common;

use common::fake_runner::FakeRunner;
use common::fixtures::{self, Project, VERSION_GO};
use release_stamp::driver::{BuildError, BuildSettings};
use release_stamp::orchestrator::{Orchestrator, PipelineError, PlatformSelection, RunOutcome};
use release_stamp::platform::TargetPlatform;
use release_stamp::process::SystemRunner;
use release_stamp::stamp::{StampError, StampState, Stamper};

fn orchestrator<'a>(runner: &'a FakeRunner, project: &Project) -> Orchestrator<'a> {
  Orchestrator::new(runner, Stamper::new(project.version_file()), project.settings())
    .with_host_os("linux")
    .with_date(fixtures::build_date())
}

#[test]
fn test_linux_host_builds_and_reverts() {
  let project = Project::new();
  let runner = FakeRunner::new().watching(project.version_file());

  let outcome = orchestrator(&runner, &project).run(PlatformSelection::Host).unwrap();

  assert_eq!(
    outcome,
    RunOutcome::Built {
      platform: TargetPlatform::LinuxAmd64,
      artifact: project.dir.path().join("qBack"),
    }
  );
  assert_eq!(runner.programs(), vec!["go", "go", "upx"]);
  assert_eq!(project.read_version_file(), VERSION_GO);
}

#[test]
fn test_linux_host_issues_only_linux_commands() {
  let project = Project::new();
  let runner = FakeRunner::new();

  orchestrator(&runner, &project).run(PlatformSelection::Host).unwrap();

  let commands = runner.commands();
  let compile = &commands[1];
  assert_eq!(compile.args[0], "build");
  assert_eq!(compile.args[1], "-ldflags=-s -w");
  assert_eq!(compile.envs.get("GOOS").map(String::as_str), Some("linux"));
  assert_eq!(compile.envs.get("GOARCH").map(String::as_str), Some("amd64"));
  assert_eq!(compile.envs.get("CGO_ENABLED").map(String::as_str), Some("0"));
  assert!(commands.iter().all(|c| !c.args.iter().any(|a| a.ends_with(".exe"))));

  let compress = &commands[2];
  assert_eq!(compress.args[..2], ["--best".to_string(), "--lzma".to_string()]);
}

#[test]
fn test_version_file_is_stamped_during_build() {
  let project = Project::new();
  let runner = FakeRunner::new().watching(project.version_file());

  orchestrator(&runner, &project).run(PlatformSelection::Host).unwrap();

  let observed = runner.observed();
  assert_eq!(observed.len(), 2);
  for contents in observed {
    assert!(!contents.contains("COMMIT_DATE"));
    assert!(!contents.contains("COMMIT_GOVER"));
    assert_eq!(contents.matches("\"20240101\"").count(), 1);
    assert_eq!(contents.matches("\"go1.22.1 linux/amd64\"").count(), 1);
  }
}

#[test]
fn test_compile_failure_skips_compression_and_reverts() {
  let project = Project::new();
  let runner = FakeRunner::new().failing("go").watching(project.version_file());

  let err = orchestrator(&runner, &project).run(PlatformSelection::Host).unwrap_err();

  assert!(matches!(err, PipelineError::Build(BuildError::Compile { .. })));
  assert_eq!(err.exit_code(), 1);
  assert_eq!(runner.programs(), vec!["go", "go"]);
  assert!(runner.observed()[0].contains("\"20240101\""));
  assert_eq!(project.read_version_file(), VERSION_GO);
}

#[test]
fn test_missing_toolchain_never_stamps() {
  let project = Project::new();
  let runner = FakeRunner::new().with_version_output(None);

  let err = orchestrator(&runner, &project).run(PlatformSelection::Host).unwrap_err();

  assert!(matches!(err, PipelineError::Probe(_)));
  assert_eq!(err.exit_code(), 2);
  assert_eq!(project.read_version_file(), VERSION_GO);
}

#[test]
fn test_compression_failure_reverts() {
  let project = Project::new();
  let runner = FakeRunner::new().failing("upx");

  let err = orchestrator(&runner, &project).run(PlatformSelection::Host).unwrap_err();

  assert!(matches!(err, PipelineError::Build(BuildError::Compress { .. })));
  assert!(err.to_string().contains("compression failed"));
  assert_eq!(runner.programs(), vec!["go", "go", "upx"]);
  assert_eq!(project.read_version_file(), VERSION_GO);
}

#[test]
fn test_probe_failure_never_stamps() {
  let project = Project::new();
  let runner = FakeRunner::new()
    .with_version_output(Some("unexpected"))
    .watching(project.version_file());

  let err = orchestrator(&runner, &project).run(PlatformSelection::Host).unwrap_err();

  assert!(matches!(err, PipelineError::Probe(_)));
  assert_eq!(runner.programs(), vec!["go"]);
  assert!(runner.observed().is_empty());
  assert_eq!(project.read_version_file(), VERSION_GO);
}

#[test]
fn test_unsupported_host_builds_nothing() {
  let project = Project::new();
  let runner = FakeRunner::new();

  let outcome = orchestrator(&runner, &project)
    .with_host_os("macos")
    .run(PlatformSelection::Host)
    .unwrap();

  assert_eq!(outcome, RunOutcome::Unsupported { os: "macos".to_string() });
  assert_eq!(runner.programs(), vec!["go"]);
  assert_eq!(project.read_version_file(), VERSION_GO);
}

#[test]
fn test_explicit_windows_target_from_linux_host() {
  let project = Project::new();
  let runner = FakeRunner::new();
  let goos_before = std::env::var_os("GOOS");

  let outcome = orchestrator(&runner, &project)
    .run(PlatformSelection::Explicit(TargetPlatform::WindowsAmd64))
    .unwrap();

  let artifact = project.dir.path().join("qBack.exe");
  assert_eq!(
    outcome,
    RunOutcome::Built {
      platform: TargetPlatform::WindowsAmd64,
      artifact: artifact.clone(),
    }
  );

  let commands = runner.commands();
  assert_eq!(commands[1].envs.get("GOOS").map(String::as_str), Some("windows"));
  assert_eq!(commands[2].args.last().map(String::as_str), Some("qBack.exe"));
  assert_eq!(std::env::var_os("GOOS"), goos_before);
  assert_eq!(project.read_version_file(), VERSION_GO);
}

#[test]
fn test_stamped_file_is_refused() {
  let stamped = VERSION_GO
    .replace("\"COMMIT_DATE\"", "\"20240101\"")
    .replace("\"COMMIT_GOVER\"", "\"go1.22.1 linux/amd64\"");
  let project = Project::with_version_file(&stamped);
  let runner = FakeRunner::new();

  let err = orchestrator(&runner, &project).run(PlatformSelection::Host).unwrap_err();

  match &err {
    PipelineError::NotUnstamped { state, .. } => assert_eq!(*state, StampState::Stamped),
    other => panic!("unexpected error: {other}"),
  }
  assert_eq!(runner.programs(), vec!["go"]);
  assert_eq!(project.read_version_file(), stamped);
}

#[test]
fn test_missing_version_file_aborts_before_build() {
  let project = Project::new();
  std::fs::remove_file(project.version_file()).unwrap();
  let runner = FakeRunner::new();

  let err = orchestrator(&runner, &project).run(PlatformSelection::Host).unwrap_err();

  assert!(matches!(err, PipelineError::Stamp(StampError::Read { .. })));
  assert_eq!(err.exit_code(), 5);
  assert_eq!(runner.programs(), vec!["go"]);
}

#[test]
fn test_crlf_version_file_round_trips() {
  let crlf = VERSION_GO.replace('\n', "\r\n");
  let project = Project::with_version_file(&crlf);
  let runner = FakeRunner::new();

  orchestrator(&runner, &project).run(PlatformSelection::Host).unwrap();

  assert_eq!(std::fs::read(project.version_file()).unwrap(), crlf.as_bytes());
}

#[test]
fn test_no_compress_skips_upx() {
  let project = Project::new();
  let runner = FakeRunner::new();
  let settings = BuildSettings {
    compress: false,
    ..project.settings()
  };

  Orchestrator::new(&runner, Stamper::new(project.version_file()), settings)
    .with_host_os("linux")
    .with_date(fixtures::build_date())
    .run(PlatformSelection::Host)
    .unwrap();

  assert_eq!(runner.programs(), vec!["go", "go"]);
}

#[test]
fn test_real_processes_write_artifact_in_project_dir() {
  let project = Project::new();
  let tools = tempfile::tempdir().unwrap();
  let settings = BuildSettings {
    go_program: fixtures::write_fake_go(tools.path()).to_string_lossy().into_owned(),
    upx_program: "true".to_string(),
    ..project.settings()
  };

  let outcome = Orchestrator::new(&SystemRunner, Stamper::new(project.version_file()), settings)
    .with_host_os("linux")
    .with_date(fixtures::build_date())
    .run(PlatformSelection::Host)
    .unwrap();

  let artifact = project.dir.path().join("qBack");
  assert_eq!(
    outcome,
    RunOutcome::Built {
      platform: TargetPlatform::LinuxAmd64,
      artifact: artifact.clone(),
    }
  );
  assert!(artifact.exists());
  assert_eq!(project.read_version_file(), VERSION_GO);
}
