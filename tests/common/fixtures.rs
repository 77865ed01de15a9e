//! Scratch Go projects for pipeline tests

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use release_stamp::driver::BuildSettings;
use tempfile::TempDir;

/// A version file in the unstamped state
pub const VERSION_GO: &str = r#"package utils

import (
	"fmt"
)

const (
	DateVer string = "COMMIT_DATE"
	GoVer   string = "COMMIT_GOVER"
)

var VERSION string = fmt.Sprintf("%s (%s)", DateVer, GoVer)
"#;

/// Fixed build date used by the tests
pub fn build_date() -> NaiveDate {
  NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
}

/// A temporary project with `utils/version.go`
pub struct Project {
  pub dir: TempDir,
}

impl Project {
  pub fn new() -> Self {
    Self::with_version_file(VERSION_GO)
  }

  pub fn with_version_file(contents: &str) -> Self {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("utils")).unwrap();
    fs::write(dir.path().join("utils/version.go"), contents).unwrap();
    Self { dir }
  }

  pub fn version_file(&self) -> PathBuf {
    self.dir.path().join("utils/version.go")
  }

  pub fn read_version_file(&self) -> String {
    fs::read_to_string(self.version_file()).unwrap()
  }

  pub fn settings(&self) -> BuildSettings {
    BuildSettings {
      project_dir: self.dir.path().to_path_buf(),
      binary_name: "qBack".to_string(),
      go_program: "go".to_string(),
      upx_program: "upx".to_string(),
      compress: true,
    }
  }
}

/// Write a stand-in `go` executable into `dir`.
///
/// `go version` prints a fixed version; `go build ... -o <name>` creates
/// `<name>` relative to its working directory.
#[allow(dead_code)]
pub fn write_fake_go(dir: &Path) -> PathBuf {
  let path = dir.join("go");
  fs::write(
    &path,
    "#!/bin/sh\nif [ \"$1\" = version ]; then\n  echo 'go version go1.22.1 linux/amd64'\n  exit 0\nfi\ntouch \"$4\"\n",
  )
  .unwrap();
  fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
  path
}
