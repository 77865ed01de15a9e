//! Target platform definitions.

use std::collections::BTreeMap;
use std::fmt;

use clap::ValueEnum;

/// Platforms a release binary can be built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TargetPlatform {
  /// 64-bit Linux, unsuffixed binary
  #[value(name = "linux-amd64")]
  LinuxAmd64,
  /// 64-bit Windows, `.exe` binary
  #[value(name = "windows-amd64")]
  WindowsAmd64,
}

impl TargetPlatform {
  /// Map an operating system identifier (as in `std::env::consts::OS`) to a
  /// platform.
  pub fn from_os(os: &str) -> Option<Self> {
    match os {
      "linux" => Some(Self::LinuxAmd64),
      "windows" => Some(Self::WindowsAmd64),
      _ => None,
    }
  }

  /// The platform matching the machine running this process, if supported.
  pub fn host() -> Option<Self> {
    Self::from_os(std::env::consts::OS)
  }

  pub fn goos(&self) -> &'static str {
    match self {
      Self::LinuxAmd64 => "linux",
      Self::WindowsAmd64 => "windows",
    }
  }

  pub fn goarch(&self) -> &'static str {
    "amd64"
  }

  pub fn executable_suffix(&self) -> &'static str {
    match self {
      Self::LinuxAmd64 => "",
      Self::WindowsAmd64 => ".exe",
    }
  }

  /// Output file name for a binary called `base`.
  pub fn artifact_name(&self, base: &str) -> String {
    format!("{base}{}", self.executable_suffix())
  }

  /// Environment overrides handed to the compiler process.
  ///
  /// Cgo is disabled so the binary is fully static and cross-compiles without
  /// a C toolchain for the target.
  pub fn build_env(&self) -> BTreeMap<String, String> {
    BTreeMap::from([
      ("CGO_ENABLED".to_string(), "0".to_string()),
      ("GOOS".to_string(), self.goos().to_string()),
      ("GOARCH".to_string(), self.goarch().to_string()),
    ])
  }
}

impl fmt::Display for TargetPlatform {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}-{}", self.goos(), self.goarch())
  }
}
