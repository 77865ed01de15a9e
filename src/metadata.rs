//! Build metadata fields stamped into the version source file.
//!
//! Each field pairs a fixed sentinel token with the value resolved for the
//! current build. Substitution always works on the quoted string literal so
//! the Go source stays valid in both states.

use std::fmt;

use chrono::NaiveDate;

/// Sentinel for the build date constant.
pub const DATE_SENTINEL: &str = "COMMIT_DATE";

/// Sentinel for the toolchain version constant.
pub const TOOLCHAIN_SENTINEL: &str = "COMMIT_GOVER";

/// Date format used for the stamped build date (e.g. `20240101`).
pub const DATE_FORMAT: &str = "%Y%m%d";

/// A named build-time value with its placeholder and resolved forms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataField {
  /// Human-readable field name used in logs
  pub name: &'static str,
  /// Placeholder token as it appears inside the string literal
  pub sentinel: &'static str,
  /// Concrete value computed for this build
  pub resolved: String,
}

impl MetadataField {
  /// Build the date field from a calendar date.
  pub fn date(date: NaiveDate) -> Self {
    Self {
      name: "build date",
      sentinel: DATE_SENTINEL,
      resolved: date.format(DATE_FORMAT).to_string(),
    }
  }

  /// Build the toolchain field from a probed version string.
  pub fn toolchain(version: impl Into<String>) -> Self {
    Self {
      name: "toolchain version",
      sentinel: TOOLCHAIN_SENTINEL,
      resolved: version.into(),
    }
  }

  /// The sentinel as a quoted literal, e.g. `"COMMIT_DATE"`.
  pub fn sentinel_literal(&self) -> String {
    quote(self.sentinel)
  }

  /// The resolved value as a quoted literal, e.g. `"20240101"`.
  pub fn resolved_literal(&self) -> String {
    quote(&self.resolved)
  }
}

fn quote(value: &str) -> String {
  format!("\"{value}\"")
}

/// Reasons a resolved value cannot be stamped into a string literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidValue {
  /// The resolved value is empty
  Empty { field: &'static str },
  /// The resolved value contains a quote, backslash, or line break
  UnsafeCharacter { field: &'static str, character: char },
  /// The resolved value contains a sentinel token
  SentinelCollision { field: &'static str, sentinel: &'static str },
}

impl fmt::Display for InvalidValue {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Empty { field } => write!(f, "{field} resolved to an empty value"),
      Self::UnsafeCharacter { field, character } => {
        write!(f, "{field} contains {character:?}, which cannot appear in a string literal")
      }
      Self::SentinelCollision { field, sentinel } => {
        write!(f, "{field} contains the sentinel token {sentinel}")
      }
    }
  }
}

impl std::error::Error for InvalidValue {}

/// The complete set of fields stamped for one build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataFields {
  fields: Vec<MetadataField>,
}

impl MetadataFields {
  /// Resolve both fields for a build on `date` with the given toolchain.
  pub fn resolve(date: NaiveDate, toolchain_version: impl Into<String>) -> Self {
    Self {
      fields: vec![MetadataField::date(date), MetadataField::toolchain(toolchain_version)],
    }
  }

  /// Resolve fields for today's local date.
  pub fn resolve_today(toolchain_version: impl Into<String>) -> Self {
    Self::resolve(chrono::Local::now().date_naive(), toolchain_version)
  }

  /// Iterate over the fields.
  pub fn iter(&self) -> impl Iterator<Item = &MetadataField> {
    self.fields.iter()
  }

  /// Check every resolved value is safe to place inside a string literal and
  /// cannot be confused with any sentinel.
  pub fn validate(&self) -> Result<(), InvalidValue> {
    for field in &self.fields {
      if field.resolved.is_empty() {
        return Err(InvalidValue::Empty { field: field.name });
      }

      if let Some(character) = field.resolved.chars().find(|&c| matches!(c, '"' | '\\' | '\n' | '\r')) {
        return Err(InvalidValue::UnsafeCharacter {
          field: field.name,
          character,
        });
      }

      if let Some(other) = self.fields.iter().find(|other| field.resolved.contains(other.sentinel)) {
        return Err(InvalidValue::SentinelCollision {
          field: field.name,
          sentinel: other.sentinel,
        });
      }
    }

    Ok(())
  }
}

impl<'a> IntoIterator for &'a MetadataFields {
  type Item = &'a MetadataField;
  type IntoIter = std::slice::Iter<'a, MetadataField>;

  fn into_iter(self) -> Self::IntoIter {
    self.fields.iter()
  }
}
