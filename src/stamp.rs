//! Version stamping for the metadata source file.
//!
//! The stamper swaps quoted sentinel literals for resolved values (and back)
//! with a full-file read, an in-memory substitution, and a full-file write.
//! Nothing outside the substituted literals is touched, so line endings and
//! encoding survive a stamp/unstamp cycle byte for byte.

use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, error, info, warn};

use crate::metadata::{InvalidValue, MetadataFields};

/// Which form the metadata literals are currently in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StampState {
  /// Every field is at its sentinel form
  Unstamped,
  /// Every field is at its resolved form
  Stamped,
  /// Neither: fields are missing, partially stamped, or stamped with other values
  Unrecognized,
}

impl fmt::Display for StampState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Unstamped => write!(f, "unstamped"),
      Self::Stamped => write!(f, "stamped"),
      Self::Unrecognized => write!(f, "unrecognized"),
    }
  }
}

/// Errors raised while stamping or reverting the metadata file.
#[derive(Debug)]
pub enum StampError {
  /// The file could not be read
  Read { path: PathBuf, source: std::io::Error },
  /// The file could not be written back
  Write { path: PathBuf, source: std::io::Error },
  /// The file is not valid UTF-8
  NotUtf8 { path: PathBuf },
  /// A resolved value cannot be written into a string literal
  InvalidValue(InvalidValue),
}

impl fmt::Display for StampError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Read { path, source } => write!(f, "failed to read {}: {source}", path.display()),
      Self::Write { path, source } => write!(f, "failed to write {}: {source}", path.display()),
      Self::NotUtf8 { path } => write!(f, "{} is not valid UTF-8", path.display()),
      Self::InvalidValue(err) => write!(f, "invalid metadata value: {err}"),
    }
  }
}

impl std::error::Error for StampError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      Self::Read { source, .. } | Self::Write { source, .. } => Some(source),
      Self::InvalidValue(err) => Some(err),
      Self::NotUtf8 { .. } => None,
    }
  }
}

impl From<InvalidValue> for StampError {
  fn from(err: InvalidValue) -> Self {
    Self::InvalidValue(err)
  }
}

/// Replace every sentinel literal with its resolved literal.
///
/// Returns the new text and the number of replacements made.
pub fn stamp_text(text: &str, fields: &MetadataFields) -> (String, usize) {
  let mut output = text.to_string();
  let mut replaced = 0;

  for field in fields {
    let (from, to) = (field.sentinel_literal(), field.resolved_literal());
    replaced += output.matches(&from).count();
    output = output.replace(&from, &to);
  }

  (output, replaced)
}

/// Replace every resolved literal with its sentinel literal.
///
/// Zero matches is not an error: reverting an unstamped file is a no-op.
pub fn unstamp_text(text: &str, fields: &MetadataFields) -> (String, usize) {
  let mut output = text.to_string();
  let mut replaced = 0;

  for field in fields {
    let (from, to) = (field.resolved_literal(), field.sentinel_literal());
    replaced += output.matches(&from).count();
    output = output.replace(&from, &to);
  }

  (output, replaced)
}

/// Classify text by which literal forms it contains.
pub fn classify(text: &str, fields: &MetadataFields) -> StampState {
  let all_sentinels = fields.iter().all(|f| text.contains(&f.sentinel_literal()));
  let any_sentinel = fields.iter().any(|f| text.contains(&f.sentinel_literal()));
  let all_resolved = fields.iter().all(|f| text.contains(&f.resolved_literal()));
  let any_resolved = fields.iter().any(|f| text.contains(&f.resolved_literal()));

  if all_sentinels && !any_resolved {
    StampState::Unstamped
  } else if all_resolved && !any_sentinel {
    StampState::Stamped
  } else {
    StampState::Unrecognized
  }
}

/// Reads and rewrites the metadata source file at a fixed path.
#[derive(Debug, Clone)]
pub struct Stamper {
  path: PathBuf,
}

impl Stamper {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self { path: path.into() }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  /// Substitute resolved values into the file.
  ///
  /// # Returns
  /// The number of literals replaced.
  ///
  /// # Errors
  /// Fails on unreadable/unwritable files, non UTF-8 content, or resolved
  /// values that cannot live inside a string literal.
  pub fn stamp(&self, fields: &MetadataFields) -> Result<usize, StampError> {
    fields.validate()?;

    let original = self.read()?;
    let (stamped, replaced) = stamp_text(&original, fields);

    if replaced == 0 {
      warn!("No sentinel literals found in {}", self.path.display());
    }

    self.write_if_changed(&original, &stamped)?;
    for field in fields {
      debug!("Stamped {} = {}", field.name, field.resolved);
    }
    info!("Stamped {replaced} metadata literal(s) into {}", self.path.display());

    Ok(replaced)
  }

  /// Revert resolved values back to their sentinels.
  ///
  /// Safe to call on an already-unstamped file; nothing is written then.
  pub fn unstamp(&self, fields: &MetadataFields) -> Result<usize, StampError> {
    let original = self.read()?;
    let (unstamped, replaced) = unstamp_text(&original, fields);

    self.write_if_changed(&original, &unstamped)?;
    info!("Reverted {replaced} metadata literal(s) in {}", self.path.display());

    Ok(replaced)
  }

  /// Report which state the file is in for the given fields.
  pub fn inspect(&self, fields: &MetadataFields) -> Result<StampState, StampError> {
    Ok(classify(&self.read()?, fields))
  }

  fn read(&self) -> Result<String, StampError> {
    let bytes = fs::read(&self.path).map_err(|source| StampError::Read {
      path: self.path.clone(),
      source,
    })?;

    String::from_utf8(bytes).map_err(|_| StampError::NotUtf8 {
      path: self.path.clone(),
    })
  }

  fn write_if_changed(&self, original: &str, updated: &str) -> Result<(), StampError> {
    if original == updated {
      return Ok(());
    }

    let write_error = |source: io::Error| StampError::Write {
      path: self.path.clone(),
      source,
    };

    let permissions = fs::metadata(&self.path).map_err(write_error)?.permissions();
    if permissions.readonly() {
      return Err(write_error(io::Error::new(io::ErrorKind::PermissionDenied, "file is read-only")));
    }

    // Write beside the target and rename over it so an interrupted write never
    // leaves a truncated file behind.
    let dir = match self.path.parent() {
      Some(parent) if !parent.as_os_str().is_empty() => parent,
      _ => Path::new("."),
    };
    let mut temp = NamedTempFile::new_in(dir).map_err(write_error)?;
    temp.write_all(updated.as_bytes()).map_err(write_error)?;
    temp.as_file().set_permissions(permissions).map_err(write_error)?;
    temp.persist(&self.path).map_err(|e| write_error(e.error))?;

    Ok(())
  }
}

/// Keeps the metadata file stamped for as long as it is alive.
///
/// Call [`StampGuard::release`] to revert and observe errors. A guard dropped
/// without release (early return, `?`, panic unwinding) still reverts the file
/// and logs any failure.
#[must_use = "dropping the guard immediately reverts the stamp"]
pub struct StampGuard<'a> {
  stamper: &'a Stamper,
  fields: &'a MetadataFields,
  released: bool,
}

impl<'a> StampGuard<'a> {
  /// Stamp the file and return a guard that reverts it.
  pub fn acquire(stamper: &'a Stamper, fields: &'a MetadataFields) -> Result<Self, StampError> {
    stamper.stamp(fields)?;
    Ok(Self {
      stamper,
      fields,
      released: false,
    })
  }

  /// Revert the file now.
  pub fn release(mut self) -> Result<usize, StampError> {
    self.released = true;
    self.stamper.unstamp(self.fields)
  }
}

impl Drop for StampGuard<'_> {
  fn drop(&mut self) {
    if self.released {
      return;
    }

    if let Err(e) = self.stamper.unstamp(self.fields) {
      error!("Failed to revert {}: {e}", self.stamper.path().display());
    }
  }
}
