//! Color utilities for terminal output
//!
//! Progress and result lines go through a [`ColorScheme`] so `--color` and
//! TTY detection are honoured in one place.

use std::fmt::Display;
use std::io::IsTerminal;

use owo_colors::{OwoColorize, Style};

use crate::cli::ColorOption;

/// Semantic styles for terminal output.
///
/// Methods are named for what the text means (success, path, code) rather
/// than the color used.
pub struct ColorScheme {
  enabled: bool,
}

impl ColorScheme {
  /// Create a color scheme from the `--color` preference; `auto` enables
  /// colors only when stdout is a terminal.
  pub fn new(color_option: ColorOption) -> Self {
    let enabled = match color_option {
      ColorOption::Always => true,
      ColorOption::Never => false,
      ColorOption::Auto => std::io::stdout().is_terminal(),
    };

    Self { enabled }
  }

  pub fn is_enabled(&self) -> bool {
    self.enabled
  }

  fn paint<T: Display>(&self, text: T, style: Style) -> String {
    if self.enabled {
      text.style(style).to_string()
    } else {
      text.to_string()
    }
  }

  pub fn success<T: Display>(&self, text: T) -> String {
    self.paint(text, Style::new().green())
  }

  pub fn error<T: Display>(&self, text: T) -> String {
    self.paint(text, Style::new().bright_red().bold())
  }

  pub fn warning<T: Display>(&self, text: T) -> String {
    self.paint(text, Style::new().yellow())
  }

  pub fn info<T: Display>(&self, text: T) -> String {
    self.paint(text, Style::new().cyan())
  }

  pub fn emphasis<T: Display>(&self, text: T) -> String {
    self.paint(text, Style::new().bright_white().bold())
  }

  /// File paths and artifacts
  pub fn path<T: Display>(&self, text: T) -> String {
    self.paint(text, Style::new().magenta())
  }

  /// Counts and resolved values
  pub fn number<T: Display>(&self, text: T) -> String {
    self.paint(text, Style::new().bright_blue())
  }

  /// Command lines and sentinel tokens
  pub fn code<T: Display>(&self, text: T) -> String {
    self.paint(text, Style::new().bright_green())
  }

  pub fn dimmed<T: Display>(&self, text: T) -> String {
    self.paint(text, Style::new().dimmed())
  }

  pub fn progress<T: Display>(&self, text: T) -> String {
    self.paint(text, Style::new().bright_cyan())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_color_scheme_disabled() {
    let scheme = ColorScheme::new(ColorOption::Never);
    assert!(!scheme.is_enabled());
    assert_eq!(scheme.success("unstamped"), "unstamped");
    assert_eq!(scheme.code("go build"), "go build");
  }

  #[test]
  fn test_color_scheme_enabled() {
    let scheme = ColorScheme::new(ColorOption::Always);
    assert!(scheme.is_enabled());
    assert_ne!(scheme.success("unstamped"), "unstamped");
    assert!(scheme.error("stamped").contains("stamped"));
  }

  #[test]
  fn test_all_semantic_colors() {
    let scheme = ColorScheme::new(ColorOption::Always);
    let text = "qBack.exe";

    assert!(!scheme.success(text).is_empty());
    assert!(!scheme.error(text).is_empty());
    assert!(!scheme.warning(text).is_empty());
    assert!(!scheme.info(text).is_empty());
    assert!(!scheme.emphasis(text).is_empty());
    assert!(!scheme.path(text).is_empty());
    assert!(!scheme.number(text).is_empty());
    assert!(!scheme.code(text).is_empty());
    assert!(!scheme.dimmed(text).is_empty());
    assert!(!scheme.progress(text).is_empty());
  }
}
