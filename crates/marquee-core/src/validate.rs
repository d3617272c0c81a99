//! Field-level validation and the normalisation helpers shared by every
//! entity's pre-save hook.

use std::fmt;

use chrono::{Datelike, Utc};
use serde::Serialize;

/// A single rejected field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
  pub field:   String,
  pub message: String,
}

/// Every field error found in one validation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
  pub fn new() -> Self { Self::default() }

  pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
    let mut errors = Self::new();
    errors.push(field, message);
    errors
  }

  pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
    self.0.push(FieldError { field: field.into(), message: message.into() });
  }

  pub fn is_empty(&self) -> bool { self.0.is_empty() }

  pub fn len(&self) -> usize { self.0.len() }

  pub fn iter(&self) -> impl Iterator<Item = &FieldError> { self.0.iter() }

  pub fn has(&self, field: &str) -> bool { self.0.iter().any(|e| e.field == field) }

  /// `Ok(())` when nothing was recorded.
  pub fn finish(self) -> Result<(), Self> {
    if self.is_empty() { Ok(()) } else { Err(self) }
  }
}

impl fmt::Display for ValidationErrors {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let mut first = true;
    for e in &self.0 {
      if !first {
        f.write_str("; ")?;
      }
      write!(f, "{}: {}", e.field, e.message)?;
      first = false;
    }
    Ok(())
  }
}

impl std::error::Error for ValidationErrors {}

// ─── Checks ──────────────────────────────────────────────────────────────────

/// Require a non-empty string whose length (in chars) is within `min..=max`.
pub fn required_text(
  errors: &mut ValidationErrors,
  field: &str,
  value: &str,
  min: usize,
  max: usize,
) {
  let len = value.chars().count();
  if len == 0 {
    errors.push(field, "is required");
  } else if len < min || len > max {
    errors.push(field, format!("must be between {min} and {max} characters"));
  }
}

pub fn max_text(errors: &mut ValidationErrors, field: &str, value: Option<&str>, max: usize) {
  if let Some(v) = value
    && v.chars().count() > max
  {
    errors.push(field, format!("must be at most {max} characters"));
  }
}

pub fn url(errors: &mut ValidationErrors, field: &str, value: Option<&str>) {
  if let Some(v) = value
    && !is_http_url(v)
  {
    errors.push(field, "must be an http(s) URL");
  }
}

pub fn in_range<T: PartialOrd + fmt::Display + Copy>(
  errors: &mut ValidationErrors,
  field: &str,
  value: Option<T>,
  min: T,
  max: T,
) {
  if let Some(v) = value
    && (v < min || v > max)
  {
    errors.push(field, format!("must be between {min} and {max}"));
  }
}

pub fn is_http_url(s: &str) -> bool {
  let rest = s
    .strip_prefix("https://")
    .or_else(|| s.strip_prefix("http://"));
  matches!(rest, Some(host) if !host.is_empty() && !host.starts_with('/'))
}

pub fn current_year() -> i32 { Utc::now().year() }

// ─── Normalisation ───────────────────────────────────────────────────────────

pub fn trim(s: &mut String) {
  let trimmed = s.trim();
  if trimmed.len() != s.len() {
    *s = trimmed.to_owned();
  }
}

/// Trim in place; blank strings collapse to `None`.
pub fn trim_opt(s: &mut Option<String>) {
  if let Some(v) = s {
    trim(v);
    if v.is_empty() {
      *s = None;
    }
  }
}

/// Lowercase, trim and deduplicate, keeping first-appearance order.
pub fn normalize_tags(tags: &mut Vec<String>) {
  let mut seen: Vec<String> = Vec::with_capacity(tags.len());
  for tag in tags.drain(..) {
    let tag = tag.trim().to_lowercase();
    if !tag.is_empty() && !seen.contains(&tag) {
      seen.push(tag);
    }
  }
  *tags = seen;
}

/// Deduplicate, keeping first-appearance order.
pub fn dedup<T: PartialEq>(items: &mut Vec<T>) {
  let mut out: Vec<T> = Vec::with_capacity(items.len());
  for item in items.drain(..) {
    if !out.contains(&item) {
      out.push(item);
    }
  }
  *items = out;
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn tags_are_folded_and_deduplicated() {
    let mut tags = vec![
      " Noir ".to_string(),
      "noir".into(),
      "".into(),
      "Heist".into(),
      "NOIR".into(),
    ];
    normalize_tags(&mut tags);
    assert_eq!(tags, ["noir", "heist"]);
  }

  #[test]
  fn blank_optional_text_becomes_none() {
    let mut s = Some("   ".to_string());
    trim_opt(&mut s);
    assert!(s.is_none());

    let mut s = Some("  x ".to_string());
    trim_opt(&mut s);
    assert_eq!(s.as_deref(), Some("x"));
  }

  #[test]
  fn required_text_bounds() {
    let mut errors = ValidationErrors::new();
    required_text(&mut errors, "name", "", 2, 5);
    required_text(&mut errors, "short", "a", 2, 5);
    required_text(&mut errors, "long", "abcdef", 2, 5);
    required_text(&mut errors, "ok", "abc", 2, 5);
    assert!(errors.has("name"));
    assert!(errors.has("short"));
    assert!(errors.has("long"));
    assert!(!errors.has("ok"));
    assert_eq!(errors.len(), 3);
  }

  #[test]
  fn http_urls() {
    assert!(is_http_url("https://example.com/poster.jpg"));
    assert!(is_http_url("http://a"));
    assert!(!is_http_url("ftp://example.com"));
    assert!(!is_http_url("https://"));
    assert!(!is_http_url("example.com"));
  }

  #[test]
  fn display_joins_fields() {
    let mut errors = ValidationErrors::single("name", "is required");
    errors.push("year", "must be a number");
    assert_eq!(errors.to_string(), "name: is required; year: must be a number");
  }
}
