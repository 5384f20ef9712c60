//! Error types for `roster-core`.

use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;

use crate::resource::ResourceKind;

/// Field-level validation problems, keyed by field name.
///
/// Serialises as `{"field": ["message", ...], ...}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
  pub fn new() -> Self { Self::default() }

  pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
    self.0.entry(field.into()).or_default().push(message.into());
  }

  pub fn is_empty(&self) -> bool { self.0.is_empty() }

  /// Messages recorded for `field`, if any.
  pub fn get(&self, field: &str) -> Option<&[String]> {
    self.0.get(field).map(Vec::as_slice)
  }

  /// `Ok(value)` when nothing was recorded, otherwise `Err(self)`.
  pub fn into_result<T>(self, value: T) -> Result<T, Self> {
    if self.is_empty() { Ok(value) } else { Err(self) }
  }
}

impl std::fmt::Display for FieldErrors {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let mut first = true;
    for (field, messages) in &self.0 {
      for message in messages {
        if !first {
          f.write_str("; ")?;
        }
        write!(f, "{field}: {message}")?;
        first = false;
      }
    }
    Ok(())
  }
}

#[derive(Debug, Error)]
pub enum Error {
  #[error("Invalid action")]
  InvalidAction(String),

  #[error("{0}")]
  BadRequest(String),

  #[error("validation failed: {0}")]
  Validation(FieldErrors),

  #[error("{kind} not found.")]
  NotFound { kind: ResourceKind, id: i64 },

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Wrap a backend error.
  pub fn store(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Store(Box::new(e))
  }
}

impl From<FieldErrors> for Error {
  fn from(errors: FieldErrors) -> Self { Self::Validation(errors) }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
