//! Error type for `roster-import`.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("SERVER and DATABASE must be provided")]
  MissingParams,

  #[error("invalid legacy database location: {0}")]
  InvalidLocation(String),

  #[error("legacy database not found: {}", .0.display())]
  DatabaseNotFound(PathBuf),

  #[error("legacy database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  /// Failure reading from a non-SQLite legacy source.
  #[error("legacy source error: {0}")]
  Source(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub fn legacy(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Source(Box::new(e))
  }

  pub fn store(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Store(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
