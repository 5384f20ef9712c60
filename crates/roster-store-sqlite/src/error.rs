//! Error type for `roster-store-sqlite`.

use roster_core::ResourceKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  /// A stored column could not be read back as its schema type.
  #[error("cannot decode {table}.{column}: {message}")]
  Decode {
    table:   &'static str,
    column:  &'static str,
    message: String,
  },

  #[error("upsert into {0} requires an id")]
  MissingId(ResourceKind),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
