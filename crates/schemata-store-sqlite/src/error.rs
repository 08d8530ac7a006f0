//! Error type for `schemata-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] schemata_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("row decode error: {0}")]
  Decode(String),
}

/// Collapse into the core taxonomy so callers (e.g. the API layer) can map
/// outcomes to responses without knowing the backend.
impl From<Error> for schemata_core::Error {
  fn from(err: Error) -> Self {
    match err {
      Error::Core(e) => e,
      Error::Json(e) => schemata_core::Error::Serialization(e),
      other => schemata_core::Error::Storage(other.to_string()),
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
