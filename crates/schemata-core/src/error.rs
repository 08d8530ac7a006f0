//! Error types for `schemata-core`.
//!
//! Validation failures (`InvalidSchema`, `InvalidData`) are expected,
//! user-correctable conditions; they carry display-safe message lists and are
//! never surfaced as opaque faults. Library error types from the external
//! validator do not appear here.

use thiserror::Error;

use crate::version::Version;

#[derive(Debug, Error)]
pub enum Error {
  #[error("the schema was null")]
  SchemaIsNull,

  #[error("the data document was null")]
  DataIsNull,

  #[error("the JSON schema was empty")]
  EmptyDocument,

  #[error(
    "no \"$schema\" keyword present; example: \
     {{\"$schema\": \"http://json-schema.org/draft-04/schema#\"}}"
  )]
  MissingSchemaKeyword,

  #[error("the \"$schema\" value {0:?} is not recognized by this deployment")]
  UnsupportedSchemaVersion(String),

  /// The proposed document is not itself a structurally valid schema.
  #[error("invalid schema: {}", .0.join("; "))]
  InvalidSchema(Vec<String>),

  /// A data document failed validation against its schema.
  #[error("invalid data: {}", .0.join("; "))]
  InvalidData(Vec<String>),

  #[error("schema not found: {slug} {version:?}")]
  NotFound {
    slug:    String,
    version: Option<Version>,
  },

  /// A revision with this (title, version) already exists.
  #[error("schema {title:?} already has a revision {version}")]
  DuplicateVersion { title: String, version: Version },

  /// Concurrent proposers exhausted the bounded retry budget; the caller
  /// may retry the whole operation.
  #[error("could not allocate a version for {title:?} after repeated conflicts")]
  ConflictRetry { title: String },

  #[error("malformed version string: {0:?}")]
  VersionParse(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),

  /// Carrier for backend storage faults, stringified by the store crate.
  #[error("storage error: {0}")]
  Storage(String),
}

impl Error {
  /// The display-safe message list for this error.
  ///
  /// Validation variants already carry their formatted messages; everything
  /// else collapses to a single line.
  pub fn messages(&self) -> Vec<String> {
    match self {
      Error::InvalidSchema(msgs) | Error::InvalidData(msgs) => msgs.clone(),
      other => vec![other.to_string()],
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
