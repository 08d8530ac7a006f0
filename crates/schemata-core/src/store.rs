//! The `SchemaStore` trait.
//!
//! Implemented by storage backends (e.g. `schemata-store-sqlite`). Higher
//! layers (`schemata-api`, the server binary) depend on this abstraction,
//! not on any concrete backend.

use std::future::Future;

use serde_json::Value;

use crate::{
  revision::{DataRecord, NewDataRecord, NewSchema, SchemaRevision, SchemaUpdate},
  version::Version,
};

/// Abstraction over a schema-registry backend.
///
/// Revisions form an append-only sequence per title: proposing never replaces
/// an existing revision, and no operation deletes one. The (title, version)
/// uniqueness invariant is enforced by the backend's storage layer, which is
/// the final arbiter when concurrent proposers race on the same title.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait SchemaStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Schema revisions ──────────────────────────────────────────────────

  /// Validate, version, embed, and persist a proposed schema.
  ///
  /// The version is computed against the latest revision for the title
  /// inside the same transaction as the insert; a losing racer is retried a
  /// bounded number of times before surfacing a retryable conflict.
  fn propose_schema(
    &self,
    input: NewSchema,
  ) -> impl Future<Output = Result<SchemaRevision, Self::Error>> + Send + '_;

  /// Apply in-place changes to an existing revision (same version — this is
  /// not a new revision). Re-validates the schema, rebuilds the served form,
  /// and refreshes `modified_at`.
  fn update_schema<'a>(
    &'a self,
    slug: &'a str,
    version: Version,
    changes: SchemaUpdate,
  ) -> impl Future<Output = Result<SchemaRevision, Self::Error>> + Send + 'a;

  /// Resolve a revision. With `version` omitted, the latest *published*
  /// revision for `slug`; with `version` given, the exact match regardless
  /// of publish state.
  fn get_schema<'a>(
    &'a self,
    slug: &'a str,
    version: Option<Version>,
  ) -> impl Future<Output = Result<Option<SchemaRevision>, Self::Error>> + Send + 'a;

  /// All published revisions, title ascending then version descending
  /// (numeric comparison, never lexicographic).
  fn list_published(
    &self,
  ) -> impl Future<Output = Result<Vec<SchemaRevision>, Self::Error>> + Send + '_;

  /// Toggle the publish flag of an exact revision.
  fn set_published<'a>(
    &'a self,
    slug: &'a str,
    version: Version,
    published: bool,
  ) -> impl Future<Output = Result<SchemaRevision, Self::Error>> + Send + 'a;

  // ── Data records ──────────────────────────────────────────────────────

  /// Validate `payload` against the referenced revision's raw form and
  /// persist it. Writing to an existing (revision, subject, data_version)
  /// key updates the payload in place; `created_at` is preserved.
  fn write_data_record(
    &self,
    input: NewDataRecord,
  ) -> impl Future<Output = Result<DataRecord, Self::Error>> + Send + '_;

  fn get_data_record<'a>(
    &'a self,
    slug: &'a str,
    version: Version,
    subject_id: i64,
    data_version: i64,
  ) -> impl Future<Output = Result<Option<DataRecord>, Self::Error>> + Send + 'a;

  fn list_data_records<'a>(
    &'a self,
    slug: &'a str,
    version: Version,
  ) -> impl Future<Output = Result<Vec<DataRecord>, Self::Error>> + Send + 'a;

  /// Validate a payload against a revision without persisting anything.
  fn check_payload<'a>(
    &'a self,
    slug: &'a str,
    version: Version,
    payload: &'a Value,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}
