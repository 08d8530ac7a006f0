//! Schema revisions and data records — the two persisted entities of the
//! registry.
//!
//! A revision is one versioned snapshot of a JSON Schema document under a
//! title. Revisions are never deleted or renumbered; they may be edited in
//! place (same version) and their publish state may be toggled. Data records
//! hang off exactly one revision and carry a payload that validated against
//! the revision's raw form at write time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::version::{Bump, Version};

// ─── SchemaRevision ──────────────────────────────────────────────────────────

/// One immutable-once-published version of a named schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaRevision {
  pub title:           String,
  /// Derived from `title`; shared across versions of the same title.
  pub slug:            String,
  pub version:         Version,
  pub installation_id: String,
  pub description:     String,
  pub contributor:     String,
  pub published:       bool,
  /// The schema exactly as proposed, minus any reserved `self` key. Data
  /// payloads validate against this form.
  pub raw_schema:      Map<String, Value>,
  /// The externally served form with registry metadata embedded; computed
  /// and persisted at write time.
  pub served:          Map<String, Value>,
  pub created_at:      DateTime<Utc>,
  pub modified_at:     DateTime<Utc>,
}

impl SchemaRevision {
  /// The deterministic API path for this revision; embedded into the served
  /// form as `self.url`.
  pub fn api_url(&self) -> String {
    format!("/schemas/{}/{}", self.slug, self.version)
  }
}

/// Input for a propose operation. The version is not caller-settable; it is
/// computed from the latest revision for `title` and the bump kind.
#[derive(Debug, Clone)]
pub struct NewSchema {
  pub title:           String,
  pub raw_schema:      Map<String, Value>,
  pub bump:            Bump,
  pub description:     String,
  pub contributor:     String,
  pub installation_id: String,
}

/// In-place changes to an existing revision. `None` fields are untouched.
#[derive(Debug, Clone, Default)]
pub struct SchemaUpdate {
  pub raw_schema:  Option<Map<String, Value>>,
  pub description: Option<String>,
  pub contributor: Option<String>,
}

// ─── DataRecord ──────────────────────────────────────────────────────────────

/// One metadata document validated against a specific schema revision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataRecord {
  pub schema_slug:    String,
  pub schema_version: Version,
  /// External entity the payload describes (e.g. a file identifier).
  pub subject_id:     i64,
  /// Caller-supplied, scoped per (revision, subject).
  pub data_version:   i64,
  pub payload:        Value,
  pub published:      bool,
  pub created_at:     DateTime<Utc>,
  pub modified_at:    DateTime<Utc>,
}

/// Input for a data-record write. The referenced revision must already exist.
#[derive(Debug, Clone)]
pub struct NewDataRecord {
  pub schema_slug:    String,
  pub schema_version: Version,
  pub subject_id:     i64,
  pub data_version:   i64,
  pub payload:        Value,
}
