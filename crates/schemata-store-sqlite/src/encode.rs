//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings. Schema documents and payloads
//! are stored as compact JSON text. Versions are stored as two INTEGER
//! columns so SQL `ORDER BY` compares them numerically (1.10 sorts above
//! 1.9), never lexicographically.

use chrono::{DateTime, Utc};
use schemata_core::{
  revision::{DataRecord, SchemaRevision},
  version::Version,
};
use serde_json::{Map, Value};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Version ─────────────────────────────────────────────────────────────────

pub fn decode_version(major: i64, minor: i64) -> Result<Version> {
  let major = u32::try_from(major)
    .map_err(|_| Error::Decode(format!("version major out of range: {major}")))?;
  let minor = u32::try_from(minor)
    .map_err(|_| Error::Decode(format!("version minor out of range: {minor}")))?;
  Ok(Version::new(major, minor))
}

// ─── JSON documents ──────────────────────────────────────────────────────────

pub fn encode_document(doc: &Map<String, Value>) -> Result<String> {
  Ok(serde_json::to_string(doc)?)
}

pub fn decode_document(s: &str) -> Result<Map<String, Value>> {
  Ok(serde_json::from_str(s)?)
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list matching [`RawRevision::from_row`]. Keep the two in sync.
pub const REVISION_COLUMNS: &str = "title, slug, version_major, version_minor, \
   installation_id, description, contributor, published, raw_json, \
   served_json, created_at, modified_at";

/// Raw values read directly from a `schema_revisions` row.
pub struct RawRevision {
  pub title:           String,
  pub slug:            String,
  pub version_major:   i64,
  pub version_minor:   i64,
  pub installation_id: String,
  pub description:     String,
  pub contributor:     String,
  pub published:       bool,
  pub raw_json:        String,
  pub served_json:     String,
  pub created_at:      String,
  pub modified_at:     String,
}

impl RawRevision {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      title:           row.get(0)?,
      slug:            row.get(1)?,
      version_major:   row.get(2)?,
      version_minor:   row.get(3)?,
      installation_id: row.get(4)?,
      description:     row.get(5)?,
      contributor:     row.get(6)?,
      published:       row.get(7)?,
      raw_json:        row.get(8)?,
      served_json:     row.get(9)?,
      created_at:      row.get(10)?,
      modified_at:     row.get(11)?,
    })
  }

  pub fn into_revision(self) -> Result<SchemaRevision> {
    Ok(SchemaRevision {
      title:           self.title,
      slug:            self.slug,
      version:         decode_version(self.version_major, self.version_minor)?,
      installation_id: self.installation_id,
      description:     self.description,
      contributor:     self.contributor,
      published:       self.published,
      raw_schema:      decode_document(&self.raw_json)?,
      served:          decode_document(&self.served_json)?,
      created_at:      decode_dt(&self.created_at)?,
      modified_at:     decode_dt(&self.modified_at)?,
    })
  }
}

/// Column list matching [`RawDataRecord::from_row`]; `s` is the joined
/// `schema_revisions` table, `d` the `data_records` table.
pub const RECORD_COLUMNS: &str = "s.slug, s.version_major, s.version_minor, \
   d.subject_id, d.data_version, d.payload_json, d.published, d.created_at, \
   d.modified_at";

/// Raw values read from a `data_records` row joined with its revision.
pub struct RawDataRecord {
  pub slug:          String,
  pub version_major: i64,
  pub version_minor: i64,
  pub subject_id:    i64,
  pub data_version:  i64,
  pub payload_json:  String,
  pub published:     bool,
  pub created_at:    String,
  pub modified_at:   String,
}

impl RawDataRecord {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      slug:          row.get(0)?,
      version_major: row.get(1)?,
      version_minor: row.get(2)?,
      subject_id:    row.get(3)?,
      data_version:  row.get(4)?,
      payload_json:  row.get(5)?,
      published:     row.get(6)?,
      created_at:    row.get(7)?,
      modified_at:   row.get(8)?,
    })
  }

  pub fn into_record(self) -> Result<DataRecord> {
    Ok(DataRecord {
      schema_slug:    self.slug,
      schema_version: decode_version(self.version_major, self.version_minor)?,
      subject_id:     self.subject_id,
      data_version:   self.data_version,
      payload:        serde_json::from_str(&self.payload_json)?,
      published:      self.published,
      created_at:     decode_dt(&self.created_at)?,
      modified_at:    decode_dt(&self.modified_at)?,
    })
  }
}
