//! The validation gateway — a thin adapter over the `jsonschema` crate.
//!
//! Two contracts: `check_schema` decides whether a proposed document is
//! itself a structurally valid Draft 4 schema (by validating it against the
//! embedded Draft 4 meta-schema, the same check `Draft4Validator.check_schema`
//! performs); `validate_data` validates a data document against a schema.
//! Library error types never cross this boundary — failures come back as
//! display-safe message lists.

use std::{collections::BTreeSet, sync::LazyLock};

use jsonschema::{Draft, JSONSchema, ValidationError};
use serde_json::Value;

use crate::error::{Error, Result};

/// The one dialect every deployment accepts.
pub const DRAFT4_DIALECT: &str = "http://json-schema.org/draft-04/schema#";

const DIALECT_NOTE: &str = "(Note: JSON schema Draft 4 validation was used)";

static DRAFT4_META: LazyLock<JSONSchema> = LazyLock::new(|| {
  let meta: Value = serde_json::from_str(include_str!("draft04_meta.json"))
    .expect("embedded draft-04 meta-schema is valid JSON");
  JSONSchema::options()
    .with_draft(Draft::Draft4)
    .compile(&meta)
    .expect("embedded draft-04 meta-schema compiles")
});

// ─── Message formatting ──────────────────────────────────────────────────────

/// Format one validator error as the registry's message triple: location
/// (when the error is below the root), description, dialect note.
fn error_messages(err: &ValidationError<'_>) -> Vec<String> {
  let mut msgs = Vec::with_capacity(3);

  let pointer = err.instance_path.to_string();
  let location = pointer
    .split('/')
    .filter(|chunk| !chunk.is_empty())
    .collect::<Vec<_>>()
    .join("->");
  if !location.is_empty() {
    msgs.push(format!("Error Location: {location}"));
  }

  msgs.push(format!("Error: {err}"));
  msgs.push(DIALECT_NOTE.to_owned());
  msgs
}

// ─── Gateway ─────────────────────────────────────────────────────────────────

/// Validation gateway with the set of `$schema` URIs this deployment accepts.
#[derive(Debug, Clone)]
pub struct SchemaValidator {
  accepted_dialects: BTreeSet<String>,
}

impl Default for SchemaValidator {
  fn default() -> Self {
    Self {
      accepted_dialects: BTreeSet::from([DRAFT4_DIALECT.to_owned()]),
    }
  }
}

impl SchemaValidator {
  /// A gateway accepting exactly `dialects`. Falls back to the Draft 4
  /// dialect when the iterator is empty.
  pub fn new<I>(dialects: I) -> Self
  where
    I: IntoIterator<Item = String>,
  {
    let accepted_dialects: BTreeSet<String> = dialects.into_iter().collect();
    if accepted_dialects.is_empty() {
      return Self::default();
    }
    Self { accepted_dialects }
  }

  pub fn accepted_dialects(&self) -> impl Iterator<Item = &str> {
    self.accepted_dialects.iter().map(String::as_str)
  }

  /// Check that `doc` is a structurally valid schema.
  ///
  /// Gate order: null, empty, missing `$schema`, unrecognised `$schema`,
  /// then meta-schema validation.
  pub fn check_schema(&self, doc: &Value) -> Result<()> {
    if doc.is_null() {
      return Err(Error::SchemaIsNull);
    }
    let object = match doc.as_object() {
      Some(object) => object,
      None => {
        return Err(Error::InvalidSchema(vec![
          "Error: the schema must be a JSON object".to_owned(),
          DIALECT_NOTE.to_owned(),
        ]));
      }
    };
    if object.is_empty() {
      return Err(Error::EmptyDocument);
    }

    // Only a genuinely absent keyword is "missing"; a present-but-non-string
    // value is an unrecognised dialect, not a missing one.
    let dialect = match object.get("$schema") {
      None => return Err(Error::MissingSchemaKeyword),
      Some(Value::String(dialect)) => dialect.as_str(),
      Some(other) => {
        return Err(Error::UnsupportedSchemaVersion(other.to_string()));
      }
    };
    if !self.accepted_dialects.contains(dialect) {
      return Err(Error::UnsupportedSchemaVersion(dialect.to_owned()));
    }

    if let Err(errors) = DRAFT4_META.validate(doc) {
      let msgs = errors.flat_map(|e| error_messages(&e)).collect();
      return Err(Error::InvalidSchema(msgs));
    }
    Ok(())
  }

  /// Validate `data` against `schema`.
  ///
  /// A schema that fails to compile surfaces as `InvalidSchema`; a data
  /// document that fails validation surfaces as `InvalidData`.
  pub fn validate_data(&self, schema: &Value, data: &Value) -> Result<()> {
    if schema.is_null() {
      return Err(Error::SchemaIsNull);
    }
    if data.is_null() {
      return Err(Error::DataIsNull);
    }

    let compiled = JSONSchema::options()
      .with_draft(Draft::Draft4)
      .compile(schema)
      .map_err(|e| Error::InvalidSchema(error_messages(&e)))?;

    if let Err(errors) = compiled.validate(data) {
      let msgs = errors.flat_map(|e| error_messages(&e)).collect();
      return Err(Error::InvalidData(msgs));
    }
    Ok(())
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
