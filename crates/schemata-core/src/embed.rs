//! The self-description embedder.
//!
//! Produces the served form of a revision: a copy of the raw schema with a
//! reserved top-level `self` key inserted ahead of all other keys, carrying
//! the registry metadata for that exact revision. Key order is a contract —
//! consumers compare served documents byte-for-byte.

use serde_json::{Map, Value};

use crate::revision::SchemaRevision;

/// The reserved top-level key. Any `self` present in a proposed document is
/// discarded and replaced.
pub const SELF_KEY: &str = "self";

/// Build the served form of `revision` from its raw schema and metadata.
///
/// Pure: never mutates its input, ignores `revision.served`. Calling it twice
/// on the same stored revision yields identical output, so the persisted
/// served form is reproducible from the revision's own fields.
pub fn embed(revision: &SchemaRevision) -> Map<String, Value> {
  let mut meta = Map::new();
  meta.insert(
    "version".to_owned(),
    Value::Number(revision.version.as_number()),
  );
  meta.insert(
    "dataverse_installation_id".to_owned(),
    Value::String(revision.installation_id.clone()),
  );
  meta.insert("url".to_owned(), Value::String(revision.api_url()));
  meta.insert(
    "modified".to_owned(),
    Value::String(revision.modified_at.to_rfc3339()),
  );
  meta.insert(
    "description".to_owned(),
    Value::String(revision.description.clone()),
  );
  meta.insert(
    "contributor".to_owned(),
    Value::String(revision.contributor.clone()),
  );

  // `self` first, then the original keys in their original relative order.
  let mut served = Map::new();
  served.insert(SELF_KEY.to_owned(), Value::Object(meta));
  for (key, value) in &revision.raw_schema {
    if key == SELF_KEY {
      continue;
    }
    served.insert(key.clone(), value.clone());
  }

  served
}

#[cfg(test)]
mod tests {
  use chrono::{TimeZone, Utc};
  use serde_json::{Value, json};

  use super::{SELF_KEY, embed};
  use crate::{revision::SchemaRevision, version::Version};

  fn revision(raw: Value) -> SchemaRevision {
    let at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
    SchemaRevision {
      title:           "Dataset Meta".into(),
      slug:            "dataset-meta".into(),
      version:         Version::new(1, 0),
      installation_id: "harvard-dataverse".into(),
      description:     "basic dataset metadata".into(),
      contributor:     "Dataverse core".into(),
      published:       true,
      raw_schema:      raw.as_object().unwrap().clone(),
      served:          serde_json::Map::new(),
      created_at:      at,
      modified_at:     at,
    }
  }

  #[test]
  fn self_is_the_first_key() {
    let rev = revision(json!({
      "$schema": "http://json-schema.org/draft-04/schema#",
      "type": "object",
    }));
    let served = embed(&rev);
    assert_eq!(served.keys().next().map(String::as_str), Some(SELF_KEY));
  }

  #[test]
  fn version_is_a_number_not_a_string() {
    let rev = revision(json!({"$schema": "x", "type": "object"}));
    let served = embed(&rev);
    let version = &served[SELF_KEY]["version"];
    assert!(version.is_number());
    assert_eq!(version.as_f64(), Some(1.0));
  }

  #[test]
  fn original_key_order_is_preserved_after_self() {
    let rev = revision(json!({
      "$schema": "http://json-schema.org/draft-04/schema#",
      "title": "d",
      "type": "object",
      "properties": {"x": {"type": "string"}},
    }));
    let served = embed(&rev);
    let keys: Vec<&str> = served.keys().map(String::as_str).collect();
    assert_eq!(keys, ["self", "$schema", "title", "type", "properties"]);
  }

  #[test]
  fn stale_self_in_raw_document_is_discarded() {
    let rev = revision(json!({
      "self": {"version": "stale"},
      "$schema": "x",
    }));
    let served = embed(&rev);
    assert_eq!(served[SELF_KEY]["version"].as_f64(), Some(1.0));
    // Exactly one `self`, and it is first.
    assert_eq!(served.keys().filter(|k| *k == SELF_KEY).count(), 1);
    assert_eq!(served.keys().next().map(String::as_str), Some(SELF_KEY));
  }

  #[test]
  fn embedding_twice_is_byte_identical() {
    let rev = revision(json!({
      "$schema": "http://json-schema.org/draft-04/schema#",
      "type": "object",
      "properties": {"x": {"type": "string"}},
    }));
    let a = serde_json::to_string(&embed(&rev)).unwrap();
    let b = serde_json::to_string(&embed(&rev)).unwrap();
    assert_eq!(a, b);
  }

  #[test]
  fn metadata_fields_are_complete_and_ordered() {
    let rev = revision(json!({"$schema": "x"}));
    let served = embed(&rev);
    let meta = served[SELF_KEY].as_object().unwrap();
    let keys: Vec<&str> = meta.keys().map(String::as_str).collect();
    assert_eq!(keys, [
      "version",
      "dataverse_installation_id",
      "url",
      "modified",
      "description",
      "contributor",
    ]);
    assert_eq!(meta["url"], "/schemas/dataset-meta/1.0");
    assert_eq!(meta["modified"], "2024-03-01T12:00:00+00:00");
  }
}
