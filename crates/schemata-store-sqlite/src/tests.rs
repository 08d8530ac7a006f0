//! Integration tests for `SqliteStore` against an in-memory database.

use schemata_core::{
  Error as CoreError,
  revision::{NewDataRecord, NewSchema, SchemaUpdate},
  store::SchemaStore,
  validate::{DRAFT4_DIALECT, SchemaValidator},
  version::{Bump, Version},
};
use serde_json::{Map, Value, json};

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory(SchemaValidator::default())
    .await
    .expect("in-memory store")
}

fn dataset_schema() -> Map<String, Value> {
  json!({
    "$schema": DRAFT4_DIALECT,
    "type": "object",
    "properties": {"x": {"type": "string"}},
  })
  .as_object()
  .unwrap()
  .clone()
}

fn proposal(title: &str, bump: Bump) -> NewSchema {
  NewSchema {
    title:           title.to_owned(),
    raw_schema:      dataset_schema(),
    bump,
    description:     "test schema".to_owned(),
    contributor:     "Dataverse core".to_owned(),
    installation_id: "harvard-dataverse".to_owned(),
  }
}

fn core_err(err: Error) -> CoreError { err.into() }

// ─── Propose ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn first_proposal_is_version_one_point_zero() {
  let s = store().await;

  let rev = s
    .propose_schema(proposal("dataset-meta", Bump::Minor))
    .await
    .unwrap();

  assert_eq!(rev.version, Version::new(1, 0));
  assert_eq!(rev.slug, "dataset-meta");
  assert!(rev.published);
  assert_eq!(rev.created_at, rev.modified_at);
}

#[tokio::test]
async fn bump_sequence_minor_minor_major() {
  let s = store().await;

  let v1 = s
    .propose_schema(proposal("dataset-meta", Bump::Minor))
    .await
    .unwrap();
  let v2 = s
    .propose_schema(proposal("dataset-meta", Bump::Minor))
    .await
    .unwrap();
  let v3 = s
    .propose_schema(proposal("dataset-meta", Bump::Major))
    .await
    .unwrap();

  assert_eq!(v1.version, Version::new(1, 0));
  assert_eq!(v2.version, Version::new(1, 1));
  assert_eq!(v3.version, Version::new(2, 0));
}

#[tokio::test]
async fn titles_version_independently() {
  let s = store().await;

  s.propose_schema(proposal("alpha", Bump::Minor)).await.unwrap();
  s.propose_schema(proposal("alpha", Bump::Minor)).await.unwrap();
  let beta = s.propose_schema(proposal("beta", Bump::Minor)).await.unwrap();

  assert_eq!(beta.version, Version::new(1, 0));
}

#[tokio::test]
async fn served_form_embeds_self_first_with_numeric_version() {
  let s = store().await;

  let rev = s
    .propose_schema(proposal("dataset-meta", Bump::Minor))
    .await
    .unwrap();

  assert_eq!(rev.served.keys().next().map(String::as_str), Some("self"));
  let meta = rev.served["self"].as_object().unwrap();
  assert_eq!(meta["version"].as_f64(), Some(1.0));
  assert!(meta["version"].is_number());
  assert_eq!(meta["url"], "/schemas/dataset-meta/1.0");
  assert_eq!(meta["dataverse_installation_id"], "harvard-dataverse");
  assert_eq!(meta["contributor"], "Dataverse core");
}

#[tokio::test]
async fn reserved_self_key_is_stripped_from_raw_form() {
  let s = store().await;

  let mut input = proposal("dataset-meta", Bump::Minor);
  input
    .raw_schema
    .insert("self".to_owned(), json!({"version": "forged"}));

  let rev = s.propose_schema(input).await.unwrap();
  assert!(!rev.raw_schema.contains_key("self"));
  assert_eq!(rev.served["self"]["version"].as_f64(), Some(1.0));
}

#[tokio::test]
async fn propose_rejects_empty_document() {
  let s = store().await;

  let mut input = proposal("dataset-meta", Bump::Minor);
  input.raw_schema = Map::new();

  let err = s.propose_schema(input).await.unwrap_err();
  assert!(matches!(core_err(err), CoreError::EmptyDocument));
}

#[tokio::test]
async fn propose_rejects_missing_schema_keyword() {
  let s = store().await;

  let mut input = proposal("dataset-meta", Bump::Minor);
  input.raw_schema = json!({"foo": "bar"}).as_object().unwrap().clone();

  let err = s.propose_schema(input).await.unwrap_err();
  assert!(matches!(core_err(err), CoreError::MissingSchemaKeyword));
}

#[tokio::test]
async fn propose_rejects_unrecognised_dialect() {
  let s = store().await;

  let mut input = proposal("dataset-meta", Bump::Minor);
  input.raw_schema = json!({"$schema": "not-a-real-dialect"})
    .as_object()
    .unwrap()
    .clone();

  let err = s.propose_schema(input).await.unwrap_err();
  assert!(matches!(
    core_err(err),
    CoreError::UnsupportedSchemaVersion(_)
  ));
}

#[tokio::test]
async fn propose_rejects_structurally_invalid_schema() {
  let s = store().await;

  let mut input = proposal("dataset-meta", Bump::Minor);
  input.raw_schema = json!({"$schema": DRAFT4_DIALECT, "type": 5})
    .as_object()
    .unwrap()
    .clone();

  let err = s.propose_schema(input).await.unwrap_err();
  let CoreError::InvalidSchema(msgs) = core_err(err) else {
    panic!("expected InvalidSchema");
  };
  assert!(msgs.iter().any(|m| m.contains("Draft 4")));
  // Nothing was stored.
  assert!(s.get_schema("dataset-meta", None).await.unwrap().is_none());
}

// ─── Reads and ordering ──────────────────────────────────────────────────────

#[tokio::test]
async fn get_without_version_returns_latest_published() {
  let s = store().await;

  s.propose_schema(proposal("dataset-meta", Bump::Minor))
    .await
    .unwrap();
  s.propose_schema(proposal("dataset-meta", Bump::Minor))
    .await
    .unwrap();

  let latest = s.get_schema("dataset-meta", None).await.unwrap().unwrap();
  assert_eq!(latest.version, Version::new(1, 1));
}

#[tokio::test]
async fn get_with_version_returns_exact_match() {
  let s = store().await;

  s.propose_schema(proposal("dataset-meta", Bump::Minor))
    .await
    .unwrap();
  s.propose_schema(proposal("dataset-meta", Bump::Major))
    .await
    .unwrap();

  let exact = s
    .get_schema("dataset-meta", Some(Version::new(1, 0)))
    .await
    .unwrap()
    .unwrap();
  assert_eq!(exact.version, Version::new(1, 0));
}

#[tokio::test]
async fn get_unknown_slug_returns_none() {
  let s = store().await;
  assert!(s.get_schema("nope", None).await.unwrap().is_none());
}

#[tokio::test]
async fn version_ordering_is_numeric_one_ten_above_one_nine() {
  let s = store().await;

  // 1.0 plus ten minor bumps lands on 1.10.
  for _ in 0..11 {
    s.propose_schema(proposal("dataset-meta", Bump::Minor))
      .await
      .unwrap();
  }

  let latest = s.get_schema("dataset-meta", None).await.unwrap().unwrap();
  assert_eq!(latest.version, Version::new(1, 10));

  let listed = s.list_published().await.unwrap();
  let versions: Vec<Version> = listed.into_iter().map(|r| r.version).collect();
  let pos_110 = versions
    .iter()
    .position(|v| *v == Version::new(1, 10))
    .unwrap();
  let pos_19 = versions
    .iter()
    .position(|v| *v == Version::new(1, 9))
    .unwrap();
  assert!(pos_110 < pos_19);
}

#[tokio::test]
async fn list_published_orders_title_asc_version_desc() {
  let s = store().await;

  s.propose_schema(proposal("zeta", Bump::Minor)).await.unwrap();
  s.propose_schema(proposal("alpha", Bump::Minor)).await.unwrap();
  s.propose_schema(proposal("alpha", Bump::Minor)).await.unwrap();

  let listed = s.list_published().await.unwrap();
  let keys: Vec<(String, Version)> = listed
    .into_iter()
    .map(|r| (r.title, r.version))
    .collect();

  assert_eq!(keys, [
    ("alpha".to_owned(), Version::new(1, 1)),
    ("alpha".to_owned(), Version::new(1, 0)),
    ("zeta".to_owned(), Version::new(1, 0)),
  ]);
}

// ─── Publish state ───────────────────────────────────────────────────────────

#[tokio::test]
async fn unpublished_revision_hidden_from_latest_but_exactly_addressable() {
  let s = store().await;

  s.propose_schema(proposal("dataset-meta", Bump::Minor))
    .await
    .unwrap();
  s.propose_schema(proposal("dataset-meta", Bump::Minor))
    .await
    .unwrap();

  s.set_published("dataset-meta", Version::new(1, 1), false)
    .await
    .unwrap();

  let latest = s.get_schema("dataset-meta", None).await.unwrap().unwrap();
  assert_eq!(latest.version, Version::new(1, 0));

  let exact = s
    .get_schema("dataset-meta", Some(Version::new(1, 1)))
    .await
    .unwrap()
    .unwrap();
  assert!(!exact.published);

  let listed = s.list_published().await.unwrap();
  assert_eq!(listed.len(), 1);
}

#[tokio::test]
async fn set_published_on_unknown_revision_errors() {
  let s = store().await;
  let err = s
    .set_published("nope", Version::new(1, 0), false)
    .await
    .unwrap_err();
  assert!(matches!(core_err(err), CoreError::NotFound { .. }));
}

// ─── Update ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn update_rebuilds_served_form_and_keeps_version() {
  let s = store().await;

  let rev = s
    .propose_schema(proposal("dataset-meta", Bump::Minor))
    .await
    .unwrap();

  let updated = s
    .update_schema("dataset-meta", rev.version, SchemaUpdate {
      description: Some("second draft".to_owned()),
      ..Default::default()
    })
    .await
    .unwrap();

  assert_eq!(updated.version, rev.version);
  assert_eq!(updated.description, "second draft");
  assert_eq!(updated.served["self"]["description"], "second draft");
  assert!(updated.modified_at >= rev.modified_at);

  // The persisted copy reflects the update.
  let fetched = s
    .get_schema("dataset-meta", Some(rev.version))
    .await
    .unwrap()
    .unwrap();
  assert_eq!(fetched.served["self"]["description"], "second draft");
}

#[tokio::test]
async fn update_revalidates_replacement_schema() {
  let s = store().await;

  let rev = s
    .propose_schema(proposal("dataset-meta", Bump::Minor))
    .await
    .unwrap();

  let err = s
    .update_schema("dataset-meta", rev.version, SchemaUpdate {
      raw_schema: Some(json!({"$schema": DRAFT4_DIALECT, "type": 5})
        .as_object()
        .unwrap()
        .clone()),
      ..Default::default()
    })
    .await
    .unwrap_err();
  assert!(matches!(core_err(err), CoreError::InvalidSchema(_)));
}

#[tokio::test]
async fn update_unknown_revision_errors() {
  let s = store().await;
  let err = s
    .update_schema("nope", Version::new(1, 0), SchemaUpdate::default())
    .await
    .unwrap_err();
  assert!(matches!(core_err(err), CoreError::NotFound { .. }));
}

// ─── Data records ────────────────────────────────────────────────────────────

fn record(subject_id: i64, data_version: i64, payload: Value) -> NewDataRecord {
  NewDataRecord {
    schema_slug: "dataset-meta".to_owned(),
    schema_version: Version::new(1, 0),
    subject_id,
    data_version,
    payload,
  }
}

#[tokio::test]
async fn valid_payload_is_stored() {
  let s = store().await;
  s.propose_schema(proposal("dataset-meta", Bump::Minor))
    .await
    .unwrap();

  let written = s
    .write_data_record(record(7, 1, json!({"x": "hello"})))
    .await
    .unwrap();

  assert_eq!(written.subject_id, 7);
  assert_eq!(written.schema_version, Version::new(1, 0));
  assert_eq!(written.payload, json!({"x": "hello"}));

  let fetched = s
    .get_data_record("dataset-meta", Version::new(1, 0), 7, 1)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(fetched.payload, json!({"x": "hello"}));
}

#[tokio::test]
async fn invalid_payload_is_rejected_with_location() {
  let s = store().await;
  s.propose_schema(proposal("dataset-meta", Bump::Minor))
    .await
    .unwrap();

  let err = s
    .write_data_record(record(7, 1, json!({"x": 5})))
    .await
    .unwrap_err();

  let CoreError::InvalidData(msgs) = core_err(err) else {
    panic!("expected InvalidData");
  };
  assert!(msgs.iter().any(|m| m == "Error Location: x"));

  let fetched = s
    .get_data_record("dataset-meta", Version::new(1, 0), 7, 1)
    .await
    .unwrap();
  assert!(fetched.is_none());
}

#[tokio::test]
async fn write_against_unknown_revision_errors() {
  let s = store().await;
  let err = s
    .write_data_record(record(7, 1, json!({"x": "hello"})))
    .await
    .unwrap_err();
  assert!(matches!(core_err(err), CoreError::NotFound { .. }));
}

#[tokio::test]
async fn rewrite_updates_payload_and_preserves_created_at() {
  let s = store().await;
  s.propose_schema(proposal("dataset-meta", Bump::Minor))
    .await
    .unwrap();

  let first = s
    .write_data_record(record(7, 1, json!({"x": "one"})))
    .await
    .unwrap();
  let second = s
    .write_data_record(record(7, 1, json!({"x": "two"})))
    .await
    .unwrap();

  assert_eq!(second.payload, json!({"x": "two"}));
  assert_eq!(second.created_at, first.created_at);
  assert!(second.modified_at >= first.modified_at);

  // Still exactly one record for the key.
  let all = s
    .list_data_records("dataset-meta", Version::new(1, 0))
    .await
    .unwrap();
  assert_eq!(all.len(), 1);
}

#[tokio::test]
async fn records_are_scoped_per_revision_subject_and_version() {
  let s = store().await;
  s.propose_schema(proposal("dataset-meta", Bump::Minor))
    .await
    .unwrap();

  s.write_data_record(record(7, 1, json!({"x": "a"})))
    .await
    .unwrap();
  s.write_data_record(record(7, 2, json!({"x": "b"})))
    .await
    .unwrap();
  s.write_data_record(record(8, 1, json!({"x": "c"})))
    .await
    .unwrap();

  let all = s
    .list_data_records("dataset-meta", Version::new(1, 0))
    .await
    .unwrap();
  assert_eq!(all.len(), 3);
}

#[tokio::test]
async fn unpublishing_a_revision_keeps_existing_records_writable() {
  // Data records retain their validation outcome from write time; a later
  // publish-state change does not invalidate the revision reference.
  let s = store().await;
  s.propose_schema(proposal("dataset-meta", Bump::Minor))
    .await
    .unwrap();
  s.set_published("dataset-meta", Version::new(1, 0), false)
    .await
    .unwrap();

  let written = s
    .write_data_record(record(7, 1, json!({"x": "hello"})))
    .await
    .unwrap();
  assert_eq!(written.subject_id, 7);
}

#[tokio::test]
async fn check_payload_validates_without_persisting() {
  let s = store().await;
  s.propose_schema(proposal("dataset-meta", Bump::Minor))
    .await
    .unwrap();

  s.check_payload("dataset-meta", Version::new(1, 0), &json!({"x": "ok"}))
    .await
    .unwrap();

  let err = s
    .check_payload("dataset-meta", Version::new(1, 0), &json!({"x": 5}))
    .await
    .unwrap_err();
  assert!(matches!(core_err(err), CoreError::InvalidData(_)));

  let all = s
    .list_data_records("dataset-meta", Version::new(1, 0))
    .await
    .unwrap();
  assert!(all.is_empty());
}
