//! Handlers for data-record endpoints under `/schemas/:slug/:version`.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/schemas/:slug/:version/validate` | Body: data document; 200 `{valid, messages}` |
//! | `POST` | `/schemas/:slug/:version/data` | Body: [`NewRecordBody`]; returns 201 + record |
//! | `GET`  | `/schemas/:slug/:version/data` | All records for the revision |
//! | `GET`  | `/schemas/:slug/:version/data/:subject_id/:data_version` | 404 if not found |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use schemata_core::{
  revision::{DataRecord, NewDataRecord},
  store::SchemaStore,
  version::Version,
};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{ApiContext, error::ApiError};

// ─── Validate (no persistence) ────────────────────────────────────────────────

/// `POST /schemas/:slug/:version/validate` — body: the data document.
///
/// A failed validation is a normal outcome, answered 200 with
/// `{"valid": false, "messages": [...]}`; only a missing revision or a
/// backend fault is an HTTP error.
pub async fn validate<S>(
  State(ctx): State<ApiContext<S>>,
  Path((slug, version)): Path<(String, Version)>,
  Json(payload): Json<Value>,
) -> Result<Json<Value>, ApiError>
where
  S: SchemaStore,
  S::Error: Into<schemata_core::Error>,
{
  match ctx.store.check_payload(&slug, version, &payload).await {
    Ok(()) => Ok(Json(json!({ "valid": true, "messages": [] }))),
    Err(err) => match ApiError::from_store(err) {
      ApiError::Invalid { messages, .. } => {
        Ok(Json(json!({ "valid": false, "messages": messages })))
      }
      other => Err(other),
    },
  }
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// JSON body accepted by `POST /schemas/:slug/:version/data`.
#[derive(Debug, Deserialize)]
pub struct NewRecordBody {
  pub subject_id:   i64,
  pub data_version: i64,
  pub payload:      Value,
}

/// `POST /schemas/:slug/:version/data` — validate and persist a payload.
pub async fn create<S>(
  State(ctx): State<ApiContext<S>>,
  Path((slug, version)): Path<(String, Version)>,
  Json(body): Json<NewRecordBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: SchemaStore,
  S::Error: Into<schemata_core::Error>,
{
  let record = ctx
    .store
    .write_data_record(NewDataRecord {
      schema_slug:    slug,
      schema_version: version,
      subject_id:     body.subject_id,
      data_version:   body.data_version,
      payload:        body.payload,
    })
    .await
    .map_err(ApiError::from_store)?;

  Ok((StatusCode::CREATED, Json(record)))
}

// ─── Reads ────────────────────────────────────────────────────────────────────

/// `GET /schemas/:slug/:version/data`
pub async fn list<S>(
  State(ctx): State<ApiContext<S>>,
  Path((slug, version)): Path<(String, Version)>,
) -> Result<Json<Vec<DataRecord>>, ApiError>
where
  S: SchemaStore,
  S::Error: Into<schemata_core::Error>,
{
  let records = ctx
    .store
    .list_data_records(&slug, version)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(records))
}

/// `GET /schemas/:slug/:version/data/:subject_id/:data_version`
pub async fn get_one<S>(
  State(ctx): State<ApiContext<S>>,
  Path((slug, version, subject_id, data_version)): Path<(String, Version, i64, i64)>,
) -> Result<Json<DataRecord>, ApiError>
where
  S: SchemaStore,
  S::Error: Into<schemata_core::Error>,
{
  let record = ctx
    .store
    .get_data_record(&slug, version, subject_id, data_version)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| {
      ApiError::NotFound(format!(
        "no data record for {slug} {version} subject {subject_id} v{data_version}"
      ))
    })?;
  Ok(Json(record))
}
