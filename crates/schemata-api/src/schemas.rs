//! Handlers for `/schemas` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/schemas` | Served forms of all published revisions; `?pretty` |
//! | `POST` | `/schemas` | Body: [`ProposeBody`]; returns 201 + served form |
//! | `GET`  | `/schemas/:slug` | Latest published revision; 404 if none |
//! | `GET`  | `/schemas/:slug/:version` | Exact revision, published or not |
//! | `POST` | `/schemas/:slug/:version/publish` | Body: `{"published":false}` |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::{StatusCode, header},
  response::{IntoResponse, Response},
};
use schemata_core::{
  revision::{NewSchema, SchemaRevision},
  store::SchemaStore,
  version::{Bump, Version},
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{ApiContext, error::ApiError};

// ─── Shared ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RenderParams {
  /// Presence of `?pretty` selects indented output.
  pub pretty: Option<String>,
}

impl RenderParams {
  fn pretty(&self) -> bool { self.pretty.is_some() }
}

/// Serialize a JSON body honouring the `?pretty` flag.
pub(crate) fn json_response<T: Serialize>(
  value: &T,
  pretty: bool,
) -> Result<Response, ApiError> {
  let body = if pretty {
    serde_json::to_string_pretty(value)
  } else {
    serde_json::to_string(value)
  }
  .map_err(|e| ApiError::Store(Box::new(e)))?;

  Ok(
    (
      [(header::CONTENT_TYPE, "application/json")],
      body,
    )
      .into_response(),
  )
}

// ─── List ─────────────────────────────────────────────────────────────────────

/// `GET /schemas[?pretty]`
pub async fn list<S>(
  State(ctx): State<ApiContext<S>>,
  Query(params): Query<RenderParams>,
) -> Result<Response, ApiError>
where
  S: SchemaStore,
  S::Error: Into<schemata_core::Error>,
{
  let revisions = ctx
    .store
    .list_published()
    .await
    .map_err(ApiError::from_store)?;

  let served: Vec<&Map<String, Value>> =
    revisions.iter().map(|r| &r.served).collect();
  json_response(&served, params.pretty())
}

// ─── Propose ──────────────────────────────────────────────────────────────────

/// JSON body accepted by `POST /schemas`.
#[derive(Debug, Deserialize)]
pub struct ProposeBody {
  pub title:  String,
  pub schema: Map<String, Value>,
  pub bump:   Bump,
  #[serde(default)]
  pub description: String,
  #[serde(default = "default_contributor")]
  pub contributor: String,
}

fn default_contributor() -> String { "Dataverse core".to_owned() }

/// `POST /schemas` — propose a new revision; the version is computed
/// server-side from the bump kind.
pub async fn propose<S>(
  State(ctx): State<ApiContext<S>>,
  Json(body): Json<ProposeBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: SchemaStore,
  S::Error: Into<schemata_core::Error>,
{
  let revision = ctx
    .store
    .propose_schema(NewSchema {
      title:           body.title,
      raw_schema:      body.schema,
      bump:            body.bump,
      description:     body.description,
      contributor:     body.contributor,
      installation_id: ctx.installation_id.to_string(),
    })
    .await
    .map_err(ApiError::from_store)?;

  Ok((StatusCode::CREATED, Json(Value::Object(revision.served))))
}

// ─── Reads ────────────────────────────────────────────────────────────────────

/// `GET /schemas/:slug[?pretty]` — latest published revision.
pub async fn latest<S>(
  State(ctx): State<ApiContext<S>>,
  Path(slug): Path<String>,
  Query(params): Query<RenderParams>,
) -> Result<Response, ApiError>
where
  S: SchemaStore,
  S::Error: Into<schemata_core::Error>,
{
  let revision = ctx
    .store
    .get_schema(&slug, None)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| ApiError::NotFound(format!("schema {slug} not found")))?;

  json_response(&revision.served, params.pretty())
}

/// `GET /schemas/:slug/:version[?pretty]` — exact revision.
pub async fn get_one<S>(
  State(ctx): State<ApiContext<S>>,
  Path((slug, version)): Path<(String, Version)>,
  Query(params): Query<RenderParams>,
) -> Result<Response, ApiError>
where
  S: SchemaStore,
  S::Error: Into<schemata_core::Error>,
{
  let revision = ctx
    .store
    .get_schema(&slug, Some(version))
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| {
      ApiError::NotFound(format!("schema {slug} {version} not found"))
    })?;

  json_response(&revision.served, params.pretty())
}

// ─── Publish state ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct PublishBody {
  pub published: bool,
}

/// `POST /schemas/:slug/:version/publish` — body: `{"published":false}`
pub async fn set_published<S>(
  State(ctx): State<ApiContext<S>>,
  Path((slug, version)): Path<(String, Version)>,
  Json(body): Json<PublishBody>,
) -> Result<Json<SchemaRevision>, ApiError>
where
  S: SchemaStore,
  S::Error: Into<schemata_core::Error>,
{
  let revision = ctx
    .store
    .set_published(&slug, version, body.published)
    .await
    .map_err(ApiError::from_store)?;

  Ok(Json(revision))
}
