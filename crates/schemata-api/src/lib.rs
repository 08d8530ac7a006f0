//! JSON REST API for the Schemata registry.
//!
//! Exposes an axum [`Router`] backed by any [`schemata_core::store::SchemaStore`].
//! Auth, TLS, and transport concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .merge(schemata_api::api_router(ApiContext::new(store, "harvard-dataverse")))
//! ```

pub mod error;
pub mod records;
pub mod schemas;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use schemata_core::store::SchemaStore;

pub use error::ApiError;

/// Shared handler state: the store plus the deployment's installation id,
/// which is stamped into every proposed revision.
pub struct ApiContext<S> {
  pub store:           Arc<S>,
  pub installation_id: Arc<str>,
}

impl<S> ApiContext<S> {
  pub fn new(store: Arc<S>, installation_id: &str) -> Self {
    Self {
      store,
      installation_id: Arc::from(installation_id),
    }
  }
}

impl<S> Clone for ApiContext<S> {
  fn clone(&self) -> Self {
    Self {
      store:           Arc::clone(&self.store),
      installation_id: Arc::clone(&self.installation_id),
    }
  }
}

/// Build a fully-materialised API router for `ctx`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(ctx: ApiContext<S>) -> Router<()>
where
  S: SchemaStore + Send + Sync + 'static,
  S::Error: Into<schemata_core::Error>,
{
  Router::new()
    // Schemas
    .route(
      "/schemas",
      get(schemas::list::<S>).post(schemas::propose::<S>),
    )
    .route("/schemas/{slug}", get(schemas::latest::<S>))
    .route("/schemas/{slug}/{version}", get(schemas::get_one::<S>))
    .route(
      "/schemas/{slug}/{version}/publish",
      post(schemas::set_published::<S>),
    )
    .route(
      "/schemas/{slug}/{version}/validate",
      post(records::validate::<S>),
    )
    // Data records
    .route(
      "/schemas/{slug}/{version}/data",
      get(records::list::<S>).post(records::create::<S>),
    )
    .route(
      "/schemas/{slug}/{version}/data/{subject_id}/{data_version}",
      get(records::get_one::<S>),
    )
    .with_state(ctx)
}
