//! schemata-server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), opens an
//! in-process SQLite store, and serves the schema registry over HTTP.

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use clap::Parser;
use schemata_api::ApiContext;
use schemata_core::validate::{DRAFT4_DIALECT, SchemaValidator};
use schemata_store_sqlite::SqliteStore;
use serde::Deserialize;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Schemata registry server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
struct ServerConfig {
  #[serde(default = "default_host")]
  host: String,
  #[serde(default = "default_port")]
  port: u16,
  #[serde(default = "default_store_path")]
  store_path: PathBuf,
  /// Stamped into every proposed revision as
  /// `self.dataverse_installation_id`.
  #[serde(default = "default_installation_id")]
  installation_id: String,
  /// `$schema` URIs this deployment accepts; may be a superset of Draft 4.
  #[serde(default = "default_dialects")]
  accepted_schema_dialects: Vec<String>,
}

fn default_host() -> String { "127.0.0.1".to_owned() }
fn default_port() -> u16 { 8080 }
fn default_store_path() -> PathBuf { PathBuf::from("schemata.db") }
fn default_installation_id() -> String { "harvard-dataverse".to_owned() }
fn default_dialects() -> Vec<String> { vec![DRAFT4_DIALECT.to_owned()] }

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  // Load configuration.
  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("SCHEMATA"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  // Open SQLite store with the configured dialect set.
  let validator =
    SchemaValidator::new(server_cfg.accepted_schema_dialects.clone());
  let store = SqliteStore::open(&server_cfg.store_path, validator)
    .await
    .with_context(|| {
      format!("failed to open store at {:?}", server_cfg.store_path)
    })?;

  let ctx = ApiContext::new(Arc::new(store), &server_cfg.installation_id);
  let app = schemata_api::api_router(ctx).layer(TraceLayer::new_for_http());

  let address = format!("{}:{}", server_cfg.host, server_cfg.port);
  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}
