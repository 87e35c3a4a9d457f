//! HTTP surface for the carbon ledger.
//!
//! Exposes an axum [`Router`] over a [`Ledger`] backed by any
//! [`RecordFileStore`], plus the optional insights endpoints backed by any
//! [`InsightsService`]. TLS and auth are the caller's responsibility.

pub mod client;
pub mod error;
pub mod insights;
pub mod records;
pub mod summary;
pub mod transfer;

use std::{
  path::PathBuf,
  sync::{Arc, Mutex, PoisonError},
};

use axum::{
  Router,
  extract::DefaultBodyLimit,
  routing::{get, post, put},
};
use carbon_core::{insights::InsightsService, ledger::Ledger, store::RecordFileStore};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

pub use client::HttpInsights;
pub use error::ApiError;

// ─── Configuration ────────────────────────────────────────────────────────────

fn default_host() -> String { "127.0.0.1".to_string() }
fn default_port() -> u16 { 8501 }
fn default_data_dir() -> PathBuf { PathBuf::from("data") }
fn default_max_import_bytes() -> usize { carbon_csv::DEFAULT_MAX_IMPORT_BYTES }
fn default_timeout_secs() -> u64 { 60 }

/// Runtime server configuration, deserialised from `config.toml` and
/// `CARBON_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:             String,
  #[serde(default = "default_port")]
  pub port:             u16,
  /// Directory holding `emissions.json`.
  #[serde(default = "default_data_dir")]
  pub data_dir:         PathBuf,
  #[serde(default = "default_max_import_bytes")]
  pub max_import_bytes: usize,
  /// Unset disables the `/insights` endpoints.
  #[serde(default)]
  pub insights:         Option<InsightsConfig>,
  #[serde(default)]
  pub profile:          CompanyProfile,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:             default_host(),
      port:             default_port(),
      data_dir:         default_data_dir(),
      max_import_bytes: default_max_import_bytes(),
      insights:         None,
      profile:          CompanyProfile::default(),
    }
  }
}

/// Connection settings for the external insights service.
#[derive(Debug, Deserialize, Clone)]
pub struct InsightsConfig {
  pub endpoint:     String,
  #[serde(default)]
  pub api_key:      Option<String>,
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
}

/// Organisation details; location and industry feed the insights prompts
/// when a request does not supply its own.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct CompanyProfile {
  pub company_name:   Option<String>,
  pub industry:       Option<String>,
  pub location:       Option<String>,
  pub contact_person: Option<String>,
  pub email:          Option<String>,
  pub phone:          Option<String>,
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
///
/// The ledger sits behind one mutex: every edit is a full-collection
/// rewrite, so edits are serialised.
pub struct AppState<S, I> {
  pub ledger:   Arc<Mutex<Ledger<S>>>,
  pub insights: Option<Arc<I>>,
  pub config:   Arc<ServerConfig>,
}

impl<S, I> Clone for AppState<S, I> {
  fn clone(&self) -> Self {
    Self {
      ledger:   Arc::clone(&self.ledger),
      insights: self.insights.clone(),
      config:   Arc::clone(&self.config),
    }
  }
}

impl<S, I> AppState<S, I>
where
  S: RecordFileStore + 'static,
{
  pub fn new(ledger: Ledger<S>, insights: Option<I>, config: ServerConfig) -> Self {
    Self {
      ledger:   Arc::new(Mutex::new(ledger)),
      insights: insights.map(Arc::new),
      config:   Arc::new(config),
    }
  }

  /// Run `f` against the ledger on the blocking pool.
  ///
  /// Saves do synchronous file I/O, so the lock is never taken on an async
  /// worker thread. A poisoned lock is still usable: the ledger only adopts
  /// a new collection after a successful save.
  pub async fn with_ledger<T, F>(&self, f: F) -> Result<T, ApiError>
  where
    F: FnOnce(&mut Ledger<S>) -> T + Send + 'static,
    T: Send + 'static,
  {
    let ledger = Arc::clone(&self.ledger);
    tokio::task::spawn_blocking(move || {
      let mut guard = ledger.lock().unwrap_or_else(PoisonError::into_inner);
      f(&mut guard)
    })
    .await
    .map_err(|e| ApiError::Internal(e.to_string()))
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the API router for `state`.
pub fn router<S, I>(state: AppState<S, I>) -> Router
where
  S: RecordFileStore + 'static,
  I: InsightsService + 'static,
{
  let body_limit = state.config.max_import_bytes;
  Router::new()
    // Records
    .route("/records", get(records::list::<S, I>).post(records::create::<S, I>))
    .route(
      "/records/{index}",
      put(records::replace::<S, I>)
        .get(records::get_one::<S, I>)
        .delete(records::delete_one::<S, I>),
    )
    // CSV transfer
    .route(
      "/import",
      post(transfer::import::<S, I>).layer(DefaultBodyLimit::max(body_limit)),
    )
    .route("/export", get(transfer::export::<S, I>))
    .route("/template", get(transfer::template))
    // Dashboard
    .route("/summary", get(summary::handler::<S, I>))
    // Insights
    .route("/insights/classify", post(insights::classify::<S, I>))
    .route("/insights/summary", post(insights::summarize::<S, I>))
    .route("/insights/offsets", post(insights::offsets::<S, I>))
    .route("/insights/regulations", post(insights::regulations::<S, I>))
    .route("/insights/optimizations", post(insights::optimizations::<S, I>))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}
