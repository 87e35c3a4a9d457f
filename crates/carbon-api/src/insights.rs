//! Handlers for `/insights` endpoints.
//!
//! Each call forwards to the configured [`InsightsService`] and returns its
//! free text as `{"insight": "..."}`. Without a configured service every
//! endpoint answers 503.
//!
//! | Method | Path | Body |
//! |--------|------|------|
//! | `POST` | `/insights/classify` | `{"description": "..."}` |
//! | `POST` | `/insights/summary` | none |
//! | `POST` | `/insights/offsets` | `{"location"?, "industry"?}` |
//! | `POST` | `/insights/regulations` | `{"location"?, "industry"?, "export_markets": [...]}` |
//! | `POST` | `/insights/optimizations` | none |

use std::sync::Arc;

use axum::{Json, extract::State};
use bytes::Bytes;
use carbon_core::{
  aggregate,
  insights::{InsightsService, records_as_text},
  store::RecordFileStore,
};
use serde::{Deserialize, Serialize};

use crate::{AppState, error::ApiError};

#[derive(Debug, Serialize)]
pub struct InsightResponse {
  pub insight: String,
}

impl From<String> for InsightResponse {
  fn from(insight: String) -> Self { Self { insight } }
}

fn service<S, I>(state: &AppState<S, I>) -> Result<Arc<I>, ApiError> {
  state.insights.clone().ok_or(ApiError::InsightsUnavailable)
}

/// The collection as prompt text; an empty collection has nothing to send.
async fn records_text<S, I>(state: &AppState<S, I>) -> Result<String, ApiError>
where
  S: RecordFileStore + 'static,
{
  let text = state
    .with_ledger(|l| (!l.is_empty()).then(|| records_as_text(l.records())))
    .await?;
  text.ok_or_else(|| ApiError::BadRequest("no emissions data recorded yet".into()))
}

/// Request value, else the profile value, else an empty string.
fn or_profile(given: Option<String>, profile: &Option<String>) -> String {
  given
    .filter(|s| !s.trim().is_empty())
    .or_else(|| profile.clone())
    .unwrap_or_default()
}

// ─── Classify ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ClassifyBody {
  pub description: String,
}

/// `POST /insights/classify`
pub async fn classify<S, I>(
  State(state): State<AppState<S, I>>,
  Json(body): Json<ClassifyBody>,
) -> Result<Json<InsightResponse>, ApiError>
where
  S: RecordFileStore + 'static,
  I: InsightsService + 'static,
{
  let insights = service(&state)?;
  let description = body.description.trim();
  if description.is_empty() {
    return Err(ApiError::BadRequest("description is required".into()));
  }
  let text = insights.classify_activity(description).await?;
  Ok(Json(text.into()))
}

// ─── Summary ──────────────────────────────────────────────────────────────────

/// `POST /insights/summary`
pub async fn summarize<S, I>(
  State(state): State<AppState<S, I>>,
) -> Result<Json<InsightResponse>, ApiError>
where
  S: RecordFileStore + 'static,
  I: InsightsService + 'static,
{
  let insights = service(&state)?;
  let text = records_text(&state).await?;
  Ok(Json(insights.summarize_records(&text).await?.into()))
}

// ─── Offsets ──────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct OffsetsBody {
  #[serde(default)]
  pub location: Option<String>,
  #[serde(default)]
  pub industry: Option<String>,
}

/// `POST /insights/offsets`
pub async fn offsets<S, I>(
  State(state): State<AppState<S, I>>,
  body: Bytes,
) -> Result<Json<InsightResponse>, ApiError>
where
  S: RecordFileStore + 'static,
  I: InsightsService + 'static,
{
  let insights = service(&state)?;
  // The body is optional; an empty one means "use the profile".
  let body: OffsetsBody = if body.iter().all(u8::is_ascii_whitespace) {
    OffsetsBody::default()
  } else {
    serde_json::from_slice(&body).map_err(|e| ApiError::BadRequest(e.to_string()))?
  };
  let total = state.with_ledger(|l| aggregate::total(l.records())).await?;
  let profile = &state.config.profile;
  let location = or_profile(body.location, &profile.location);
  let industry = or_profile(body.industry, &profile.industry);

  let text = insights
    .recommend_offsets(total, &location, &industry)
    .await?;
  Ok(Json(text.into()))
}

// ─── Regulations ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RegulationsBody {
  #[serde(default)]
  pub location:       Option<String>,
  #[serde(default)]
  pub industry:       Option<String>,
  #[serde(default)]
  pub export_markets: Vec<String>,
}

/// `POST /insights/regulations`
pub async fn regulations<S, I>(
  State(state): State<AppState<S, I>>,
  Json(body): Json<RegulationsBody>,
) -> Result<Json<InsightResponse>, ApiError>
where
  S: RecordFileStore + 'static,
  I: InsightsService + 'static,
{
  let insights = service(&state)?;
  let profile = &state.config.profile;
  let location = or_profile(body.location, &profile.location);
  let industry = or_profile(body.industry, &profile.industry);
  if location.is_empty() {
    return Err(ApiError::BadRequest(
      "location is required (in the request or the company profile)".into(),
    ));
  }

  let text = insights
    .check_regulations(&location, &industry, &body.export_markets)
    .await?;
  Ok(Json(text.into()))
}

// ─── Optimizations ────────────────────────────────────────────────────────────

/// `POST /insights/optimizations`
pub async fn optimizations<S, I>(
  State(state): State<AppState<S, I>>,
) -> Result<Json<InsightResponse>, ApiError>
where
  S: RecordFileStore + 'static,
  I: InsightsService + 'static,
{
  let insights = service(&state)?;
  let text = records_text(&state).await?;
  Ok(Json(insights.recommend_optimizations(&text).await?.into()))
}
