//! Handlers for `/records` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/records` | Whole collection, in position order |
//! | `POST`   | `/records` | Body: manual entry; 201 + `{index, record}` |
//! | `GET`    | `/records/{index}` | 404 if out of range |
//! | `PUT`    | `/records/{index}` | Body: manual entry; replaces in place |
//! | `DELETE` | `/records/{index}` | Later records shift down by one |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use carbon_core::{
  calc::{ManualEntry, normalize_manual_entry},
  record::EmissionRecord,
  store::RecordFileStore,
};
use serde::Serialize;

use crate::{AppState, error::ApiError};

/// A record together with its current position.
#[derive(Debug, Serialize)]
pub struct Positioned {
  pub index:  usize,
  pub record: EmissionRecord,
}

// ─── List ─────────────────────────────────────────────────────────────────────

/// `GET /records`
pub async fn list<S, I>(
  State(state): State<AppState<S, I>>,
) -> Result<Json<Vec<EmissionRecord>>, ApiError>
where
  S: RecordFileStore + 'static,
{
  let records = state.with_ledger(|l| l.records().to_vec()).await?;
  Ok(Json(records))
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /records`
pub async fn create<S, I>(
  State(state): State<AppState<S, I>>,
  Json(entry): Json<ManualEntry>,
) -> Result<impl IntoResponse, ApiError>
where
  S: RecordFileStore + 'static,
{
  let record = normalize_manual_entry(entry)?;
  let stored = record.clone();
  let index = state.with_ledger(move |l| l.append(record)).await??;
  tracing::info!(index, scope = %stored.scope, "record added");
  Ok((StatusCode::CREATED, Json(Positioned { index, record: stored })))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /records/{index}`
pub async fn get_one<S, I>(
  State(state): State<AppState<S, I>>,
  Path(index): Path<usize>,
) -> Result<Json<Positioned>, ApiError>
where
  S: RecordFileStore + 'static,
{
  let (record, len) = state
    .with_ledger(move |l| (l.get(index).cloned(), l.len()))
    .await?;
  let record = record.ok_or_else(|| {
    ApiError::from(carbon_core::Error::OutOfRange { index, len })
  })?;
  Ok(Json(Positioned { index, record }))
}

// ─── Replace ──────────────────────────────────────────────────────────────────

/// `PUT /records/{index}`
pub async fn replace<S, I>(
  State(state): State<AppState<S, I>>,
  Path(index): Path<usize>,
  Json(entry): Json<ManualEntry>,
) -> Result<Json<Positioned>, ApiError>
where
  S: RecordFileStore + 'static,
{
  let record = normalize_manual_entry(entry)?;
  let stored = record.clone();
  state.with_ledger(move |l| l.update_at(index, record)).await??;
  tracing::info!(index, "record replaced");
  Ok(Json(Positioned { index, record: stored }))
}

// ─── Delete ───────────────────────────────────────────────────────────────────

/// `DELETE /records/{index}`; responds with the removed record.
pub async fn delete_one<S, I>(
  State(state): State<AppState<S, I>>,
  Path(index): Path<usize>,
) -> Result<Json<Positioned>, ApiError>
where
  S: RecordFileStore + 'static,
{
  let record = state.with_ledger(move |l| l.delete_at(index)).await??;
  tracing::info!(index, "record deleted");
  Ok(Json(Positioned { index, record }))
}
