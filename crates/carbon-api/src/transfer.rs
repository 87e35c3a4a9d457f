//! CSV import, export, and template download.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/import` | Raw CSV body; appended as one batch |
//! | `GET`  | `/export` | Whole collection as CSV |
//! | `GET`  | `/template` | Two-row sample file |

use axum::{
  Json,
  extract::State,
  http::{StatusCode, header},
  response::IntoResponse,
};
use bytes::Bytes;
use carbon_core::store::RecordFileStore;
use carbon_csv::ImportStats;
use serde::Serialize;

use crate::{AppState, error::ApiError};

const CSV_CONTENT_TYPE: &str = "text/csv; charset=utf-8";

fn csv_download(filename: &str, body: String) -> impl IntoResponse {
  (
    [
      (header::CONTENT_TYPE, CSV_CONTENT_TYPE.to_string()),
      (
        header::CONTENT_DISPOSITION,
        format!("attachment; filename=\"{filename}\""),
      ),
    ],
    body,
  )
}

// ─── Import ───────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct ImportResponse {
  pub imported:    usize,
  /// Position of the first imported record, or the collection length when
  /// nothing was imported.
  pub first_index: usize,
  pub stats:       ImportStats,
}

/// `POST /import`
pub async fn import<S, I>(
  State(state): State<AppState<S, I>>,
  body: Bytes,
) -> Result<impl IntoResponse, ApiError>
where
  S: RecordFileStore + 'static,
{
  let report = carbon_csv::import(&body, state.config.max_import_bytes)?;
  let stats = report.stats;
  let range = state.with_ledger(move |l| l.extend(report.records)).await??;
  tracing::info!(
    imported = range.len(),
    first_index = range.start,
    "CSV batch imported"
  );
  Ok((
    StatusCode::CREATED,
    Json(ImportResponse {
      imported: range.len(),
      first_index: range.start,
      stats,
    }),
  ))
}

// ─── Export ───────────────────────────────────────────────────────────────────

/// `GET /export`
pub async fn export<S, I>(
  State(state): State<AppState<S, I>>,
) -> Result<impl IntoResponse, ApiError>
where
  S: RecordFileStore + 'static,
{
  let csv = state.with_ledger(|l| carbon_csv::export(l.records())).await?;
  Ok(csv_download("emissions_export.csv", csv))
}

// ─── Template ─────────────────────────────────────────────────────────────────

/// `GET /template`
pub async fn template() -> impl IntoResponse {
  csv_download("sample_emissions.csv", carbon_csv::sample_template())
}
