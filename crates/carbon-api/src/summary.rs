//! `GET /summary`: dashboard totals for the whole collection.

use axum::{Json, extract::State};
use carbon_core::{
  aggregate::{DashboardSummary, summarize},
  store::RecordFileStore,
};

use crate::{AppState, error::ApiError};

pub async fn handler<S, I>(
  State(state): State<AppState<S, I>>,
) -> Result<Json<DashboardSummary>, ApiError>
where
  S: RecordFileStore + 'static,
{
  let summary = state.with_ledger(|l| summarize(l.records())).await?;
  Ok(Json(summary))
}
