//! The AI-insights collaborator seam.
//!
//! Insights come from an external agent service. The ledger hands it plain
//! text and scalars and gets free text back; no structure is imposed on the
//! response. Any failure collapses into one [`ExternalServiceError`].

use std::future::Future;

use thiserror::Error;

use crate::record::EmissionRecord;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("insights service error: {message}")]
pub struct ExternalServiceError {
  pub message: String,
}

impl ExternalServiceError {
  pub fn new(message: impl Into<String>) -> Self {
    Self { message: message.into() }
  }
}

/// Abstraction over the external insights service.
pub trait InsightsService: Send + Sync {
  /// Suggest a scope and category for a free-text activity description.
  fn classify_activity<'a>(
    &'a self,
    description: &'a str,
  ) -> impl Future<Output = Result<String, ExternalServiceError>> + Send + 'a;

  /// Summarise a collection rendered with [`records_as_text`].
  fn summarize_records<'a>(
    &'a self,
    records_text: &'a str,
  ) -> impl Future<Output = Result<String, ExternalServiceError>> + Send + 'a;

  /// Recommend offset options for a total footprint.
  fn recommend_offsets<'a>(
    &'a self,
    total_kgco2e: f64,
    location: &'a str,
    industry: &'a str,
  ) -> impl Future<Output = Result<String, ExternalServiceError>> + Send + 'a;

  /// List regulations applicable to a location, industry, and export markets.
  fn check_regulations<'a>(
    &'a self,
    location: &'a str,
    industry: &'a str,
    export_markets: &'a [String],
  ) -> impl Future<Output = Result<String, ExternalServiceError>> + Send + 'a;

  /// Recommend reductions for a collection rendered with [`records_as_text`].
  fn recommend_optimizations<'a>(
    &'a self,
    records_text: &'a str,
  ) -> impl Future<Output = Result<String, ExternalServiceError>> + Send + 'a;
}

/// Render records as a plain-text table, one line per record.
///
/// Columns are separated by ` | `; the index column matches the record's
/// position in the collection.
pub fn records_as_text(records: &[EmissionRecord]) -> String {
  let mut out = String::from(
    "index | date | scope | category | activity | quantity | unit | \
     emission_factor | emissions_kgCO2e\n",
  );
  for (i, r) in records.iter().enumerate() {
    let date = r
      .date
      .map(|d| d.to_string())
      .unwrap_or_else(|| "unknown".to_owned());
    out.push_str(&format!(
      "{i} | {date} | {} | {} | {} | {} | {} | {} | {:.4}\n",
      r.scope,
      r.category,
      r.activity,
      r.quantity,
      r.unit,
      r.emission_factor,
      r.emissions_kgco2e,
    ));
  }
  out
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn records_render_one_line_each() {
    let record: EmissionRecord = serde_json::from_value(serde_json::json!({
      "date": "2025-01-15",
      "scope": "Scope 2",
      "category": "Electricity",
      "activity": "Office Electricity",
      "quantity": 1000.0,
      "unit": "kWh",
      "emission_factor": 0.82,
      "emissions_kgCO2e": 820.0,
    }))
    .unwrap();
    let text = records_as_text(&[record]);
    let lines: Vec<_> = text.lines().collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(
      lines[1],
      "0 | 2025-01-15 | Scope 2 | Electricity | Office Electricity | 1000 | kWh | 0.82 | 820.0000"
    );
  }
}
