//! Grouped emission totals over an in-memory collection.
//!
//! Every function here is pure and total: an empty collection yields an empty
//! result, and a record with an unknown scope or unparsed date is grouped or
//! skipped rather than rejected.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::record::{EmissionRecord, Scope};

// ─── Result rows ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScopeTotal {
  pub scope:            Scope,
  #[serde(rename = "emissions_kgCO2e")]
  pub emissions_kgco2e: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryTotal {
  pub category:         String,
  #[serde(rename = "emissions_kgCO2e")]
  pub emissions_kgco2e: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthScopeTotal {
  /// `YYYY-MM`.
  pub month:            String,
  pub scope:            Scope,
  #[serde(rename = "emissions_kgCO2e")]
  pub emissions_kgco2e: f64,
}

/// Headline numbers plus every breakdown, as a dashboard would show them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSummary {
  pub total_kgco2e:       f64,
  pub record_count:       usize,
  /// Most recent parsed date, if any record has one.
  pub latest_date:        Option<NaiveDate>,
  pub by_scope:           Vec<ScopeTotal>,
  pub by_category:        Vec<CategoryTotal>,
  pub by_month_and_scope: Vec<MonthScopeTotal>,
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn emissions(record: &EmissionRecord) -> f64 {
  if record.emissions_kgco2e.is_finite() {
    record.emissions_kgco2e
  } else {
    0.0
  }
}

/// Sum emissions per key, then order by total descending and key ascending.
fn ranked<K, F>(records: &[EmissionRecord], key: F) -> Vec<(K, f64)>
where
  K: Ord,
  F: Fn(&EmissionRecord) -> K,
{
  let mut sums: BTreeMap<K, f64> = BTreeMap::new();
  for record in records {
    *sums.entry(key(record)).or_insert(0.0) += emissions(record);
  }
  let mut rows: Vec<(K, f64)> = sums.into_iter().collect();
  // BTreeMap already yields keys ascending; a stable sort keeps that for ties.
  rows.sort_by(|a, b| b.1.total_cmp(&a.1));
  rows
}

// ─── Aggregations ────────────────────────────────────────────────────────────

/// Sum of every record's emissions; non-finite values count as zero.
pub fn total(records: &[EmissionRecord]) -> f64 {
  records.iter().map(emissions).sum()
}

/// Totals per scope, largest first.
pub fn by_scope(records: &[EmissionRecord]) -> Vec<ScopeTotal> {
  ranked(records, |r| r.scope.as_str().to_owned())
    .into_iter()
    .map(|(label, emissions_kgco2e)| ScopeTotal {
      scope: Scope::from(label),
      emissions_kgco2e,
    })
    .collect()
}

/// Totals per category, largest first.
pub fn by_category(records: &[EmissionRecord]) -> Vec<CategoryTotal> {
  ranked(records, |r| r.category.clone())
    .into_iter()
    .map(|(category, emissions_kgco2e)| CategoryTotal {
      category,
      emissions_kgco2e,
    })
    .collect()
}

/// Totals per calendar month and scope, oldest month first.
///
/// Records without a parsed date are left out of this view only.
pub fn by_month_and_scope(records: &[EmissionRecord]) -> Vec<MonthScopeTotal> {
  let mut sums: BTreeMap<(String, String), f64> = BTreeMap::new();
  for record in records {
    let Some(month) = record.month() else { continue };
    let key = (month, record.scope.as_str().to_owned());
    *sums.entry(key).or_insert(0.0) += emissions(record);
  }
  sums
    .into_iter()
    .map(|((month, scope), emissions_kgco2e)| MonthScopeTotal {
      month,
      scope: Scope::from(scope),
      emissions_kgco2e,
    })
    .collect()
}

/// Build every dashboard figure in one pass over the collection.
pub fn summarize(records: &[EmissionRecord]) -> DashboardSummary {
  DashboardSummary {
    total_kgco2e:       total(records),
    record_count:       records.len(),
    latest_date:        records.iter().filter_map(|r| r.date).max(),
    by_scope:           by_scope(records),
    by_category:        by_category(records),
    by_month_and_scope: by_month_and_scope(records),
  }
}
