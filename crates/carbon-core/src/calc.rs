//! Emission calculator: derivation, manual-entry validation, and import-row
//! coercion.
//!
//! Manual entry is strict and reports the first broken rule. Import is
//! best-effort: every row becomes a record, with unparseable numbers read as
//! zero and unparseable dates kept as the unparsed sentinel.

use std::collections::BTreeMap;

use chrono::{Local, NaiveDate};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::record::{
  DataQuality, EmissionRecord, Scope, VerificationStatus, parse_date,
};

/// Columns every CSV import must carry, in canonical order.
pub const REQUIRED_COLUMNS: &[&str] = &[
  "date",
  "scope",
  "category",
  "activity",
  "quantity",
  "unit",
  "emission_factor",
];

/// Name of the derived emissions column on the wire.
pub const EMISSIONS_COLUMN: &str = "emissions_kgCO2e";

// ─── Derivation ──────────────────────────────────────────────────────────────

fn non_negative(v: f64) -> f64 {
  if v.is_finite() { v.max(0.0) } else { 0.0 }
}

/// `max(quantity, 0) * max(emission_factor, 0)`, in kgCO2e.
///
/// Non-finite inputs count as zero, and so does a product that overflows,
/// so the result is always finite and non-negative.
pub fn compute_emissions(quantity: f64, emission_factor: f64) -> f64 {
  let product = non_negative(quantity) * non_negative(emission_factor);
  if product.is_finite() { product } else { 0.0 }
}

/// Whether a record's stored emissions differ from quantity × factor.
///
/// Only imported rows that carried their own `emissions_kgCO2e` column can
/// end up in this state.
pub fn emissions_disagree(record: &EmissionRecord) -> bool {
  let derived = compute_emissions(record.quantity, record.emission_factor);
  let scale = derived.abs().max(record.emissions_kgco2e.abs()).max(1.0);
  (record.emissions_kgco2e - derived).abs() > scale * 1e-9
}

// ─── Manual entry ────────────────────────────────────────────────────────────

/// A single rule violation on manual entry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct ValidationError {
  pub field:  &'static str,
  pub reason: String,
}

impl ValidationError {
  fn new(field: &'static str, reason: &str) -> Self {
    Self { field, reason: reason.to_owned() }
  }
}

/// Raw fields submitted through a manual-entry form.
#[derive(Debug, Clone, Deserialize)]
pub struct ManualEntry {
  /// Defaults to today when omitted.
  #[serde(default)]
  pub date:                Option<NaiveDate>,
  pub scope:               Scope,
  #[serde(default)]
  pub category:            String,
  #[serde(default)]
  pub activity:            String,
  #[serde(default)]
  pub quantity:            f64,
  #[serde(default)]
  pub unit:                String,
  #[serde(default)]
  pub emission_factor:     f64,
  #[serde(default)]
  pub country:             Option<String>,
  #[serde(default)]
  pub facility:            Option<String>,
  #[serde(default)]
  pub responsible_person:  Option<String>,
  #[serde(default)]
  pub data_quality:        Option<DataQuality>,
  #[serde(default)]
  pub verification_status: Option<VerificationStatus>,
  #[serde(default)]
  pub notes:               Option<String>,
}

fn non_blank(s: String) -> Option<String> {
  let trimmed = s.trim();
  if trimmed.is_empty() { None } else { Some(trimmed.to_owned()) }
}

/// Validate a manual entry and build the stored record.
///
/// Rules are checked in order: quantity, unit, scope, emission factor, and
/// finally that their product is representable. The first violation is
/// returned and nothing else is inspected.
pub fn normalize_manual_entry(
  entry: ManualEntry,
) -> Result<EmissionRecord, ValidationError> {
  if !(entry.quantity.is_finite() && entry.quantity > 0.0) {
    return Err(ValidationError::new(
      "quantity",
      "Quantity must be greater than zero.",
    ));
  }
  if entry.unit.trim().is_empty() {
    return Err(ValidationError::new("unit", "Unit is required."));
  }
  if !entry.scope.is_known() {
    return Err(ValidationError::new("scope", "Invalid scope."));
  }
  if !(entry.emission_factor.is_finite() && entry.emission_factor >= 0.0) {
    return Err(ValidationError::new(
      "emission_factor",
      "Emission factor must be a non-negative number.",
    ));
  }
  if !(entry.quantity * entry.emission_factor).is_finite() {
    return Err(ValidationError::new(
      "emissions_kgCO2e",
      "Quantity × emission factor is too large to record.",
    ));
  }

  Ok(EmissionRecord {
    date:                Some(
      entry.date.unwrap_or_else(|| Local::now().date_naive()),
    ),
    scope:               entry.scope,
    category:            entry.category.trim().to_owned(),
    activity:            entry.activity.trim().to_owned(),
    quantity:            entry.quantity,
    unit:                entry.unit.trim().to_owned(),
    emission_factor:     entry.emission_factor,
    emissions_kgco2e:    compute_emissions(entry.quantity, entry.emission_factor),
    country:             entry.country.and_then(non_blank),
    facility:            entry.facility.and_then(non_blank),
    responsible_person:  entry.responsible_person.and_then(non_blank),
    data_quality:        Some(entry.data_quality.unwrap_or(DataQuality::Medium)),
    verification_status: Some(
      entry
        .verification_status
        .unwrap_or(VerificationStatus::Unverified),
    ),
    notes:               entry.notes.and_then(non_blank),
    extra:               BTreeMap::new(),
  })
}

// ─── Import ──────────────────────────────────────────────────────────────────

/// Every required column absent from an import header.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("CSV is missing required columns: {}", missing.join(", "))]
pub struct MissingColumnsError {
  pub missing: Vec<String>,
}

/// Check that all of [`REQUIRED_COLUMNS`] appear in `columns`.
///
/// Extra columns are allowed. Every missing name is reported, in canonical
/// order.
pub fn validate_import_schema<S: AsRef<str>>(
  columns: &[S],
) -> Result<(), MissingColumnsError> {
  let missing: Vec<String> = REQUIRED_COLUMNS
    .iter()
    .filter(|req| !columns.iter().any(|c| c.as_ref() == **req))
    .map(|req| (*req).to_owned())
    .collect();
  if missing.is_empty() {
    Ok(())
  } else {
    Err(MissingColumnsError { missing })
  }
}

/// One data row of an import, keyed by header name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportRow(pub BTreeMap<String, String>);

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ImportRow {
  fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
    Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
  }
}

/// Read a numeric cell; `None` for anything that is not a finite number.
pub fn parse_number(raw: &str) -> Option<f64> {
  raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Coerce one import row into a record. Never fails.
///
/// A row that carries its own `emissions_kgCO2e` cell keeps that value;
/// otherwise emissions are derived from quantity and factor. Columns outside
/// the record shape land in [`EmissionRecord::extra`].
pub fn normalize_import_row(row: ImportRow) -> EmissionRecord {
  let mut cells = row.0;
  let mut text = |key: &str| cells.remove(key).unwrap_or_default();

  let date = parse_date(&text("date"));
  let scope = Scope::from(text("scope").trim());
  let category = text("category").trim().to_owned();
  let activity = text("activity").trim().to_owned();
  let unit = text("unit").trim().to_owned();
  let quantity = parse_number(&text("quantity")).unwrap_or(0.0);
  let emission_factor = parse_number(&text("emission_factor")).unwrap_or(0.0);

  let emissions_kgco2e = match cells.remove(EMISSIONS_COLUMN) {
    Some(raw) => parse_number(&raw).unwrap_or(0.0),
    None => compute_emissions(quantity, emission_factor),
  };

  let mut optional = |key: &str| cells.remove(key).and_then(non_blank);
  let country = optional("country");
  let facility = optional("facility");
  let responsible_person = optional("responsible_person");
  let data_quality = optional("data_quality").map(DataQuality::from);
  let verification_status =
    optional("verification_status").map(VerificationStatus::from);
  let notes = optional("notes");

  EmissionRecord {
    date,
    scope,
    category,
    activity,
    quantity,
    unit,
    emission_factor,
    emissions_kgco2e,
    country,
    facility,
    responsible_person,
    data_quality,
    verification_status,
    notes,
    extra: cells
      .into_iter()
      .map(|(k, v)| (k, Value::String(v)))
      .collect(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn entry(quantity: f64, unit: &str, scope: &str) -> ManualEntry {
    ManualEntry {
      date:                NaiveDate::from_ymd_opt(2025, 1, 15),
      scope:               Scope::from(scope),
      category:            "Electricity".into(),
      activity:            "Office Electricity".into(),
      quantity,
      unit:                unit.into(),
      emission_factor:     0.82,
      country:             Some("  ".into()),
      facility:            Some("HQ".into()),
      responsible_person:  None,
      data_quality:        None,
      verification_status: None,
      notes:               None,
    }
  }

  fn row(pairs: &[(&str, &str)]) -> ImportRow {
    pairs.iter().copied().collect()
  }

  // ── compute_emissions ───────────────────────────────────────────────────────

  #[test]
  fn compute_emissions_is_deterministic() {
    let a = compute_emissions(50.0, 2.31495);
    let b = compute_emissions(50.0, 2.31495);
    assert_eq!(a.to_bits(), b.to_bits());
    assert!((a - 115.7475).abs() < 1e-9);
  }

  #[test]
  fn compute_emissions_never_overflows() {
    assert_eq!(compute_emissions(1e300, 1e10), 0.0);
    assert_eq!(compute_emissions(f64::MAX, 2.0), 0.0);
    assert!(compute_emissions(1e150, 1e150) > 1e299);
  }

  #[test]
  fn compute_emissions_clamps_negative_and_non_finite() {
    assert_eq!(compute_emissions(-5.0, 3.0), 0.0);
    assert_eq!(compute_emissions(5.0, -3.0), 0.0);
    assert_eq!(compute_emissions(f64::NAN, 3.0), 0.0);
    assert_eq!(compute_emissions(f64::INFINITY, 0.0), 0.0);
  }

  // ── Manual entry ────────────────────────────────────────────────────────────

  #[test]
  fn manual_entry_derives_emissions() {
    let record = normalize_manual_entry(entry(1000.0, "kWh", "Scope 2")).unwrap();
    assert_eq!(record.scope, Scope::Scope2);
    assert!((record.emissions_kgco2e - 820.0).abs() < 1e-9);
    assert_eq!(record.country, None);
    assert_eq!(record.facility.as_deref(), Some("HQ"));
    assert_eq!(record.data_quality, Some(DataQuality::Medium));
    assert_eq!(record.verification_status, Some(VerificationStatus::Unverified));
  }

  #[test]
  fn manual_entry_reports_quantity_before_unit_and_scope() {
    let err = normalize_manual_entry(entry(0.0, "", "Scope 9")).unwrap_err();
    assert_eq!(err.field, "quantity");
  }

  #[test]
  fn manual_entry_reports_unit_before_scope() {
    let err = normalize_manual_entry(entry(1.0, "   ", "Scope 9")).unwrap_err();
    assert_eq!(err.field, "unit");
    assert_eq!(err.to_string(), "Unit is required.");
  }

  #[test]
  fn manual_entry_rejects_unknown_scope() {
    let err = normalize_manual_entry(entry(1.0, "kWh", "Scope 9")).unwrap_err();
    assert_eq!(err.field, "scope");
  }

  #[test]
  fn manual_entry_rejects_negative_factor() {
    let mut e = entry(1.0, "kWh", "Scope 1");
    e.emission_factor = -0.5;
    let err = normalize_manual_entry(e).unwrap_err();
    assert_eq!(err.field, "emission_factor");
  }

  #[test]
  fn manual_entry_rejects_overflowing_product() {
    let mut e = entry(1e300, "kg", "Scope 1");
    e.emission_factor = 1e10;
    let err = normalize_manual_entry(e).unwrap_err();
    assert_eq!(err.field, "emissions_kgCO2e");
  }

  // ── Schema ──────────────────────────────────────────────────────────────────

  #[test]
  fn schema_accepts_superset() {
    let mut cols: Vec<&str> = REQUIRED_COLUMNS.to_vec();
    cols.push("notes");
    assert!(validate_import_schema(&cols).is_ok());
  }

  #[test]
  fn schema_reports_every_missing_column() {
    let err = validate_import_schema(&["scope", "category", "activity", "unit"])
      .unwrap_err();
    assert_eq!(err.missing, vec!["date", "quantity", "emission_factor"]);
    assert!(err.to_string().contains("date, quantity, emission_factor"));
  }

  // ── Import rows ─────────────────────────────────────────────────────────────

  #[test]
  fn import_row_derives_emissions_when_column_absent() {
    let record = normalize_import_row(row(&[
      ("date", "2025-01-20"),
      ("scope", "Scope 1"),
      ("category", "Mobile Combustion"),
      ("activity", "Company Vehicle"),
      ("quantity", "50"),
      ("unit", "liter"),
      ("emission_factor", "2.31495"),
      ("notes", "Fleet vehicle fuel"),
    ]));
    assert!((record.emissions_kgco2e - 115.7475).abs() < 1e-9);
    assert_eq!(record.notes.as_deref(), Some("Fleet vehicle fuel"));
    assert!(record.extra.is_empty());
  }

  #[test]
  fn import_row_coerces_bad_numbers_and_dates() {
    let record = normalize_import_row(row(&[
      ("date", "not a date"),
      ("scope", "Scope 2"),
      ("quantity", "lots"),
      ("unit", "kWh"),
      ("emission_factor", "0.82"),
    ]));
    assert_eq!(record.date, None);
    assert_eq!(record.quantity, 0.0);
    assert_eq!(record.emissions_kgco2e, 0.0);
  }

  #[test]
  fn import_row_keeps_supplied_emissions() {
    let record = normalize_import_row(row(&[
      ("scope", "Scope 3"),
      ("quantity", "10"),
      ("emission_factor", "2"),
      (EMISSIONS_COLUMN, "99"),
    ]));
    assert_eq!(record.emissions_kgco2e, 99.0);
    assert!(emissions_disagree(&record));
  }

  #[test]
  fn import_row_with_overflowing_product_stores_zero() {
    let record = normalize_import_row(row(&[
      ("scope", "Scope 1"),
      ("quantity", "1e300"),
      ("emission_factor", "1e10"),
    ]));
    assert_eq!(record.quantity, 1e300);
    assert_eq!(record.emissions_kgco2e, 0.0);
  }

  #[test]
  fn parse_number_accepts_only_finite_values() {
    assert_eq!(parse_number(" 12.5 "), Some(12.5));
    assert_eq!(parse_number("1e999"), None);
    assert_eq!(parse_number("inf"), None);
    assert_eq!(parse_number("NaN"), None);
    assert_eq!(parse_number("twelve"), None);
  }

  #[test]
  fn import_row_passes_through_unknown_columns() {
    let record = normalize_import_row(row(&[
      ("scope", "Scope 7"),
      ("supplier", "Acme Utilities"),
      ("data_quality", "High"),
    ]));
    assert_eq!(record.scope, Scope::Other("Scope 7".into()));
    assert_eq!(record.data_quality, Some(DataQuality::High));
    assert_eq!(
      record.extra.get("supplier").and_then(Value::as_str),
      Some("Acme Utilities")
    );
  }
}
