//! CSV writer for exports and the sample template.
//!
//! Produces LF line endings and quotes only the fields that need it.

use std::collections::BTreeSet;

use carbon_core::record::{EmissionRecord, cell_text};

/// Canonical export columns, in record-field order.
pub(crate) const EXPORT_COLUMNS: &[&str] = &[
  "date",
  "scope",
  "category",
  "activity",
  "quantity",
  "unit",
  "emission_factor",
  "emissions_kgCO2e",
  "country",
  "facility",
  "responsible_person",
  "data_quality",
  "verification_status",
  "notes",
];

// ─── Field escaping ──────────────────────────────────────────────────────────

/// Quote `s` if it contains a delimiter, quote, or line break.
fn escape_field(s: &str) -> String {
  if s.contains([',', '"', '\n', '\r']) {
    format!("\"{}\"", s.replace('"', "\"\""))
  } else {
    s.to_owned()
  }
}

fn push_row<I, S>(out: &mut String, fields: I)
where
  I: IntoIterator<Item = S>,
  S: AsRef<str>,
{
  let line: Vec<String> = fields
    .into_iter()
    .map(|f| escape_field(f.as_ref()))
    .collect();
  out.push_str(&line.join(","));
  out.push('\n');
}

// ─── Export ──────────────────────────────────────────────────────────────────

fn opt(s: &Option<impl ToString>) -> String {
  s.as_ref().map(ToString::to_string).unwrap_or_default()
}

fn canonical_fields(r: &EmissionRecord) -> [String; 14] {
  [
    r.date.map(|d| d.to_string()).unwrap_or_default(),
    r.scope.to_string(),
    r.category.clone(),
    r.activity.clone(),
    r.quantity.to_string(),
    r.unit.clone(),
    r.emission_factor.to_string(),
    r.emissions_kgco2e.to_string(),
    opt(&r.country),
    opt(&r.facility),
    opt(&r.responsible_person),
    opt(&r.data_quality),
    opt(&r.verification_status),
    opt(&r.notes),
  ]
}

pub(crate) fn export(records: &[EmissionRecord]) -> String {
  let extra: BTreeSet<&str> = records
    .iter()
    .flat_map(|r| r.extra.keys().map(String::as_str))
    .filter(|k| !EXPORT_COLUMNS.contains(k))
    .collect();

  let mut out = String::new();
  push_row(&mut out, EXPORT_COLUMNS.iter().copied().chain(extra.iter().copied()));
  for r in records {
    let passthrough = extra
      .iter()
      .map(|k| r.extra.get(*k).map(cell_text).unwrap_or_default());
    push_row(&mut out, canonical_fields(r).into_iter().chain(passthrough));
  }
  out
}

// ─── Template ────────────────────────────────────────────────────────────────

pub(crate) fn sample_template() -> String {
  let mut out = String::new();
  push_row(&mut out, [
    "date",
    "scope",
    "category",
    "activity",
    "quantity",
    "unit",
    "emission_factor",
    "notes",
  ]);
  push_row(&mut out, [
    "2025-01-15",
    "Scope 2",
    "Electricity",
    "Office Electricity",
    "1000",
    "kWh",
    "0.82",
    "Monthly electricity bill",
  ]);
  push_row(&mut out, [
    "2025-01-20",
    "Scope 1",
    "Mobile Combustion",
    "Company Vehicle",
    "50",
    "liter",
    "2.31495",
    "Fleet vehicle fuel",
  ]);
  out
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn escape_only_when_needed() {
    assert_eq!(escape_field("HQ"), "HQ");
    assert_eq!(escape_field("Plant 2, North"), "\"Plant 2, North\"");
    assert_eq!(escape_field("12\" pipe"), "\"12\"\" pipe\"");
    assert_eq!(escape_field("a\nb"), "\"a\nb\"");
  }

  #[test]
  fn export_header_lists_canonical_then_extra_columns() {
    let mut a: EmissionRecord = serde_json::from_value(serde_json::json!({
      "date": "2025-01-15",
      "scope": "Scope 2",
      "quantity": 1000.0,
      "emission_factor": 0.82,
      "emissions_kgCO2e": 820.0,
      "zone": "EU",
    }))
    .unwrap();
    a.facility = Some("Plant 2, North".into());
    let b: EmissionRecord = serde_json::from_value(serde_json::json!({
      "scope": "Scope 1",
      "invoice": "INV-7",
    }))
    .unwrap();

    let csv = export(&[a, b]);
    let lines: Vec<_> = csv.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("date,scope,category,activity,quantity"));
    assert!(lines[0].ends_with(",notes,invoice,zone"));
    assert_eq!(
      lines[1],
      "2025-01-15,Scope 2,,,1000,,0.82,820,,\"Plant 2, North\",,,,,,EU"
    );
    assert_eq!(lines[2], ",Scope 1,,,0,,0,0,,,,,,,INV-7,");
  }

  #[test]
  fn numeric_passthrough_values_export_as_text() {
    let record: EmissionRecord = serde_json::from_value(serde_json::json!({
      "scope": "Scope 3",
      "cost_usd": 120.5,
      "po": null,
    }))
    .unwrap();
    let csv = export(&[record]);
    let lines: Vec<_> = csv.lines().collect();
    assert!(lines[0].ends_with(",notes,cost_usd,po"));
    assert!(lines[1].ends_with(",120.5,"));
  }

  #[test]
  fn empty_export_is_header_only() {
    assert_eq!(export(&[]).lines().count(), 1);
  }
}
