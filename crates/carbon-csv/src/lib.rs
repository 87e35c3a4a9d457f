//! CSV codec for the carbon ledger.
//!
//! Converts between CSV documents and [`carbon_core`] records. Pure
//! synchronous; no HTTP or filesystem dependencies.
//!
//! # Quick start
//!
//! ```no_run
//! let csv = "date,scope,category,activity,quantity,unit,emission_factor\n\
//!            2025-01-15,Scope 2,Electricity,Office,1000,kWh,0.82\n";
//! let report = carbon_csv::import(csv.as_bytes(), carbon_csv::DEFAULT_MAX_IMPORT_BYTES).unwrap();
//! println!("{} rows, {} unparsed dates", report.stats.rows, report.stats.unparsed_dates);
//! ```

pub mod error;
mod import;
mod parse;
mod serialize;

use carbon_core::record::EmissionRecord;
pub use error::{Error, Result};
pub use import::{ImportReport, ImportStats};
pub use parse::Table;

/// Upload limit applied when the caller does not configure one (5 MB).
pub const DEFAULT_MAX_IMPORT_BYTES: usize = 5 * 1024 * 1024;

// ─── Public API
// ───────────────────────────────────────────────────────────────

/// Tokenize `input` into a header row and data rows, without interpreting
/// any column.
pub fn parse(input: &str) -> Result<Table> {
  Table::from_records(parse::split_records(parse::strip_bom(input))?)
}

/// Import an uploaded CSV document.
///
/// Rejects the whole file if it exceeds `max_bytes`, is not UTF-8, or lacks
/// a required column. Otherwise every data row becomes a record; see
/// [`carbon_core::calc::normalize_import_row`] for the per-row coercions.
pub fn import(input: &[u8], max_bytes: usize) -> Result<ImportReport> {
  import::import_bytes(input, max_bytes)
}

/// Serialize `records` as CSV with a header row.
///
/// Canonical columns come first in record-field order, followed by every
/// passthrough column found on any record, sorted by name.
pub fn export(records: &[EmissionRecord]) -> String { serialize::export(records) }

/// A two-row example file showing the expected columns.
pub fn sample_template() -> String { serialize::sample_template() }

// ─── Round-trip test ─────────────────────────────────────────────────────────

#[cfg(test)]
mod roundtrip_tests {
  use carbon_core::{
    aggregate,
    record::{DataQuality, Scope, VerificationStatus},
  };

  use super::*;

  #[test]
  fn template_imports_cleanly() {
    let template = sample_template();
    let table = parse(&template).unwrap();
    assert_eq!(table.headers.last().map(String::as_str), Some("notes"));

    let report = import(template.as_bytes(), DEFAULT_MAX_IMPORT_BYTES).unwrap();
    assert_eq!(report.stats.rows, 2);
    assert_eq!(report.stats.invalid_numbers, 0);
    assert!(!report.stats.emissions_column_supplied);
    assert!((aggregate::total(&report.records) - 935.7475).abs() < 1e-9);

    let scopes = aggregate::by_scope(&report.records);
    assert_eq!(scopes[0].scope, Scope::Scope2);
    assert_eq!(scopes[1].scope, Scope::Scope1);
  }

  #[test]
  fn export_then_import_preserves_records() {
    let csv = "date,scope,category,activity,quantity,unit,emission_factor,facility,data_quality,verification_status,supplier\n\
               2025-03-01,Scope 2,Electricity,\"Plant 2, North\",1500,kWh,0.4,HQ,High,Third-Party Verified,Acme\n\
               bad-date,Scope 3,Travel,Taxi,12.5,km,0.2,,,,\n";
    let first = import(csv.as_bytes(), DEFAULT_MAX_IMPORT_BYTES).unwrap();
    assert_eq!(first.records[0].data_quality, Some(DataQuality::High));
    assert_eq!(
      first.records[0].verification_status,
      Some(VerificationStatus::ThirdPartyVerified)
    );

    let exported = export(&first.records);
    let second = import(exported.as_bytes(), DEFAULT_MAX_IMPORT_BYTES).unwrap();
    assert!(second.stats.emissions_column_supplied);
    assert_eq!(second.stats.trusted_emissions_mismatches, 0);
    assert_eq!(second.records, first.records);
  }
}
