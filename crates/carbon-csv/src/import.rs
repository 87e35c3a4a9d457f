//! Bulk import: size check, schema check, then per-row normalization.
//!
//! The batch is rejected as a whole only for document-level problems (too
//! large, not UTF-8, no header, missing required columns). Individual rows
//! never fail; their defects are counted in [`ImportStats`].

use carbon_core::{
  calc::{
    EMISSIONS_COLUMN, ImportRow, emissions_disagree, normalize_import_row,
    parse_number, validate_import_schema,
  },
  record::EmissionRecord,
};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{
  error::{Error, Result},
  parse::{Table, split_records, strip_bom},
};

/// Counts of the coercions applied while importing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportStats {
  pub rows:                         usize,
  /// Rows whose date could not be parsed and was stored as unparsed.
  pub unparsed_dates:               usize,
  /// Rows with a non-numeric quantity or emission factor, read as zero.
  pub invalid_numbers:              usize,
  /// Whether the file carried its own `emissions_kgCO2e` column.
  pub emissions_column_supplied:    bool,
  /// Rows whose supplied emissions differ from quantity × factor.
  pub trusted_emissions_mismatches: usize,
}

/// Normalized records plus what happened to them on the way in.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportReport {
  pub records: Vec<EmissionRecord>,
  pub stats:   ImportStats,
}

fn is_number(row: &ImportRow, key: &str) -> bool {
  row
    .0
    .get(key)
    .and_then(|v| parse_number(v))
    .is_some()
}

pub(crate) fn import_bytes(input: &[u8], max_bytes: usize) -> Result<ImportReport> {
  if input.len() > max_bytes {
    return Err(Error::TooLarge {
      size:  input.len(),
      limit: max_bytes,
    });
  }
  import_str(std::str::from_utf8(input)?)
}

pub(crate) fn import_str(input: &str) -> Result<ImportReport> {
  let table = Table::from_records(split_records(strip_bom(input))?)?;
  validate_import_schema(&table.headers)?;

  let emissions_column_supplied = table.headers.iter().any(|h| h == EMISSIONS_COLUMN);
  let mut stats = ImportStats {
    emissions_column_supplied,
    ..Default::default()
  };
  let mut records = Vec::with_capacity(table.rows.len());

  for (i, row) in table.import_rows().enumerate() {
    if !(is_number(&row, "quantity") && is_number(&row, "emission_factor")) {
      stats.invalid_numbers += 1;
      debug!(row = i + 1, "non-numeric quantity or factor read as zero");
    }

    let record = normalize_import_row(row);
    if record.date.is_none() {
      stats.unparsed_dates += 1;
    }
    if emissions_column_supplied && emissions_disagree(&record) {
      stats.trusted_emissions_mismatches += 1;
      warn!(
        row = i + 1,
        supplied = record.emissions_kgco2e,
        quantity = record.quantity,
        emission_factor = record.emission_factor,
        "imported emissions disagree with quantity × factor; keeping supplied value"
      );
    }
    records.push(record);
  }

  stats.rows = records.len();
  info!(
    rows = stats.rows,
    unparsed_dates = stats.unparsed_dates,
    invalid_numbers = stats.invalid_numbers,
    "parsed CSV import"
  );
  Ok(ImportReport { records, stats })
}

#[cfg(test)]
mod tests {
  use carbon_core::{aggregate, record::Scope};

  use super::*;

  const HEADER: &str = "date,scope,category,activity,quantity,unit,emission_factor";

  #[test]
  fn one_bad_row_does_not_abort_the_batch() {
    let csv = format!(
      "{HEADER}\n\
       2025-01-15,Scope 2,Electricity,Office Electricity,1000,kWh,0.82\n\
       2025-01-20,Scope 1,Mobile Combustion,Company Vehicle,50,liter,2.31495\n\
       2025-02-01,Scope 3,Travel,Flights,1200,km,0.15\n\
       2025-02-02,Scope 1,Mobile Combustion,Forklift,twelve,liter,2.7\n"
    );
    let report = import_str(&csv).unwrap();
    assert_eq!(report.stats.rows, 4);
    assert_eq!(report.stats.invalid_numbers, 1);
    assert_eq!(report.records[3].quantity, 0.0);
    assert_eq!(report.records[3].emissions_kgco2e, 0.0);
    assert!((aggregate::total(&report.records) - (820.0 + 115.7475 + 180.0)).abs() < 1e-9);
  }

  #[test]
  fn missing_columns_reject_the_whole_file() {
    let err = import_str("date,scope,category\n2025-01-01,Scope 1,Fuel\n").unwrap_err();
    match err {
      Error::MissingColumns(e) => {
        assert_eq!(e.missing, vec!["activity", "quantity", "unit", "emission_factor"]);
      }
      other => panic!("unexpected error: {other}"),
    }
  }

  #[test]
  fn supplied_emissions_are_trusted_and_counted() {
    let csv = format!(
      "{HEADER},emissions_kgCO2e\n\
       2025-01-15,Scope 2,Electricity,Office,1000,kWh,0.82,820\n\
       2025-01-16,Scope 2,Electricity,Office,1000,kWh,0.82,5\n"
    );
    let report = import_str(&csv).unwrap();
    assert!(report.stats.emissions_column_supplied);
    assert_eq!(report.stats.trusted_emissions_mismatches, 1);
    assert_eq!(report.records[1].emissions_kgco2e, 5.0);
  }

  #[test]
  fn bad_dates_are_counted_not_fatal() {
    let csv = format!("{HEADER}\nsometime,Scope 1,Fuel,Boiler,10,liter,2\n");
    let report = import_str(&csv).unwrap();
    assert_eq!(report.stats.unparsed_dates, 1);
    assert_eq!(report.records[0].date, None);
    assert_eq!(report.records[0].scope, Scope::Scope1);
    assert_eq!(report.records[0].emissions_kgco2e, 20.0);
  }

  #[test]
  fn non_finite_cells_count_as_invalid_numbers() {
    let csv = format!(
      "{HEADER}\n\
       2025-01-15,Scope 1,Fuel,Boiler,1e999,liter,2\n\
       2025-01-16,Scope 1,Fuel,Boiler,inf,liter,2\n\
       2025-01-17,Scope 1,Fuel,Boiler,10,liter,NaN\n\
       2025-01-18,Scope 1,Fuel,Boiler,1e300,liter,1e10\n"
    );
    let report = import_str(&csv).unwrap();
    assert_eq!(report.stats.invalid_numbers, 3);
    for record in &report.records[..3] {
      assert_eq!(record.emissions_kgco2e, 0.0);
    }
    // Finite inputs whose product overflows are valid numbers stored as zero.
    assert_eq!(report.records[3].quantity, 1e300);
    assert_eq!(report.records[3].emissions_kgco2e, 0.0);
  }

  #[test]
  fn size_limit_is_checked_before_parsing() {
    let err = import_bytes(b"not even csv", 4).unwrap_err();
    assert!(matches!(err, Error::TooLarge { size: 12, limit: 4 }));
  }

  #[test]
  fn invalid_utf8_is_rejected() {
    assert!(matches!(import_bytes(&[0xff, 0xfe, 0x00], 1024), Err(Error::Encoding(_))));
  }

  #[test]
  fn bom_is_ignored() {
    let csv = format!("\u{feff}{HEADER}\n2025-01-15,Scope 2,E,O,1,kWh,1\n");
    assert_eq!(import_str(&csv).unwrap().stats.rows, 1);
  }
}
