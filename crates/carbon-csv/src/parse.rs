//! RFC 4180 CSV tokenizer.
//!
//! Pipeline:
//!   raw &str
//!     └─ strip_bom()
//!          └─ split_records()     → Vec<Vec<String>>
//!               └─ Table::from_records() → header + data rows

use carbon_core::calc::ImportRow;

use crate::error::{Error, Result};

// ─── Low-level helpers
// ────────────────────────────────────────────────────────

pub(crate) fn strip_bom(s: &str) -> &str { s.strip_prefix('\u{feff}').unwrap_or(s) }

/// Split `input` into records of fields.
///
/// Handles quoted fields with embedded commas, doubled quotes, and line
/// breaks. CRLF, LF, and bare CR all end a record. A quote that appears
/// inside an unquoted field is kept literally.
pub(crate) fn split_records(input: &str) -> Result<Vec<Vec<String>>> {
  let mut records: Vec<Vec<String>> = Vec::new();
  let mut record: Vec<String> = Vec::new();
  let mut field = String::new();
  let mut in_quotes = false;
  let mut quote_line = 0usize;
  let mut line = 1usize;

  let mut chars = input.chars().peekable();
  while let Some(c) = chars.next() {
    if in_quotes {
      match c {
        '"' if chars.peek() == Some(&'"') => {
          chars.next();
          field.push('"');
        }
        '"' => in_quotes = false,
        '\n' => {
          line += 1;
          field.push(c);
        }
        _ => field.push(c),
      }
      continue;
    }

    match c {
      '"' if field.is_empty() => {
        in_quotes = true;
        quote_line = line;
      }
      ',' => record.push(std::mem::take(&mut field)),
      // CRLF: let the '\n' close the record.
      '\r' if chars.peek() == Some(&'\n') => {}
      '\r' | '\n' => {
        line += 1;
        record.push(std::mem::take(&mut field));
        records.push(std::mem::take(&mut record));
      }
      _ => field.push(c),
    }
  }

  if in_quotes {
    return Err(Error::UnterminatedQuote { line: quote_line });
  }
  if !field.is_empty() || !record.is_empty() {
    record.push(field);
    records.push(record);
  }
  Ok(records)
}

fn is_blank(record: &[String]) -> bool {
  record.iter().all(|f| f.trim().is_empty())
}

/// Trim header names and suffix repeats (`notes`, `notes.1`, ...) so every
/// column keeps a distinct key.
fn dedupe_headers(raw: Vec<String>) -> Vec<String> {
  let mut headers: Vec<String> = Vec::with_capacity(raw.len());
  for name in raw {
    let base = name.trim().to_owned();
    let mut candidate = base.clone();
    let mut n = 1;
    while headers.contains(&candidate) {
      candidate = format!("{base}.{n}");
      n += 1;
    }
    headers.push(candidate);
  }
  headers
}

// ─── Table ───────────────────────────────────────────────────────────────────

/// A parsed CSV document: one header row plus data rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
  pub headers: Vec<String>,
  pub rows:    Vec<Vec<String>>,
}

impl Table {
  /// Take the first non-blank record as the header; drop blank lines.
  pub(crate) fn from_records(records: Vec<Vec<String>>) -> Result<Self> {
    let mut iter = records.into_iter().filter(|r| !is_blank(r));
    let headers = dedupe_headers(iter.next().ok_or(Error::Empty)?);
    Ok(Self {
      headers,
      rows: iter.collect(),
    })
  }

  /// Key each data row by header name.
  ///
  /// Short rows read their missing cells as empty; cells past the last
  /// header are ignored.
  pub fn import_rows(&self) -> impl Iterator<Item = ImportRow> + '_ {
    self.rows.iter().map(|row| {
      self
        .headers
        .iter()
        .enumerate()
        .map(|(i, h)| (h.clone(), row.get(i).cloned().unwrap_or_default()))
        .collect()
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn split(s: &str) -> Vec<Vec<String>> { split_records(s).unwrap() }

  #[test]
  fn plain_fields_and_line_endings() {
    assert_eq!(split("a,b\r\n1,2\n3,4\r5,6"), vec![
      vec!["a", "b"],
      vec!["1", "2"],
      vec!["3", "4"],
      vec!["5", "6"],
    ]);
  }

  #[test]
  fn trailing_newline_adds_no_record() {
    assert_eq!(split("a,b\n").len(), 1);
  }

  #[test]
  fn quoted_fields() {
    let records = split("\"Plant 2, North\",\"say \"\"hi\"\"\",\"two\nlines\"\n");
    assert_eq!(records, vec![vec!["Plant 2, North", "say \"hi\"", "two\nlines"]]);
  }

  #[test]
  fn empty_fields_are_kept() {
    assert_eq!(split(",,\n"), vec![vec!["", "", ""]]);
    assert_eq!(split("\"\",x"), vec![vec!["", "x"]]);
  }

  #[test]
  fn stray_quote_inside_unquoted_field_is_literal() {
    assert_eq!(split("12\" pipe,x"), vec![vec!["12\" pipe", "x"]]);
  }

  #[test]
  fn unterminated_quote_reports_start_line() {
    let err = split_records("a,b\n1,\"oops\n2,3\n").unwrap_err();
    assert!(matches!(err, Error::UnterminatedQuote { line: 2 }));
  }

  #[test]
  fn table_skips_blank_lines_and_dedupes_headers() {
    let table =
      Table::from_records(split("\n date , notes,notes\n\n1,a,b\n ,\n")).unwrap();
    assert_eq!(table.headers, vec!["date", "notes", "notes.1"]);
    assert_eq!(table.rows, vec![vec!["1", "a", "b"]]);
  }

  #[test]
  fn empty_document_has_no_header() {
    assert!(matches!(Table::from_records(split("\n\n")), Err(Error::Empty)));
  }

  #[test]
  fn short_rows_pad_and_long_rows_truncate() {
    let table = Table::from_records(split("a,b\n1\n1,2,3\n")).unwrap();
    let rows: Vec<ImportRow> = table.import_rows().collect();
    assert_eq!(rows[0].0.get("b").map(String::as_str), Some(""));
    assert_eq!(rows[1].0.len(), 2);
  }
}
