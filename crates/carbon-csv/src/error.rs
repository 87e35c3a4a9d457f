//! Error types for the carbon-csv codec.

use carbon_core::calc::MissingColumnsError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("file too large: {size} bytes exceeds the {limit} byte limit")]
  TooLarge { size: usize, limit: usize },

  #[error("CSV is not valid UTF-8")]
  Encoding(#[from] std::str::Utf8Error),

  #[error("CSV has no header row")]
  Empty,

  #[error("unterminated quoted field starting on line {line}")]
  UnterminatedQuote { line: usize },

  #[error(transparent)]
  MissingColumns(#[from] MissingColumnsError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
