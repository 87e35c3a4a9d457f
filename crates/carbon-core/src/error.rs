//! Error types for `carbon-core`.

use thiserror::Error;

use crate::calc::ValidationError;

#[derive(Debug, Error)]
pub enum Error {
  #[error("index {index} out of range for {len} records")]
  OutOfRange { index: usize, len: usize },

  #[error("{0}")]
  Validation(#[from] ValidationError),

  /// The backing store rejected a save; the collection was not changed.
  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
