//! Error type for `carbon-store-json`.

use std::{io, path::PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("failed to serialize records: {0}")]
  Serialize(#[from] serde_json::Error),

  /// Writing, syncing, or renaming the new file failed. The previously
  /// persisted file is untouched.
  #[error("failed to save {}: {source}", .path.display())]
  SaveIo {
    path:   PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to prepare data directory {}: {source}", .path.display())]
  DataDir {
    path:   PathBuf,
    #[source]
    source: io::Error,
  },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
