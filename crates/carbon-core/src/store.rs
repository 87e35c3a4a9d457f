//! The `RecordFileStore` trait and its load outcome.
//!
//! The trait is implemented by storage backends (e.g. `carbon-store-json`).
//! The [`Ledger`](crate::ledger::Ledger) depends on this abstraction, not on
//! any concrete backend.

use std::path::PathBuf;

use crate::record::EmissionRecord;

// ─── Load outcome ────────────────────────────────────────────────────────────

/// What a backend found when reading its persisted collection.
///
/// Loading never fails outright: unreadable contents are set aside and the
/// caller continues with an empty collection, told so explicitly.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
  /// The file was read (or absent, which reads as empty).
  Loaded(Vec<EmissionRecord>),
  /// The file could not be decoded and was preserved elsewhere.
  RecoveredFromCorruption {
    records:     Vec<EmissionRecord>,
    /// Where the unreadable file was copied; `None` if the copy failed too.
    backup_path: Option<PathBuf>,
    reason:      String,
  },
}

/// The salvage details of a [`LoadOutcome::RecoveredFromCorruption`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recovery {
  pub backup_path: Option<PathBuf>,
  pub reason:      String,
}

impl LoadOutcome {
  pub fn records(&self) -> &[EmissionRecord] {
    match self {
      Self::Loaded(records) => records,
      Self::RecoveredFromCorruption { records, .. } => records,
    }
  }

  pub fn is_recovered(&self) -> bool {
    matches!(self, Self::RecoveredFromCorruption { .. })
  }

  /// Split into the loaded collection and any recovery details.
  pub fn into_parts(self) -> (Vec<EmissionRecord>, Option<Recovery>) {
    match self {
      Self::Loaded(records) => (records, None),
      Self::RecoveredFromCorruption {
        records,
        backup_path,
        reason,
      } => (records, Some(Recovery { backup_path, reason })),
    }
  }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a whole-collection persistence backend.
///
/// The full collection is read at startup and rewritten on every change;
/// there are no partial writes. Calls are synchronous and a single process
/// is expected to own the backing file.
pub trait RecordFileStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Read the persisted collection, recovering from unreadable contents.
  fn load(&self) -> LoadOutcome;

  /// Durably replace the persisted collection with `records`.
  ///
  /// On error the previously persisted collection must still be intact.
  fn save(&self, records: &[EmissionRecord]) -> Result<(), Self::Error>;
}
