//! Positional collection edits and the [`Ledger`] handle that persists them.
//!
//! The free functions are pure transforms over a `Vec`; an out-of-range
//! index leaves the vector untouched. [`Ledger`] applies each transform to a
//! staged copy, saves it, and adopts the copy only once the save succeeded,
//! so memory and disk never disagree after a failed write.

use std::ops::Range;

use tracing::{info, warn};

use crate::{
  Error, Result,
  record::EmissionRecord,
  store::{RecordFileStore, Recovery},
};

// ─── Pure transforms ─────────────────────────────────────────────────────────

/// Push `record` and return its index.
pub fn append(records: &mut Vec<EmissionRecord>, record: EmissionRecord) -> usize {
  records.push(record);
  records.len() - 1
}

/// Replace the record at `index`, returning the old one.
pub fn update_at(
  records: &mut [EmissionRecord],
  index: usize,
  record: EmissionRecord,
) -> Result<EmissionRecord> {
  let len = records.len();
  let slot = records
    .get_mut(index)
    .ok_or(Error::OutOfRange { index, len })?;
  Ok(std::mem::replace(slot, record))
}

/// Remove the record at `index`, shifting later records down by one.
pub fn delete_at(
  records: &mut Vec<EmissionRecord>,
  index: usize,
) -> Result<EmissionRecord> {
  if index >= records.len() {
    return Err(Error::OutOfRange {
      index,
      len: records.len(),
    });
  }
  Ok(records.remove(index))
}

// ─── Ledger ──────────────────────────────────────────────────────────────────

/// The single owned handle over the record collection and its backing store.
pub struct Ledger<S> {
  store:   S,
  records: Vec<EmissionRecord>,
}

impl<S: RecordFileStore> Ledger<S> {
  /// Load the collection from `store`.
  ///
  /// Returns any recovery details alongside the handle; a recovered ledger
  /// starts empty.
  pub fn open(store: S) -> (Self, Option<Recovery>) {
    let (records, recovery) = store.load().into_parts();
    match &recovery {
      Some(r) => warn!(
        backup = ?r.backup_path,
        reason = %r.reason,
        "record store was unreadable; starting empty"
      ),
      None => info!(count = records.len(), "loaded emission records"),
    }
    (Self { store, records }, recovery)
  }

  pub fn records(&self) -> &[EmissionRecord] { &self.records }

  pub fn get(&self, index: usize) -> Option<&EmissionRecord> {
    self.records.get(index)
  }

  pub fn len(&self) -> usize { self.records.len() }

  pub fn is_empty(&self) -> bool { self.records.is_empty() }

  pub fn store(&self) -> &S { &self.store }

  /// Run `edit` on a copy of the collection, persist it, then adopt it.
  fn commit<T>(
    &mut self,
    edit: impl FnOnce(&mut Vec<EmissionRecord>) -> Result<T>,
  ) -> Result<T> {
    let mut staged = self.records.clone();
    let out = edit(&mut staged)?;
    self
      .store
      .save(&staged)
      .map_err(|e| Error::Store(Box::new(e)))?;
    self.records = staged;
    Ok(out)
  }

  /// Append one record and persist; returns its index.
  pub fn append(&mut self, record: EmissionRecord) -> Result<usize> {
    self.commit(|records| Ok(append(records, record)))
  }

  /// Append a batch with a single save; returns the new index range.
  pub fn extend(&mut self, batch: Vec<EmissionRecord>) -> Result<Range<usize>> {
    self.commit(|records| {
      let start = records.len();
      records.extend(batch);
      Ok(start..records.len())
    })
  }

  /// Replace the record at `index` and persist; returns the old record.
  pub fn update_at(
    &mut self,
    index: usize,
    record: EmissionRecord,
  ) -> Result<EmissionRecord> {
    self.commit(|records| update_at(records, index, record))
  }

  /// Delete the record at `index` and persist; returns the removed record.
  pub fn delete_at(&mut self, index: usize) -> Result<EmissionRecord> {
    self.commit(|records| delete_at(records, index))
  }
}

#[cfg(test)]
mod tests {
  use std::{
    path::PathBuf,
    sync::{
      Mutex,
      atomic::{AtomicBool, Ordering},
    },
  };

  use super::*;
  use crate::store::LoadOutcome;

  #[derive(Debug, thiserror::Error)]
  #[error("disk full")]
  struct DiskFull;

  #[derive(Default)]
  struct MemoryStore {
    initial: Vec<EmissionRecord>,
    corrupt: bool,
    saved:   Mutex<Vec<Vec<EmissionRecord>>>,
    fail:    AtomicBool,
  }

  impl RecordFileStore for MemoryStore {
    type Error = DiskFull;

    fn load(&self) -> LoadOutcome {
      if self.corrupt {
        LoadOutcome::RecoveredFromCorruption {
          records:     Vec::new(),
          backup_path: Some(PathBuf::from("emissions_backup_1.json")),
          reason:      "expected value at line 1 column 1".into(),
        }
      } else {
        LoadOutcome::Loaded(self.initial.clone())
      }
    }

    fn save(&self, records: &[EmissionRecord]) -> Result<(), DiskFull> {
      if self.fail.load(Ordering::SeqCst) {
        return Err(DiskFull);
      }
      self.saved.lock().unwrap().push(records.to_vec());
      Ok(())
    }
  }

  fn record(activity: &str) -> EmissionRecord {
    serde_json::from_value(serde_json::json!({
      "date": "2025-01-15",
      "scope": "Scope 2",
      "activity": activity,
    }))
    .unwrap()
  }

  fn three() -> Vec<EmissionRecord> {
    vec![record("a"), record("b"), record("c")]
  }

  // ── Pure transforms ─────────────────────────────────────────────────────────

  #[test]
  fn delete_at_len_is_out_of_range_and_leaves_collection() {
    let mut records = three();
    let err = delete_at(&mut records, 3).unwrap_err();
    assert!(matches!(err, Error::OutOfRange { index: 3, len: 3 }));
    assert_eq!(records, three());
  }

  #[test]
  fn delete_at_shifts_later_records() {
    let mut records = three();
    let removed = delete_at(&mut records, 1).unwrap();
    assert_eq!(removed.activity, "b");
    let order: Vec<_> = records.iter().map(|r| r.activity.as_str()).collect();
    assert_eq!(order, ["a", "c"]);
  }

  #[test]
  fn update_at_replaces_in_place() {
    let mut records = three();
    let old = update_at(&mut records, 0, record("z")).unwrap();
    assert_eq!(old.activity, "a");
    assert_eq!(records[0].activity, "z");
    assert!(update_at(&mut records, 9, record("y")).is_err());
    assert_eq!(records.len(), 3);
  }

  #[test]
  fn append_returns_new_index() {
    let mut records = three();
    assert_eq!(append(&mut records, record("d")), 3);
  }

  // ── Ledger ──────────────────────────────────────────────────────────────────

  #[test]
  fn open_reports_recovery() {
    let (ledger, recovery) = Ledger::open(MemoryStore {
      corrupt: true,
      ..Default::default()
    });
    assert!(ledger.is_empty());
    let recovery = recovery.unwrap();
    assert_eq!(
      recovery.backup_path,
      Some(PathBuf::from("emissions_backup_1.json"))
    );
  }

  #[test]
  fn edits_are_saved_in_order() {
    let (mut ledger, recovery) = Ledger::open(MemoryStore {
      initial: three(),
      ..Default::default()
    });
    assert!(recovery.is_none());

    assert_eq!(ledger.append(record("d")).unwrap(), 3);
    ledger.delete_at(0).unwrap();
    assert_eq!(ledger.extend(vec![record("e"), record("f")]).unwrap(), 3..5);

    let saved = ledger.store().saved.lock().unwrap();
    assert_eq!(saved.len(), 3);
    let last: Vec<_> = saved[2].iter().map(|r| r.activity.as_str()).collect();
    assert_eq!(last, ["b", "c", "d", "e", "f"]);
    assert_eq!(saved[2].as_slice(), ledger.records());
  }

  #[test]
  fn failed_save_keeps_memory_unchanged() {
    let (mut ledger, _) = Ledger::open(MemoryStore {
      initial: three(),
      ..Default::default()
    });
    ledger.store().fail.store(true, Ordering::SeqCst);

    let err = ledger.delete_at(0).unwrap_err();
    assert!(matches!(err, Error::Store(_)));
    assert_eq!(ledger.records(), three().as_slice());
  }

  #[test]
  fn out_of_range_delete_skips_save() {
    let (mut ledger, _) = Ledger::open(MemoryStore {
      initial: three(),
      ..Default::default()
    });
    assert!(matches!(
      ledger.delete_at(3),
      Err(Error::OutOfRange { index: 3, len: 3 })
    ));
    assert!(ledger.store().saved.lock().unwrap().is_empty());
    assert_eq!(ledger.len(), 3);
  }
}
