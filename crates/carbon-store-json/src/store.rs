//! [`JsonFileStore`]: the JSON file implementation of [`RecordFileStore`].

use std::{
  fs,
  io::{self, Write as _},
  path::{Path, PathBuf},
};

use carbon_core::{
  record::EmissionRecord,
  store::{LoadOutcome, RecordFileStore},
};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::{Error, Result, paths};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A record store backed by a single JSON file.
///
/// Only one process should write a given file; concurrent writers are not
/// arbitrated and the last rename wins.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
  path: PathBuf,
}

impl JsonFileStore {
  pub const FILE_NAME: &'static str = "emissions.json";

  /// Use the file at `path`, creating its directory if needed.
  pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
    let path = path.into();
    let dir = paths::parent_dir(&path);
    fs::create_dir_all(dir).map_err(|source| Error::DataDir {
      path: dir.to_path_buf(),
      source,
    })?;
    Ok(Self { path })
  }

  /// Use `<dir>/emissions.json`, creating `dir` if needed.
  pub fn in_dir(dir: impl AsRef<Path>) -> Result<Self> {
    Self::open(dir.as_ref().join(Self::FILE_NAME))
  }

  pub fn path(&self) -> &Path { &self.path }

  /// Serialize `records` into a synced temp file beside the target.
  ///
  /// Nothing visible changes until [`StagedWrite::commit`]; dropping the
  /// staged write deletes the temp file and leaves the store as it was.
  pub fn stage(&self, records: &[EmissionRecord]) -> Result<StagedWrite<'_>> {
    let payload = serde_json::to_vec_pretty(records)?;
    let io_err = |source: io::Error| Error::SaveIo {
      path: self.path.clone(),
      source,
    };

    let mut temp = tempfile::Builder::new()
      .prefix(&paths::temp_prefix(&self.path))
      .suffix(paths::TEMP_SUFFIX)
      .tempfile_in(paths::parent_dir(&self.path))
      .map_err(io_err)?;
    temp.write_all(&payload).map_err(io_err)?;
    temp.flush().map_err(io_err)?;
    temp.as_file().sync_all().map_err(io_err)?;

    debug!(
      temp = %temp.path().display(),
      bytes = payload.len(),
      "staged record payload"
    );
    Ok(StagedWrite {
      target: &self.path,
      temp,
    })
  }

  /// Every `<path>.bak.<ts>` file currently beside the store, oldest first.
  pub fn backups(&self) -> io::Result<Vec<PathBuf>> {
    let prefix = match self.path.file_name() {
      Some(name) => format!("{}.bak.", name.to_string_lossy()),
      None => return Ok(Vec::new()),
    };
    let mut found: Vec<(i64, PathBuf)> = Vec::new();
    for entry in fs::read_dir(paths::parent_dir(&self.path))? {
      let entry = entry?;
      let name = entry.file_name();
      let Some(ts) = name
        .to_str()
        .and_then(|n| n.strip_prefix(&prefix))
        .and_then(|ts| ts.parse::<i64>().ok())
      else {
        continue;
      };
      found.push((ts, entry.path()));
    }
    found.sort();
    Ok(found.into_iter().map(|(_, p)| p).collect())
  }

  /// Copy an unreadable store aside and report an empty collection.
  fn recover(&self, reason: String) -> LoadOutcome {
    let backup = paths::corrupt_backup_path(&self.path, paths::unix_timestamp());
    let backup_path = match fs::copy(&self.path, &backup) {
      Ok(_) => Some(backup),
      Err(e) => {
        warn!(
          error = %e,
          path = %self.path.display(),
          "could not preserve unreadable record store"
        );
        None
      }
    };
    warn!(
      path = %self.path.display(),
      backup = ?backup_path,
      %reason,
      "record store unreadable; continuing with an empty collection"
    );
    LoadOutcome::RecoveredFromCorruption {
      records: Vec::new(),
      backup_path,
      reason,
    }
  }
}

// ─── Staged write ────────────────────────────────────────────────────────────

/// A fully written and synced payload waiting to replace the store file.
#[must_use = "a staged write does nothing until committed"]
pub struct StagedWrite<'a> {
  target: &'a Path,
  temp:   NamedTempFile,
}

impl StagedWrite<'_> {
  pub fn temp_path(&self) -> &Path { self.temp.path() }

  /// Back up the current file, then atomically rename the payload over it.
  ///
  /// A failed backup is logged and does not stop the rename.
  pub fn commit(self) -> Result<()> {
    let Self { target, temp } = self;

    if target.exists() {
      let backup = paths::overwrite_backup_path(target, paths::unix_timestamp());
      match fs::copy(target, &backup) {
        Ok(_) => debug!(backup = %backup.display(), "backed up previous records"),
        Err(e) => warn!(
          error = %e,
          backup = %backup.display(),
          "backup before overwrite failed; saving anyway"
        ),
      }
    }

    // On failure the returned temp file is dropped, which removes it.
    temp.persist(target).map_err(|e| Error::SaveIo {
      path:   target.to_path_buf(),
      source: e.error,
    })?;

    if let Err(e) = sync_dir(paths::parent_dir(target)) {
      warn!(error = %e, "could not sync data directory after rename");
    }
    Ok(())
  }
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> io::Result<()> { fs::File::open(dir)?.sync_all() }

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> io::Result<()> { Ok(()) }

// ─── RecordFileStore impl ────────────────────────────────────────────────────

impl RecordFileStore for JsonFileStore {
  type Error = Error;

  fn load(&self) -> LoadOutcome {
    let raw = match fs::read_to_string(&self.path) {
      Ok(raw) => raw,
      Err(e) if e.kind() == io::ErrorKind::NotFound => {
        info!(path = %self.path.display(), "no record store yet; starting empty");
        return LoadOutcome::Loaded(Vec::new());
      }
      Err(e) => return self.recover(e.to_string()),
    };

    if raw.trim().is_empty() {
      return LoadOutcome::Loaded(Vec::new());
    }

    match serde_json::from_str::<Vec<EmissionRecord>>(&raw) {
      Ok(records) => LoadOutcome::Loaded(records),
      Err(e) => self.recover(e.to_string()),
    }
  }

  fn save(&self, records: &[EmissionRecord]) -> Result<()> {
    self.stage(records)?.commit()?;
    info!(
      count = records.len(),
      path = %self.path.display(),
      "saved emission records"
    );
    Ok(())
  }
}
