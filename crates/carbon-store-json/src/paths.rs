//! Naming rules for the sidecar files kept next to the store.
//!
//! - pre-overwrite backups: `<path>.bak.<unix_ts>`
//! - corrupt-on-load copies: `<dir>/<stem>_backup_<unix_ts>.json`
//! - temp files: `<stem>_*.tmp` in the same directory as the target

use std::{
  ffi::OsString,
  path::{Path, PathBuf},
};

use chrono::Utc;

pub fn unix_timestamp() -> i64 { Utc::now().timestamp() }

fn stem(path: &Path) -> String {
  path
    .file_stem()
    .map(|s| s.to_string_lossy().into_owned())
    .unwrap_or_else(|| "emissions".to_owned())
}

/// The directory holding `path`; `.` for a bare file name.
pub fn parent_dir(path: &Path) -> &Path {
  match path.parent() {
    Some(p) if !p.as_os_str().is_empty() => p,
    _ => Path::new("."),
  }
}

pub fn overwrite_backup_path(path: &Path, ts: i64) -> PathBuf {
  let mut name = OsString::from(path.as_os_str());
  name.push(format!(".bak.{ts}"));
  PathBuf::from(name)
}

pub fn corrupt_backup_path(path: &Path, ts: i64) -> PathBuf {
  parent_dir(path).join(format!("{}_backup_{ts}.json", stem(path)))
}

pub fn temp_prefix(path: &Path) -> String { format!("{}_", stem(path)) }

pub const TEMP_SUFFIX: &str = ".tmp";

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn backup_names() {
    let path = Path::new("data/emissions.json");
    assert_eq!(
      overwrite_backup_path(path, 1_700_000_000),
      PathBuf::from("data/emissions.json.bak.1700000000")
    );
    assert_eq!(
      corrupt_backup_path(path, 42),
      PathBuf::from("data/emissions_backup_42.json")
    );
    assert_eq!(temp_prefix(path), "emissions_");
  }

  #[test]
  fn bare_file_name_lives_in_cwd() {
    assert_eq!(parent_dir(Path::new("emissions.json")), Path::new("."));
  }
}
