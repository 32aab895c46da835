use anyhow::{anyhow, Context, Result};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use crate::utils::errors::BananasyncError;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct SyncRecord {
    #[serde(rename = "updatedAt")]
    pub updated_at: i64,
}

/// Last synced remote timestamp per mod ID.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(transparent)]
pub struct SyncState {
    records: BTreeMap<String, SyncRecord>,
}

impl SyncState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the state file, falling back to an empty state when it is missing or unreadable.
    ///
    /// A file that exists but does not parse is moved to `<path>.corrupt` so the next save
    /// does not destroy whatever it held.
    pub fn load(path: &Path) -> Self {
        Self::read(path, true)
    }

    /// Like [`SyncState::load`] but never touches the file, even when it is malformed.
    pub fn peek(path: &Path) -> Self {
        Self::read(path, false)
    }

    fn read(path: &Path, quarantine_malformed: bool) -> Self {
        if !path.exists() {
            debug!("No sync state at {}, starting fresh", path.display());
            return Self::new();
        }

        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                warn!(
                    "Failed to read sync state {}: {}. Treating every mod as unsynced",
                    path.display(),
                    err
                );
                return Self::new();
            }
        };

        match serde_json::from_str::<SyncState>(&content) {
            Ok(state) => state,
            Err(err) if !quarantine_malformed => {
                warn!("Sync state {} is malformed: {}", path.display(), err);
                Self::new()
            }
            Err(err) => {
                let backup = corrupt_path(path);
                warn!(
                    "Sync state {} is malformed ({}). Moving it to {} and starting fresh",
                    path.display(),
                    err,
                    backup.display()
                );
                if let Err(err) = fs::rename(path, &backup) {
                    warn!("Failed to move malformed sync state aside: {}", err);
                }
                Self::new()
            }
        }
    }

    /// Overwrites `path` with the full mapping. The write goes through a temp file in the
    /// same directory so a crash mid-write leaves the previous state intact.
    pub fn save(&self, path: &Path) -> Result<()> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create directory: {}", dir.display()))?;

        let content =
            serde_json::to_string_pretty(self).with_context(|| "Failed to serialize sync state")?;

        let mut tmp = NamedTempFile::new_in(&dir)
            .with_context(|| format!("Failed to create temp file in {}", dir.display()))?;
        tmp.write_all(content.as_bytes())
            .with_context(|| "Failed to write sync state")?;
        tmp.persist(path)
            .map_err(|err| anyhow!(BananasyncError::StatePersist(err.to_string())))
            .with_context(|| format!("Failed to replace sync state file: {}", path.display()))?;

        debug!("Saved {} sync records to {}", self.len(), path.display());
        Ok(())
    }

    pub fn get(&self, mod_id: &str) -> Option<SyncRecord> {
        self.records.get(mod_id).copied()
    }

    /// Raises the stored timestamp for `mod_id`. An older timestamp never replaces a newer one.
    pub fn record(&mut self, mod_id: &str, updated_at: i64) {
        self.records
            .entry(mod_id.to_string())
            .and_modify(|record| record.updated_at = record.updated_at.max(updated_at))
            .or_insert(SyncRecord { updated_at });
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &SyncRecord)> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn corrupt_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".corrupt");
    PathBuf::from(name)
}

/// Owns the in-memory state for one session and writes it back exactly once.
///
/// Call [`StateGuard::finish`] on every normal exit path so a failed save is reported.
/// If the guard is dropped instead (panic, cancelled future), the save happens in `Drop`
/// and a failure can only be logged.
#[derive(Debug)]
pub struct StateGuard {
    state: SyncState,
    path: PathBuf,
    saved: bool,
}

impl StateGuard {
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let state = SyncState::load(&path);
        Self {
            state,
            path,
            saved: false,
        }
    }

    pub fn state_mut(&mut self) -> &mut SyncState {
        &mut self.state
    }

    pub fn finish(mut self) -> Result<SyncState> {
        self.saved = true;
        self.state.save(&self.path)?;
        Ok(std::mem::take(&mut self.state))
    }
}

impl Drop for StateGuard {
    fn drop(&mut self) {
        if self.saved {
            return;
        }
        self.saved = true;
        if let Err(err) = self.state.save(&self.path) {
            warn!("Failed to save sync state on exit: {:#}", err);
        }
    }
}
