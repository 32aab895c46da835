use anyhow::{anyhow, Context, Result};
use log::{debug, warn};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::utils::errors::BananasyncError;

/// Exclusive marker file next to the sync state. Removed when dropped.
#[derive(Debug)]
pub struct SessionLock {
    path: PathBuf,
}

impl SessionLock {
    pub fn lock_path_for(state_file: &Path) -> PathBuf {
        let mut name = state_file.as_os_str().to_os_string();
        name.push(".lock");
        PathBuf::from(name)
    }

    /// Creates the lock file. A leftover lock whose holder process no longer runs is taken over.
    pub fn acquire(state_file: &Path) -> Result<Self> {
        let path = Self::lock_path_for(state_file);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        match Self::create(&path) {
            Err(err) if is_locked(&err) && Self::holder_is_gone(&path) => {
                warn!("Removing stale session lock {}", path.display());
                fs::remove_file(&path)
                    .with_context(|| format!("Failed to remove stale lock file: {}", path.display()))?;
                Self::create(&path)
            }
            other => other,
        }
    }

    fn create(path: &Path) -> Result<Self> {
        let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                return Err(anyhow!(BananasyncError::SessionLocked(
                    path.display().to_string()
                )));
            }
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("Failed to create lock file: {}", path.display()))
            }
        };
        let lock = Self {
            path: path.to_path_buf(),
        };
        writeln!(file, "{}", std::process::id())
            .with_context(|| format!("Failed to write lock file: {}", path.display()))?;

        debug!("Acquired session lock {}", path.display());
        Ok(lock)
    }

    /// True only when the lock names a PID that is known not to be running.
    fn holder_is_gone(path: &Path) -> bool {
        fs::read_to_string(path)
            .ok()
            .and_then(|contents| contents.trim().parse::<u32>().ok())
            .map_or(false, |pid| !process_is_running(pid))
    }
}

fn is_locked(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<BananasyncError>(),
        Some(BananasyncError::SessionLocked(_))
    )
}

#[cfg(target_os = "linux")]
fn process_is_running(pid: u32) -> bool {
    Path::new("/proc").join(pid.to_string()).exists()
}

// Without a cheap liveness check, leftover locks are never assumed stale.
#[cfg(not(target_os = "linux"))]
fn process_is_running(_pid: u32) -> bool {
    true
}

impl Drop for SessionLock {
    fn drop(&mut self) {
        if let Err(err) = fs::remove_file(&self.path) {
            warn!("Failed to remove lock file {}: {}", self.path.display(), err);
        }
    }
}
