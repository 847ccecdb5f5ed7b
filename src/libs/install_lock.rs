//! Cross-process exclusive lock guarding one candidate root.
//!
//! The lock file (`<candidate>/.pkm-bootstrap.lock`) is opened without truncation
//! and locked with an advisory OS lock. Only the holder writes to it: a JSON
//! record of who holds the lock, shown to any run that finds it taken. A run
//! that loses the race therefore leaves the candidate root untouched.
//!
//! The file itself is never removed. Deleting it on release would let a waiting
//! run lock an unlinked inode while a third run creates a fresh one.

use crate::error::{BootstrapError, Result};
use crate::libs::utilities::timestamps::current_timestamp;
use crate::{log_debug, log_warn};
use colored::Colorize;
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Who holds the lock. Written into the lock file by the holder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockHolder {
    pub pid: u32,
    pub started_at: String,
    /// `install` or `uninstall`.
    pub operation: String,
}

impl std::fmt::Display for LockHolder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "pid {} ({} since {})", self.pid, self.operation, self.started_at)
    }
}

/// A held lock. Released when dropped.
#[derive(Debug)]
pub struct InstallLock {
    file: File,
    path: PathBuf,
}

impl InstallLock {
    /// Takes the lock at `lock_path` without waiting.
    ///
    /// # Errors
    /// `InstallInProgress` when another run (in this or another process) holds it.
    pub fn acquire(lock_path: &Path, operation: &str) -> Result<InstallLock> {
        if let Some(parent) = lock_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| BootstrapError::io(format!("failed to create {}", parent.display()), e))?;
        }

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(lock_path)
            .map_err(|e| BootstrapError::io(format!("failed to open lock {}", lock_path.display()), e))?;

        if let Err(e) = file.try_lock_exclusive() {
            if e.raw_os_error() == fs2::lock_contended_error().raw_os_error() {
                let holder = read_holder(&mut file)
                    .map(|h| h.to_string())
                    .unwrap_or_else(|| "an unknown process".to_string());
                log_warn!(
                    "[Lock] {} is held by {}",
                    lock_path.display().to_string().yellow(),
                    holder
                );
                return Err(BootstrapError::InstallInProgress {
                    lock: lock_path.to_path_buf(),
                    holder,
                });
            }
            return Err(BootstrapError::io(
                format!("failed to lock {}", lock_path.display()),
                e,
            ));
        }

        let holder = LockHolder {
            pid: std::process::id(),
            started_at: current_timestamp(),
            operation: operation.to_string(),
        };
        write_holder(&mut file, &holder)
            .map_err(|e| BootstrapError::io(format!("failed to write lock {}", lock_path.display()), e))?;
        log_debug!("[Lock] Acquired {}", lock_path.display().to_string().cyan());

        Ok(InstallLock {
            file,
            path: lock_path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for InstallLock {
    fn drop(&mut self) {
        if let Err(e) = self.file.set_len(0) {
            log_warn!("[Lock] Failed to clear holder metadata in {}: {}", self.path.display(), e);
        }
        if let Err(e) = FileExt::unlock(&self.file) {
            log_warn!("[Lock] Failed to release {}: {}", self.path.display(), e);
        } else {
            log_debug!("[Lock] Released {}", self.path.display());
        }
    }
}

fn read_holder(file: &mut File) -> Option<LockHolder> {
    let mut contents = String::new();
    file.read_to_string(&mut contents).ok()?;
    serde_json::from_str(&contents).ok()
}

fn write_holder(file: &mut File, holder: &LockHolder) -> std::io::Result<()> {
    let json = serde_json::to_string(holder).map_err(std::io::Error::other)?;
    file.set_len(0)?;
    file.seek(SeekFrom::Start(0))?;
    file.write_all(json.as_bytes())?;
    file.sync_all()
}
