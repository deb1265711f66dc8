//! # Bloom Directory Locking
//!
//! Prevents two server processes from serving the same bloom directory.
//! Both would keep their own in-memory filters and overwrite each other's
//! files on flush.
//!
//! Uses `fs2` for cross-platform file locking (flock on Unix, LockFile on Windows).

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use thiserror::Error;

/// Errors from directory locking
#[derive(Debug, Error)]
pub enum LockError {
    #[error("Failed to create lock file {path}: {source}")]
    CreateFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Bloom directory already in use{} ({})", holder(.pid), .path.display())]
    AlreadyLocked { pid: Option<u32>, path: PathBuf },

    #[error("Failed to write PID to lock file: {0}")]
    WriteFailed(#[source] io::Error),
}

fn holder(pid: &Option<u32>) -> String {
    pid.map(|p| format!(" by process {p}")).unwrap_or_default()
}

/// Exclusive lock on a bloom directory.
///
/// Acquired before bootstrap, released on drop.
#[derive(Debug)]
pub struct DirectoryLock {
    /// Kept open to hold the lock
    file: File,
    path: PathBuf,
    pid: u32,
}

impl DirectoryLock {
    /// Lock file name inside the bloom directory
    pub const LOCK_FILE: &'static str = ".nsbloom.lock";

    /// Acquire an exclusive lock on `bloom_dir`.
    ///
    /// # Errors
    ///
    /// Returns `LockError::AlreadyLocked` if another process holds the lock.
    pub fn acquire(bloom_dir: &Path) -> Result<Self, LockError> {
        let path = bloom_dir.join(Self::LOCK_FILE);

        let mut file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|source| LockError::CreateFailed {
                path: path.clone(),
                source,
            })?;

        if file.try_lock_exclusive().is_err() {
            return Err(LockError::AlreadyLocked {
                pid: Self::read_existing_pid(&path),
                path,
            });
        }

        let pid = std::process::id();
        file.set_len(0).map_err(LockError::WriteFailed)?;
        writeln!(file, "{pid}").map_err(LockError::WriteFailed)?;
        file.sync_all().map_err(LockError::WriteFailed)?;

        tracing::debug!(path = %path.display(), pid, "Acquired bloom directory lock");
        Ok(Self { file, path, pid })
    }

    fn read_existing_pid(path: &Path) -> Option<u32> {
        fs::read_to_string(path).ok()?.trim().parse().ok()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }
}

impl Drop for DirectoryLock {
    fn drop(&mut self) {
        // The OS releases the lock when the handle closes; unlock explicitly
        // so the file can be re-locked within the same process.
        let _ = FileExt::unlock(&self.file);
    }
}
