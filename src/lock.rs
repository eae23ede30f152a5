//! File-based locking to prevent concurrent execution.
//!
//! The engines assume at most one process mutates the managed firewall
//! state at a time; mutating commands take this advisory lock first.

use anyhow::{Context, Result};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

const LOCK_FILE: &str = "/var/run/geoblock.lock";

/// Holds an exclusive lock for the lifetime of one command; released on drop.
pub struct LockGuard {
    _file: File,
}

impl LockGuard {
    /// Acquire the lock, failing fast if another instance holds it.
    ///
    /// Open with create+read+write (no truncate) so there is no race
    /// between file creation and lock acquisition.
    pub fn acquire() -> Result<Self> {
        let lock_path = Path::new(LOCK_FILE);
        if let Some(parent) = lock_path.parent() {
            fs::create_dir_all(parent).ok();
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(lock_path)
            .with_context(|| format!("Failed to open lock file: {LOCK_FILE}"))?;

        fs::set_permissions(lock_path, fs::Permissions::from_mode(0o600))
            .context("Failed to set lock file permissions")?;

        file.try_lock_exclusive().map_err(|_| {
            anyhow::anyhow!(
                "Another geoblock instance is already running.\n\
                 Wait for it to complete, or remove {LOCK_FILE} if it is stale."
            )
        })?;

        Ok(Self { _file: file })
    }
}
