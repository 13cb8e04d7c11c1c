//! File-based locking for the journal writer.
//!
//! fs2 advisory lock on <root>/LOCK: один писатель на каталог журнала.
//! Read-only открытие блокировку не берёт. Lock is released on Drop.

use anyhow::{Context, Result};
use fs2::FileExt;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

pub const LOCK_FILE: &str = "LOCK";

#[derive(Debug)]
pub struct LockGuard {
    file: std::fs::File,
    path: PathBuf,
}

impl LockGuard {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

fn lock_file_path(root: &Path) -> PathBuf {
    root.join(LOCK_FILE)
}

/// Try to take the writer lock. Returns Err if another writer holds it.
pub fn try_acquire_writer_lock(root: &Path) -> Result<LockGuard> {
    let path = lock_file_path(root);
    let file = OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .open(&path)
        .with_context(|| format!("open lock file {}", path.display()))?;
    file.try_lock_exclusive().with_context(|| {
        format!(
            "journal at {} is locked by another writer",
            root.display()
        )
    })?;
    Ok(LockGuard { file, path })
}
