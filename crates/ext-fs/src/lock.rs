//! Per-scope advisory locking
//!
//! One lock file per scope serializes transactions: a second invocation
//! against the same scope fails fast instead of racing on the same backup
//! and staging files.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;

use crate::{Error, Result};

/// Held advisory lock for one scope. Released on drop.
#[derive(Debug)]
pub struct ScopeLock {
    file: File,
    path: PathBuf,
    scope: String,
}

impl ScopeLock {
    /// Try to acquire the scope lock at `path`, failing fast with
    /// [`Error::LockBusy`] if another process holds it.
    pub fn acquire(scope: &str, path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|e| Error::io(path, e))?;

        match file.try_lock_exclusive() {
            Ok(()) => {
                tracing::debug!(scope, path = %path.display(), "acquired scope lock");
                Ok(Self {
                    file,
                    path: path.to_path_buf(),
                    scope: scope.to_string(),
                })
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Err(Error::LockBusy {
                scope: scope.to_string(),
                path: path.to_path_buf(),
            }),
            Err(_) => Err(Error::LockFailed {
                path: path.to_path_buf(),
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScopeLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            tracing::warn!(
                scope = %self.scope,
                path = %self.path.display(),
                error = %e,
                "failed to release scope lock"
            );
        }
    }
}
