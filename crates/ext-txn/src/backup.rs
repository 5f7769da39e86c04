//! Transaction backups with rotation
//!
//! Every target file that exists is copied into the backup directory before
//! staging, tagged with the transaction id. Backups restore on rollback and
//! are pruned to the N most recent per file after a successful commit.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use uuid::Uuid;

use crate::Result;

/// Backups kept per target file after pruning.
pub const DEFAULT_RETENTION: usize = 3;

/// One pre-transaction copy of a target file.
///
/// `copy` is `None` when the target did not exist before the transaction;
/// restoring such a backup removes the target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backup {
    pub target: PathBuf,
    pub copy: Option<PathBuf>,
}

/// Flat directory of timestamped backup copies.
#[derive(Debug, Clone)]
pub struct BackupStore {
    dir: PathBuf,
    retention: usize,
}

impl BackupStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            retention: DEFAULT_RETENTION,
        }
    }

    pub fn with_retention(mut self, retention: usize) -> Self {
        self.retention = retention;
        self
    }

    /// Copy `target` into the store, tagged with `txn_id`. A missing target
    /// yields a tombstone backup whose restore deletes the target.
    pub fn create(&self, target: &Path, txn_id: Uuid) -> Result<Backup> {
        if !target.exists() {
            return Ok(Backup {
                target: target.to_path_buf(),
                copy: None,
            });
        }

        fs::create_dir_all(&self.dir).map_err(|e| ext_fs::Error::io(&self.dir, e))?;

        let file_name = target
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let stamp = Utc::now().format("%Y%m%dT%H%M%S%3f");
        let short_id = &txn_id.simple().to_string()[..8];
        let copy = self.dir.join(format!("{file_name}.{stamp}.{short_id}.bak"));

        fs::copy(target, &copy).map_err(|e| ext_fs::Error::io(&copy, e))?;
        tracing::debug!(target = %target.display(), backup = %copy.display(), "backed up");
        Ok(Backup {
            target: target.to_path_buf(),
            copy: Some(copy),
        })
    }

    /// Restore one backup: copy back over the target, or remove the target
    /// for a tombstone.
    pub fn restore(&self, backup: &Backup) -> Result<()> {
        match &backup.copy {
            Some(copy) => {
                fs::copy(copy, &backup.target).map_err(|e| ext_fs::Error::io(&backup.target, e))?;
            }
            None => {
                if backup.target.exists() {
                    fs::remove_file(&backup.target)
                        .map_err(|e| ext_fs::Error::io(&backup.target, e))?;
                }
            }
        }
        Ok(())
    }

    /// Prune old backups of `file_name`, keeping the configured number of
    /// most recent copies. The timestamped naming makes lexicographic order
    /// chronological.
    pub fn prune(&self, file_name: &str) -> Result<()> {
        if !self.dir.exists() {
            return Ok(());
        }
        let prefix = format!("{file_name}.");
        let mut copies: Vec<PathBuf> = fs::read_dir(&self.dir)
            .map_err(|e| ext_fs::Error::io(&self.dir, e))?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with(&prefix) && n.ends_with(".bak"))
            })
            .collect();
        copies.sort();

        let excess = copies.len().saturating_sub(self.retention);
        for old in &copies[..excess] {
            if let Err(e) = fs::remove_file(old) {
                tracing::warn!(backup = %old.display(), error = %e, "failed to prune backup");
            }
        }
        Ok(())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}
