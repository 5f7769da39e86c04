//! The transaction state machine
//!
//! `Created → BackedUp → Staged → Validated → Committed` on success;
//! `→ RolledBack` when any stage fails and restore succeeds;
//! `→ FailedUnrecoverable` only when restore itself fails.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use uuid::Uuid;

use ext_fs::{CancelFlag, io::staging_path};

use crate::backup::{Backup, BackupStore, DEFAULT_RETENTION};
use crate::merge::deep_merge;
use crate::{Error, Result};

/// One staged mutation against a target file.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// Deep-merge `patch` into the target's current JSON content.
    MergeJson { target: PathBuf, patch: Value },
    /// Replace the target's content wholesale.
    WriteFile { target: PathBuf, contents: Vec<u8> },
    /// Remove the target.
    DeleteFile { target: PathBuf },
}

impl Operation {
    pub fn target(&self) -> &Path {
        match self {
            Operation::MergeJson { target, .. }
            | Operation::WriteFile { target, .. }
            | Operation::DeleteFile { target } => target,
        }
    }
}

/// Transaction lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxState {
    Created,
    BackedUp,
    Staged,
    Validated,
    Committed,
    RolledBack,
    FailedUnrecoverable,
}

impl std::fmt::Display for TxState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TxState::Created => "Created",
            TxState::BackedUp => "BackedUp",
            TxState::Staged => "Staged",
            TxState::Validated => "Validated",
            TxState::Committed => "Committed",
            TxState::RolledBack => "RolledBack",
            TxState::FailedUnrecoverable => "FailedUnrecoverable",
        };
        f.write_str(name)
    }
}

/// A staged file ready to commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedFile {
    pub target: PathBuf,
    /// Temp file to rename over the target; `None` stages a deletion.
    pub temp: Option<PathBuf>,
}

/// Creates transactions bound to one backup directory and retention policy.
#[derive(Debug, Clone)]
pub struct TransactionManager {
    store: BackupStore,
    cancel: CancelFlag,
}

impl TransactionManager {
    pub fn new(backups_dir: impl Into<PathBuf>) -> Self {
        Self {
            store: BackupStore::new(backups_dir).with_retention(DEFAULT_RETENTION),
            cancel: CancelFlag::new(),
        }
    }

    pub fn with_retention(mut self, retention: usize) -> Self {
        self.store = self.store.with_retention(retention);
        self
    }

    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Begin a transaction over `operations` without executing it. Callers
    /// drive the stages individually or via [`Transaction::run`].
    pub fn begin(&self, operations: Vec<Operation>) -> Transaction {
        Transaction {
            id: Uuid::new_v4(),
            operations,
            state: TxState::Created,
            store: self.store.clone(),
            cancel: self.cancel.clone(),
            backups: Vec::new(),
            staged: Vec::new(),
            committed: Vec::new(),
        }
    }

    /// Execute `operations` as one atomic unit.
    pub fn execute(&self, operations: Vec<Operation>) -> Result<()> {
        self.begin(operations).run()
    }
}

/// An in-flight transaction.
#[derive(Debug)]
pub struct Transaction {
    id: Uuid,
    operations: Vec<Operation>,
    state: TxState,
    store: BackupStore,
    cancel: CancelFlag,
    backups: Vec<Backup>,
    staged: Vec<StagedFile>,
    /// Targets whose rename has already landed this commit.
    committed: Vec<PathBuf>,
}

impl Transaction {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> TxState {
        self.state
    }

    pub fn staged_files(&self) -> &[StagedFile] {
        &self.staged
    }

    fn expect_state(&self, step: &'static str, expected: TxState) -> Result<()> {
        if self.state != expected {
            return Err(Error::InvalidState {
                step,
                state: self.state.to_string(),
            });
        }
        Ok(())
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        Ok(())
    }

    /// Stage 1: back up every existing target.
    pub fn backup(&mut self) -> Result<()> {
        self.expect_state("backup", TxState::Created)?;
        self.check_cancelled()?;

        for operation in &self.operations {
            let target = operation.target();
            if self.backups.iter().any(|b| b.target == target) {
                continue;
            }
            self.backups.push(self.store.create(target, self.id)?);
        }
        self.state = TxState::BackedUp;
        Ok(())
    }

    /// Stage 2: compute each target's new content into a sibling temp file.
    /// The temp file lives in the target's directory, so the later rename
    /// never crosses a filesystem boundary.
    pub fn stage(&mut self) -> Result<()> {
        self.expect_state("stage", TxState::BackedUp)?;
        self.check_cancelled()?;

        let tag = self.id.simple().to_string();
        for operation in &self.operations {
            let target = operation.target().to_path_buf();
            match operation {
                Operation::MergeJson { patch, .. } => {
                    let base = match ext_fs::read_json(&target) {
                        Ok(value) => value,
                        Err(e) if e.is_not_found() => Value::Object(Default::default()),
                        Err(ext_fs::Error::JsonParse { path, message }) => {
                            return Err(Error::CorruptTarget { path, message });
                        }
                        Err(e) => return Err(e.into()),
                    };
                    let merged = deep_merge(&base, patch);
                    let temp = staging_path(&target, &tag);
                    write_temp(&temp, format!("{:#}\n", merged).as_bytes())?;
                    self.staged.push(StagedFile {
                        target,
                        temp: Some(temp),
                    });
                }
                Operation::WriteFile { contents, .. } => {
                    let temp = staging_path(&target, &tag);
                    write_temp(&temp, contents)?;
                    self.staged.push(StagedFile {
                        target,
                        temp: Some(temp),
                    });
                }
                Operation::DeleteFile { .. } => {
                    self.staged.push(StagedFile { target, temp: None });
                }
            }
        }
        self.state = TxState::Staged;
        Ok(())
    }

    /// Stage 3: confirm every staged JSON file parses with an object root.
    /// A failure here aborts before any target is touched.
    pub fn validate(&mut self) -> Result<()> {
        self.expect_state("validate", TxState::Staged)?;
        self.check_cancelled()?;

        for staged in &self.staged {
            let Some(temp) = &staged.temp else { continue };
            if staged.target.extension().is_none_or(|ext| ext != "json") {
                continue;
            }
            let content = ext_fs::read_text(temp)?;
            match serde_json::from_str::<Value>(&content) {
                Ok(Value::Object(_)) => {}
                Ok(_) => {
                    return Err(Error::StagedValidation {
                        path: staged.target.clone(),
                        message: "root must be a JSON object".to_string(),
                    });
                }
                Err(e) => {
                    return Err(Error::StagedValidation {
                        path: staged.target.clone(),
                        message: e.to_string(),
                    });
                }
            }
        }
        self.state = TxState::Validated;
        Ok(())
    }

    /// Stage 4: atomically rename each staged file over its target.
    ///
    /// A failure partway returns `Err` with every completed rename recorded,
    /// so [`rollback`](Self::rollback) can restore the full set.
    pub fn commit(&mut self) -> Result<()> {
        self.expect_state("commit", TxState::Validated)?;
        self.check_cancelled()?;

        for index in 0..self.staged.len() {
            let staged = self.staged[index].clone();
            match &staged.temp {
                Some(temp) => {
                    if let Some(parent) = staged.target.parent() {
                        fs::create_dir_all(parent).map_err(|e| ext_fs::Error::io(parent, e))?;
                    }
                    fs::rename(temp, &staged.target).map_err(|e| Error::CommitFailed {
                        target: staged.target.clone(),
                        source: ext_fs::Error::io(temp, e),
                    })?;
                }
                None => {
                    if staged.target.exists() {
                        // The backup stage copied this file; restore covers it.
                        fs::remove_file(&staged.target).map_err(|e| Error::CommitFailed {
                            target: staged.target.clone(),
                            source: ext_fs::Error::io(&staged.target, e),
                        })?;
                    }
                }
            }
            self.committed.push(staged.target);
        }

        self.state = TxState::Committed;
        self.cleanup();
        tracing::info!(txn = %self.id, files = self.committed.len(), "transaction committed");
        Ok(())
    }

    /// Stage 5: discard staging leftovers and rotate backups.
    fn cleanup(&mut self) {
        for staged in &self.staged {
            if let Some(temp) = &staged.temp
                && temp.exists()
            {
                let _ = fs::remove_file(temp);
            }
        }
        for backup in &self.backups {
            if let Some(name) = backup.target.file_name().and_then(|n| n.to_str())
                && let Err(e) = self.store.prune(name)
            {
                tracing::warn!(txn = %self.id, error = %e, "backup rotation failed");
            }
        }
    }

    /// Restore every touched file from backup. Restores the full backup set:
    /// partial multi-file commits are never left observable.
    pub fn rollback(&mut self) -> Result<()> {
        let mut first_failure = None;
        for backup in &self.backups {
            if let Err(e) = self.store.restore(backup) {
                tracing::error!(
                    txn = %self.id,
                    target = %backup.target.display(),
                    error = %e,
                    "restore failed during rollback"
                );
                first_failure.get_or_insert(e);
            }
        }

        // Drop staging leftovers regardless of restore outcome
        for staged in &self.staged {
            if let Some(temp) = &staged.temp
                && temp.exists()
            {
                let _ = fs::remove_file(temp);
            }
        }

        match first_failure {
            None => {
                self.state = TxState::RolledBack;
                tracing::warn!(txn = %self.id, "transaction rolled back");
                Ok(())
            }
            Some(e) => {
                self.state = TxState::FailedUnrecoverable;
                Err(Error::Unrecoverable {
                    cause: "rollback".to_string(),
                    restore_failure: e.to_string(),
                })
            }
        }
    }

    /// Drive all stages, rolling back on the first failure.
    pub fn run(&mut self) -> Result<()> {
        let result = self
            .backup()
            .and_then(|_| self.stage())
            .and_then(|_| self.validate())
            .and_then(|_| self.commit());

        match result {
            Ok(()) => Ok(()),
            Err(cause) => {
                match self.rollback() {
                    Ok(()) => Err(cause),
                    Err(unrecoverable) => {
                        // The rollback failure supersedes the original cause
                        match unrecoverable {
                            Error::Unrecoverable {
                                restore_failure, ..
                            } => Err(Error::Unrecoverable {
                                cause: cause.to_string(),
                                restore_failure,
                            }),
                            other => Err(other),
                        }
                    }
                }
            }
        }
    }
}

fn write_temp(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| ext_fs::Error::io(parent, e))?;
    }
    fs::write(path, contents).map_err(|e| ext_fs::Error::io(path, e))?;
    Ok(())
}
