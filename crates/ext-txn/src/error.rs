//! Error types for ext-txn

use std::path::PathBuf;

/// Result type for ext-txn operations
pub type Result<T> = std::result::Result<T, Error>;

/// Transaction faults. Any of these (except `Unrecoverable`) means the
/// transaction rolled back and every touched file matches its
/// pre-transaction content.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Filesystem error: {0}")]
    Fs(#[from] ext_fs::Error),

    #[error("target {path} holds invalid JSON and cannot be merged: {message}")]
    CorruptTarget { path: PathBuf, message: String },

    #[error("staged file {path} failed validation: {message}")]
    StagedValidation { path: PathBuf, message: String },

    #[error("commit of {target} failed: {source}")]
    CommitFailed {
        target: PathBuf,
        #[source]
        source: ext_fs::Error,
    },

    #[error("transaction step {step} called in state {state}")]
    InvalidState { step: &'static str, state: String },

    #[error("transaction cancelled")]
    Cancelled,

    /// Restore from backup itself failed. The on-disk state is unknown and
    /// requires manual intervention; backups remain in the backup directory.
    #[error(
        "UNRECOVERABLE: rollback failed after '{cause}': {restore_failure}; \
         restore manually from the backup directory"
    )]
    Unrecoverable {
        cause: String,
        restore_failure: String,
    },
}
