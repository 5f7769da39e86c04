//! Error types for ext-git

use std::path::PathBuf;

/// Result type for ext-git operations
pub type Result<T> = std::result::Result<T, Error>;

/// Repository faults. Divergent history is not an error — `update` reports it
/// as [`UpdateStatus::Conflict`](crate::UpdateStatus).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    #[error("Filesystem error: {0}")]
    Fs(#[from] ext_fs::Error),

    #[error("authentication failed for {url}")]
    AuthFailed { url: String },

    #[error("network failure talking to {url}: {message}")]
    Network { url: String, message: String },

    #[error("repository not found: {url}")]
    RepositoryNotFound { url: String },

    #[error("git operation against {url} exceeded {seconds}s timeout")]
    Timeout { url: String, seconds: u64 },

    #[error("git operation against {url} was cancelled")]
    Cancelled { url: String },

    #[error("cannot derive owner/name from remote URL: {url}")]
    InvalidRemote { url: String },

    #[error("commit {sha} not found in {path}")]
    CommitNotFound { sha: String, path: PathBuf },

    #[error("failed to parse repository registry at {path}: {message}")]
    RegistryParse { path: PathBuf, message: String },

    #[error("failed to serialize repository registry: {0}")]
    RegistrySerialize(String),
}
