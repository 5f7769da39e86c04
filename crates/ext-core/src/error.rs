//! Error types for ext-core

use ext_meta::{ExtensionKind, Scope};

/// Result type for ext-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Orchestration faults. Per-candidate validation failures are not errors;
/// they surface in the returned [`ItemOutcome`](crate::ItemOutcome) list.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Filesystem error: {0}")]
    Fs(#[from] ext_fs::Error),

    #[error("Repository error: {0}")]
    Git(#[from] ext_git::Error),

    #[error("Discovery error: {0}")]
    Discovery(#[from] ext_discovery::Error),

    #[error("Transaction error: {0}")]
    Txn(#[from] ext_txn::Error),

    #[error("install source not found: {0}")]
    SourceNotFound(String),

    #[error("could not determine extension kind of {path}")]
    UndetectedKind { path: std::path::PathBuf },

    #[error("failed to encode configuration value: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("no {scope}-scope configuration available")]
    ScopeUnavailable { scope: Scope },

    #[error("{kind} '{name}' is not installed in {scope} scope")]
    NotInstalled {
        kind: ExtensionKind,
        name: String,
        scope: Scope,
    },

    #[error("repository '{key}' is not tracked")]
    RepositoryNotTracked { key: String },
}
