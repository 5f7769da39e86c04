//! Error types for ext-discovery

use std::path::PathBuf;

/// Result type for ext-discovery operations
pub type Result<T> = std::result::Result<T, Error>;

/// Genuine faults only. Malformed content is reported through
/// [`ValidationResult`](ext_meta::ValidationResult), never through `Err`.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Filesystem error: {0}")]
    Fs(#[from] ext_fs::Error),

    #[error("failed to parse plugin manifest at {path}: {message}")]
    ManifestParse { path: PathBuf, message: String },
}
