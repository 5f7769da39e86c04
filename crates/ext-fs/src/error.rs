//! Error types for ext-fs

use std::path::PathBuf;

/// Result type for ext-fs operations
pub type Result<T> = std::result::Result<T, Error>;

/// Filesystem faults, with the cases callers react to differently broken out.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    #[error("disk full writing {path}")]
    DiskFull { path: PathBuf },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse JSON at {path}: {message}")]
    JsonParse { path: PathBuf, message: String },

    #[error("another operation holds the {scope} scope lock at {path}")]
    LockBusy { scope: String, path: PathBuf },

    #[error("lock acquisition failed for {path}")]
    LockFailed { path: PathBuf },

    #[error("could not determine home directory for user scope")]
    NoHomeDir,
}

impl Error {
    /// Classify an [`std::io::Error`] into the taxonomy, keeping the path.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound { path },
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            std::io::ErrorKind::StorageFull => Self::DiskFull { path },
            _ => Self::Io { path, source },
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
