//! Git repository manager for Extension Manager
//!
//! Wraps libgit2 for the operations the install pipeline needs: clone with
//! cleanup-on-failure, fast-forward-only update, SHA rollback, and plugin
//! structure validation. Tracked repositories persist in a TOML registry.

pub mod error;
pub mod manager;
pub mod record;
pub mod registry;

pub use error::{Error, Result};
pub use manager::{RepositoryManager, TransferProgress, UpdateStatus};
pub use record::RepositoryRecord;
pub use registry::RepositoryRegistry;
