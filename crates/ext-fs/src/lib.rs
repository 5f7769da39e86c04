//! Filesystem layer for Extension Manager
//!
//! Provides the I/O-fault taxonomy, atomic write primitives, per-scope
//! advisory locking, and the well-known host configuration paths.

pub mod cancel;
pub mod error;
pub mod io;
pub mod lock;
pub mod paths;

pub use cancel::CancelFlag;
pub use error::{Error, Result};
pub use io::{read_json, read_text, write_atomic, write_json};
pub use lock::ScopeLock;
pub use paths::ScopePaths;
