//! Atomic configuration transactions
//!
//! The only component permitted to mutate host configuration. A transaction
//! executes an ordered batch of file/JSON mutations as one atomic unit:
//! backup, stage, validate, commit, cleanup — with full-set restoration from
//! backup on any failure. Partial multi-file commits are never a terminal
//! state.

pub mod backup;
pub mod error;
pub mod merge;
pub mod transaction;

pub use backup::{Backup, BackupStore};
pub use error::{Error, Result};
pub use merge::deep_merge;
pub use transaction::{Operation, Transaction, TransactionManager, TxState};
