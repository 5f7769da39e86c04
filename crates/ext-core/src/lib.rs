//! Installation orchestrator for Extension Manager
//!
//! Composes the repository manager, discovery engine, validators, and the
//! transaction manager into the install / update / remove / enable / disable
//! operations. All host-configuration mutation flows through transactions;
//! nothing here writes a config file directly.

pub mod error;
pub mod orchestrator;
pub mod outcome;
pub mod prompter;
pub mod store;

pub use error::{Error, Result};
pub use orchestrator::{InstallOptions, InstallSource, Installer};
pub use outcome::{ItemOutcome, OutcomeStatus};
pub use prompter::{Candidate, HeadlessPrompter, Prompter, Selection};
pub use store::Store;
