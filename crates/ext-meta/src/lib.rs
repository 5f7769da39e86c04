//! Shared vocabulary for Extension Manager
//!
//! Leaf crate holding the types every other layer speaks: extension kinds,
//! installation scopes, validation results, and installed-extension records.

pub mod kind;
pub mod record;
pub mod scope;
pub mod validation;

pub use kind::ExtensionKind;
pub use record::ExtensionRecord;
pub use scope::Scope;
pub use validation::{Severity, ValidationIssue, ValidationResult};
