//! Per-kind extension validators
//!
//! Contract: `validate(path) -> Result<ValidationResult>`. Malformed content
//! lands inside the returned [`ValidationResult`]; only genuine I/O faults
//! (file vanished, permission denied) become `Err`. One bad candidate never
//! aborts its siblings.

pub mod agent;
pub mod command;
pub mod hook;
pub mod security;
pub mod server;

use std::path::Path;

use ext_meta::{ExtensionKind, ValidationResult};

use crate::Result;

/// Validate one candidate file as the given kind.
pub fn validate(kind: ExtensionKind, path: &Path) -> Result<ValidationResult> {
    match kind {
        ExtensionKind::Hook => hook::validate(path),
        ExtensionKind::Server => server::validate(path),
        ExtensionKind::Agent => agent::validate(path),
        ExtensionKind::Command => command::validate(path),
    }
}

/// Validate many candidates, pairing each path with its result. An I/O fault
/// on one path is recorded as its result and never aborts the rest.
pub fn validate_many<'a>(
    candidates: impl IntoIterator<Item = (ExtensionKind, &'a Path)>,
) -> Vec<(&'a Path, ValidationResult)> {
    candidates
        .into_iter()
        .map(|(kind, path)| {
            let result = match validate(kind, path) {
                Ok(result) => result,
                Err(e) => ValidationResult::invalid("IO_FAULT", e.to_string()),
            };
            (path, result)
        })
        .collect()
}
