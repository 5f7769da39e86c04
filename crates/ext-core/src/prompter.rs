//! Selection capability for multi-candidate installs
//!
//! The interactive UI is an external collaborator; the orchestrator only
//! sees this synchronous trait. The headless default rejects ambiguous
//! multi-candidate sources so batch runs stay deterministic.

use std::path::PathBuf;

use ext_meta::{ExtensionKind, ValidationResult};

/// One installable candidate offered for selection.
#[derive(Debug, Clone)]
pub struct Candidate {
    /// Namespaced id for plugin components, file stem for loose files.
    pub id: String,
    pub kind: ExtensionKind,
    pub name: String,
    pub path: PathBuf,
    /// Name of the plugin this candidate came from, if any.
    pub plugin: Option<String>,
    /// Version of the owning plugin's manifest, if declared.
    pub version: Option<String>,
    pub validation: ValidationResult,
}

/// A selection decision over the offered candidate list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Install every offered candidate.
    All,
    /// Install the candidates at these indices.
    Indices(Vec<usize>),
    /// Install nothing.
    None,
}

/// Synchronous selection capability injected into the orchestrator.
pub trait Prompter {
    /// Choose among installable candidates. Only called when more than one
    /// candidate is on offer and no blanket install-all option is set.
    fn select(&self, candidates: &[Candidate]) -> Selection;
}

/// Non-interactive default: ambiguous multi-candidate sources are rejected.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeadlessPrompter;

impl Prompter for HeadlessPrompter {
    fn select(&self, candidates: &[Candidate]) -> Selection {
        tracing::warn!(
            candidates = candidates.len(),
            "multiple candidates and no selection UI; rejecting"
        );
        Selection::None
    }
}
