//! Deterministic extension type detection
//!
//! Three tiers, each short-circuiting the next:
//! 1. explicit declaration from a project descriptor (always wins),
//! 2. directory convention (path under a kind-named directory),
//! 3. content keyword heuristic over a fixed ordered signature table.
//!
//! The signature table is a literal slice, so given identical input the
//! detector returns the identical kind on every invocation.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use ext_meta::ExtensionKind;

/// Content signature tokens per kind, in tie-break priority order
/// (hook > server > agent > command).
const SIGNATURES: [(ExtensionKind, &[&str]); 4] = [
    (
        ExtensionKind::Hook,
        &["\"eventTypes\"", "PreToolUse", "PostToolUse", "UserPromptSubmit"],
    ),
    (
        ExtensionKind::Server,
        &["mcpServers", "\"command\"", "\"args\"", "stdio"],
    ),
    (
        ExtensionKind::Agent,
        &["description:", "tools:", "permissions:"],
    ),
    (
        ExtensionKind::Command,
        &["## Usage", "## Parameters", "argument-hint"],
    ),
];

/// Hierarchical extension-kind classifier.
#[derive(Debug, Clone, Default)]
pub struct TypeDetector {
    /// Exact path to kind mappings from an external project descriptor.
    declarations: BTreeMap<PathBuf, ExtensionKind>,
}

impl TypeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_declarations(declarations: BTreeMap<PathBuf, ExtensionKind>) -> Self {
        Self { declarations }
    }

    /// Declare an exact path's kind (tier 1).
    pub fn declare(&mut self, path: impl Into<PathBuf>, kind: ExtensionKind) {
        self.declarations.insert(path.into(), kind);
    }

    /// Resolve the kind of a candidate path, or `None` when no tier matches.
    pub fn detect(&self, path: &Path) -> Option<ExtensionKind> {
        if let Some(kind) = self.declarations.get(path) {
            return Some(*kind);
        }
        if let Some(kind) = detect_by_directory(path) {
            return Some(kind);
        }
        detect_by_content(path)
    }
}

/// Tier 2: nearest ancestor directory with a kind-conventional name wins.
fn detect_by_directory(path: &Path) -> Option<ExtensionKind> {
    path.ancestors()
        .skip(1)
        .filter_map(|dir| dir.file_name())
        .filter_map(|name| name.to_str())
        .find_map(ExtensionKind::from_dir_name)
}

/// Tier 3: first kind in the fixed signature table with any token present in
/// the file content. Unreadable files simply fail to match.
fn detect_by_content(path: &Path) -> Option<ExtensionKind> {
    let content = std::fs::read_to_string(path).ok()?;
    SIGNATURES
        .iter()
        .find(|(_, tokens)| tokens.iter().any(|token| content.contains(token)))
        .map(|(kind, _)| *kind)
}
