//! Installed extension records

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ExtensionKind, Scope};

/// One installed extension as recorded in the host configuration.
///
/// At most one record exists per `(scope, kind, name)`; reinstalling the same
/// extension replaces the record instead of duplicating it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtensionRecord {
    pub kind: ExtensionKind,
    pub name: String,
    /// Where the extension was installed from (local path or namespaced
    /// plugin component id).
    pub source: String,
    pub scope: Scope,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Free-form metadata extracted at discovery time (front matter fields,
    /// template variables, descriptions).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
    /// Files placed on disk for this extension.
    #[serde(default)]
    pub files: Vec<PathBuf>,
    pub installed_at: DateTime<Utc>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl ExtensionRecord {
    pub fn new(kind: ExtensionKind, name: impl Into<String>, scope: Scope) -> Self {
        Self {
            kind,
            name: name.into(),
            source: String::new(),
            scope,
            version: None,
            metadata: BTreeMap::new(),
            files: Vec::new(),
            installed_at: Utc::now(),
            enabled: true,
        }
    }

    /// Identity key within one scope.
    pub fn key(&self) -> (ExtensionKind, &str) {
        (self.kind, &self.name)
    }
}
