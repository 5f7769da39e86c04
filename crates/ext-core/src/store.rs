//! Explicit configuration store
//!
//! Holds the resolved scope layouts and reads installed-extension state from
//! the host config files. The store never writes: every mutation goes
//! through a transaction built by the orchestrator.

use std::path::Path;

use serde_json::Value;

use ext_fs::ScopePaths;
use ext_meta::{ExtensionKind, ExtensionRecord, Scope};

use crate::{Error, Result};

/// Key of the installed-extension map inside `config.json`.
pub const EXTENSIONS_KEY: &str = "extensions";

/// Resolved configuration roots for the scopes this invocation can target.
#[derive(Debug, Clone)]
pub struct Store {
    user: ScopePaths,
    project: Option<ScopePaths>,
}

impl Store {
    pub fn new(user: ScopePaths, project: Option<ScopePaths>) -> Self {
        Self { user, project }
    }

    /// Store for the current user plus a project root.
    pub fn for_project(project_root: &Path) -> Result<Self> {
        Ok(Self {
            user: ScopePaths::user()?,
            project: Some(ScopePaths::project(project_root)),
        })
    }

    pub fn paths(&self, scope: Scope) -> Result<&ScopePaths> {
        match scope {
            Scope::User => Ok(&self.user),
            Scope::Project => self
                .project
                .as_ref()
                .ok_or(Error::ScopeUnavailable { scope }),
        }
    }

    /// The `config.json` document for a scope; a missing file is an empty
    /// object.
    pub fn config_doc(&self, scope: Scope) -> Result<Value> {
        let path = self.paths(scope)?.config_file();
        match ext_fs::read_json(&path) {
            Ok(value) => Ok(value),
            Err(e) if e.is_not_found() => Ok(Value::Object(Default::default())),
            Err(e) => Err(e.into()),
        }
    }

    /// The `settings.json` document for a scope; a missing file is an empty
    /// object.
    pub fn settings_doc(&self, scope: Scope) -> Result<Value> {
        let path = self.paths(scope)?.settings_file();
        match ext_fs::read_json(&path) {
            Ok(value) => Ok(value),
            Err(e) if e.is_not_found() => Ok(Value::Object(Default::default())),
            Err(e) => Err(e.into()),
        }
    }

    /// All installed extension records in a scope, sorted by record key.
    pub fn installed(&self, scope: Scope) -> Result<Vec<ExtensionRecord>> {
        let doc = self.config_doc(scope)?;
        let Some(map) = doc.get(EXTENSIONS_KEY).and_then(Value::as_object) else {
            return Ok(Vec::new());
        };

        let mut records = Vec::new();
        for (key, value) in map {
            match serde_json::from_value::<ExtensionRecord>(value.clone()) {
                Ok(record) => records.push(record),
                Err(e) => {
                    tracing::warn!(%key, error = %e, "skipping unreadable extension record");
                }
            }
        }
        records.sort_by(|a, b| record_key_of(a).cmp(&record_key_of(b)));
        Ok(records)
    }

    /// Look up one installed extension.
    pub fn find(
        &self,
        scope: Scope,
        kind: ExtensionKind,
        name: &str,
    ) -> Result<Option<ExtensionRecord>> {
        Ok(self
            .installed(scope)?
            .into_iter()
            .find(|r| r.kind == kind && r.name == name))
    }
}

/// Stable `kind:name` key used in the `config.json` extension map. Keying by
/// kind and name together enforces the one-record-per-(scope, kind, name)
/// invariant.
pub fn record_key(kind: ExtensionKind, name: &str) -> String {
    format!("{kind}:{name}")
}

fn record_key_of(record: &ExtensionRecord) -> String {
    record_key(record.kind, &record.name)
}
