//! Install / update / remove / enable / disable pipelines
//!
//! The installer acquires the scope lock, resolves the source (cloning
//! remote repositories first), discovers and validates candidates, consults
//! the prompter when the source is ambiguous, and applies every
//! configuration mutation through transactions. Batches report one outcome
//! per item; a failed item never aborts its siblings.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde_json::{Value, json};

use ext_discovery::{DiscoveryEngine, TypeDetector, validators};
use ext_fs::{CancelFlag, ScopeLock, ScopePaths};
use ext_git::{RepositoryManager, RepositoryRecord, RepositoryRegistry, UpdateStatus};
use ext_meta::{ExtensionKind, ExtensionRecord, Scope};
use ext_txn::{Operation, TransactionManager, deep_merge};

use crate::outcome::{ItemOutcome, OutcomeStatus};
use crate::prompter::{Candidate, HeadlessPrompter, Prompter, Selection};
use crate::store::{EXTENSIONS_KEY, Store, record_key};
use crate::{Error, Result};

/// What to install, as given on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallSource {
    /// A local file or directory.
    Path(PathBuf),
    /// A remote git URL.
    Remote(String),
}

impl InstallSource {
    /// Interpret a raw source string. Git URLs (HTTP(S), SSH, `.git`
    /// suffix) are remote; everything else is a local path.
    pub fn parse(raw: &str) -> Self {
        let is_remote = raw.starts_with("http://")
            || raw.starts_with("https://")
            || raw.starts_with("git@")
            || raw.starts_with("ssh://")
            || raw.ends_with(".git");
        if is_remote {
            InstallSource::Remote(raw.to_string())
        } else {
            InstallSource::Path(PathBuf::from(raw))
        }
    }
}

/// Behavior switches for an install run.
#[derive(Debug, Clone, Copy, Default)]
pub struct InstallOptions {
    /// Replace an existing same-name extension and override security-coded
    /// validation failures.
    pub force: bool,
    /// Install every candidate without consulting the prompter.
    pub install_all: bool,
}

/// Everything known about a resolved install source before selection.
struct ResolvedSource {
    /// Directory the candidates were discovered under.
    root: PathBuf,
    /// Value stored in each installed record's `source` field.
    label: String,
    /// `owner/name` registry key for remote sources.
    repo_key: Option<String>,
    /// Registry record to upsert once something installs from it.
    repo: Option<RepositoryRecord>,
    /// Whether the clone happened in this invocation.
    fresh_clone: bool,
    candidates: Vec<Candidate>,
}

/// Orchestrates the full extension lifecycle against one [`Store`].
pub struct Installer {
    store: Store,
    git: RepositoryManager,
    prompter: Box<dyn Prompter>,
    cancel: CancelFlag,
}

impl Installer {
    pub fn new(store: Store) -> Self {
        let cancel = CancelFlag::new();
        Self {
            store,
            git: RepositoryManager::new().with_cancel_flag(cancel.clone()),
            prompter: Box::new(HeadlessPrompter),
            cancel,
        }
    }

    pub fn with_prompter(mut self, prompter: Box<dyn Prompter>) -> Self {
        self.prompter = prompter;
        self
    }

    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.git = self.git.with_cancel_flag(cancel.clone());
        self.cancel = cancel;
        self
    }

    /// Replace the git layer, keeping the installer's cancel flag wired in
    /// regardless of builder order.
    pub fn with_repository_manager(mut self, git: RepositoryManager) -> Self {
        self.git = git.with_cancel_flag(self.cancel.clone());
        self
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Install extensions from `source` into `scope`.
    pub fn install(
        &self,
        source: &InstallSource,
        scope: Scope,
        options: &InstallOptions,
    ) -> Result<Vec<ItemOutcome>> {
        let paths = self.store.paths(scope)?.clone();
        let _lock = ScopeLock::acquire(scope.as_str(), &paths.lock_file())?;
        let txn = TransactionManager::new(paths.backups_dir()).with_cancel_flag(self.cancel.clone());

        let mut outcomes = Vec::new();
        let mut resolved = match source {
            InstallSource::Remote(url) => self.resolve_remote(url, &paths, &mut outcomes)?,
            InstallSource::Path(path) => self.resolve_path(path, &mut outcomes)?,
        };

        // Validation gate. Invalid candidates become failed outcomes and
        // never reach selection; force lifts only security-coded failures.
        let mut eligible = Vec::new();
        for candidate in resolved.candidates.drain(..) {
            let allowed = if options.force {
                candidate.validation.is_valid_with_force()
            } else {
                candidate.validation.is_valid()
            };
            if allowed {
                eligible.push(candidate);
            } else {
                let codes: Vec<&str> = candidate
                    .validation
                    .errors()
                    .map(|i| i.code.as_str())
                    .collect();
                outcomes.push(
                    ItemOutcome::failed(
                        &candidate.id,
                        candidate.kind,
                        &candidate.name,
                        format!("validation failed: {}", codes.join(", ")),
                    )
                    .with_validation(candidate.validation.clone()),
                );
            }
        }

        let selected = self.select(eligible, options, &mut outcomes);

        let mut installed_plugins: BTreeSet<String> = BTreeSet::new();
        for candidate in &selected {
            let outcome = match self.install_item(&paths, scope, &txn, candidate, &resolved, options)
            {
                Ok(status) => {
                    if status.is_success()
                        && let Some(plugin) = &candidate.plugin
                    {
                        installed_plugins.insert(plugin.clone());
                    }
                    ItemOutcome::new(&candidate.id, candidate.kind, &candidate.name, status)
                        .with_validation(candidate.validation.clone())
                }
                Err(e) => {
                    tracing::error!(id = %candidate.id, error = %e, "install failed");
                    ItemOutcome::failed(&candidate.id, candidate.kind, &candidate.name, e.to_string())
                }
            };
            outcomes.push(outcome);
        }

        self.finish_remote(&paths, resolved, installed_plugins)?;
        Ok(outcomes)
    }

    /// Fast-forward tracked repositories and refresh the extensions
    /// installed from them. `repo` limits the run to one `owner/name` key.
    pub fn update(&self, scope: Scope, repo: Option<&str>) -> Result<Vec<ItemOutcome>> {
        let paths = self.store.paths(scope)?.clone();
        let _lock = ScopeLock::acquire(scope.as_str(), &paths.lock_file())?;
        let registry_path = paths.repo_registry_file();
        let mut registry = RepositoryRegistry::load(&registry_path)?;

        let keys: Vec<String> = match repo {
            Some(key) => {
                if registry.get(key).is_none() {
                    return Err(Error::RepositoryNotTracked {
                        key: key.to_string(),
                    });
                }
                vec![key.to_string()]
            }
            None => registry.list().iter().map(|r| r.key()).collect(),
        };

        let txn = TransactionManager::new(paths.backups_dir()).with_cancel_flag(self.cancel.clone());
        let mut outcomes = Vec::new();
        for key in keys {
            if self.cancel.is_cancelled() {
                registry.save(&registry_path)?;
                return Err(ext_txn::Error::Cancelled.into());
            }
            let Some(record) = registry.get_mut(&key) else {
                continue;
            };
            let local_path = record.local_path.clone();
            match self.git.update(record) {
                Ok(UpdateStatus::UpToDate) => {
                    outcomes.push(ItemOutcome::skipped(&key, None, &key, "already up to date"));
                }
                Ok(UpdateStatus::Conflict { local, remote }) => {
                    outcomes.push(ItemOutcome::skipped(
                        &key,
                        None,
                        &key,
                        format!("history diverged (local {local}, remote {remote})"),
                    ));
                }
                Ok(UpdateStatus::Updated { from, to }) => {
                    tracing::info!(repo = %key, %from, %to, "repository fast-forwarded");
                    outcomes.push(ItemOutcome::new(&key, None, &key, OutcomeStatus::Updated));
                    self.refresh_components(scope, &paths, &txn, &key, &local_path, &mut outcomes)?;
                }
                Err(e) => {
                    outcomes.push(ItemOutcome::failed(&key, None, &key, e.to_string()));
                }
            }
        }
        registry.save(&registry_path)?;
        Ok(outcomes)
    }

    /// Remove one installed extension: its files, its record, and its
    /// settings entries, in a single transaction.
    pub fn remove(&self, scope: Scope, kind: ExtensionKind, name: &str) -> Result<Vec<ItemOutcome>> {
        let paths = self.store.paths(scope)?.clone();
        let _lock = ScopeLock::acquire(scope.as_str(), &paths.lock_file())?;
        let record = self
            .store
            .find(scope, kind, name)?
            .ok_or_else(|| Error::NotInstalled {
                kind,
                name: name.to_string(),
                scope,
            })?;
        let key = record_key(kind, name);

        // Key removal cannot be expressed as a merge; rewrite the documents.
        let mut config = self.store.config_doc(scope)?;
        if let Some(map) = config.get_mut(EXTENSIONS_KEY).and_then(Value::as_object_mut) {
            map.remove(&key);
        }
        if kind == ExtensionKind::Server
            && let Some(servers) = config.get_mut("servers").and_then(Value::as_object_mut)
        {
            servers.remove(name);
        }

        let settings_before = self.store.settings_doc(scope)?;
        let mut settings = settings_before.clone();
        if kind == ExtensionKind::Hook {
            let hook_name = record
                .metadata
                .get("hook_name")
                .map(String::as_str)
                .unwrap_or(name);
            strip_hook_entries(&mut settings, hook_name);
        }
        if let Some(enabled) = settings.get_mut("enabled").and_then(Value::as_object_mut) {
            enabled.remove(&key);
        }

        let mut ops: Vec<Operation> = record
            .files
            .iter()
            .map(|f| Operation::DeleteFile { target: f.clone() })
            .collect();
        ops.push(write_doc(paths.config_file(), &config));
        // A scope that never had a settings file should not gain one here.
        if settings != settings_before || paths.settings_file().is_file() {
            ops.push(write_doc(paths.settings_file(), &settings));
        }

        let txn = TransactionManager::new(paths.backups_dir()).with_cancel_flag(self.cancel.clone());
        txn.execute(ops)?;
        self.release_plugin(scope, &paths, &record)?;

        tracing::info!(%key, scope = %scope.as_str(), "extension removed");
        Ok(vec![ItemOutcome::new(
            &key,
            kind,
            name,
            OutcomeStatus::Removed,
        )])
    }

    pub fn enable(&self, scope: Scope, kind: ExtensionKind, name: &str) -> Result<Vec<ItemOutcome>> {
        self.set_enabled(scope, kind, name, true)
    }

    pub fn disable(&self, scope: Scope, kind: ExtensionKind, name: &str) -> Result<Vec<ItemOutcome>> {
        self.set_enabled(scope, kind, name, false)
    }

    fn set_enabled(
        &self,
        scope: Scope,
        kind: ExtensionKind,
        name: &str,
        enabled: bool,
    ) -> Result<Vec<ItemOutcome>> {
        let paths = self.store.paths(scope)?.clone();
        let _lock = ScopeLock::acquire(scope.as_str(), &paths.lock_file())?;
        if self.store.find(scope, kind, name)?.is_none() {
            return Err(Error::NotInstalled {
                kind,
                name: name.to_string(),
                scope,
            });
        }
        let key = record_key(kind, name);

        let ops = vec![
            Operation::MergeJson {
                target: paths.settings_file(),
                patch: obj("enabled", obj(&key, Value::Bool(enabled))),
            },
            Operation::MergeJson {
                target: paths.config_file(),
                patch: obj(EXTENSIONS_KEY, obj(&key, obj("enabled", Value::Bool(enabled)))),
            },
        ];
        let txn = TransactionManager::new(paths.backups_dir()).with_cancel_flag(self.cancel.clone());
        txn.execute(ops)?;

        let status = if enabled {
            OutcomeStatus::Enabled
        } else {
            OutcomeStatus::Disabled
        };
        Ok(vec![ItemOutcome::new(&key, kind, name, status)])
    }

    /// Clone (or reuse) a remote repository and discover its plugins.
    fn resolve_remote(
        &self,
        url: &str,
        paths: &ScopePaths,
        outcomes: &mut Vec<ItemOutcome>,
    ) -> Result<ResolvedSource> {
        let (owner, name) = ext_git::record::parse_owner_name(url)?;
        let key = format!("{owner}/{name}");
        let target = paths.repos_dir().join(&owner).join(&name);

        let registry = RepositoryRegistry::load(&paths.repo_registry_file())?;
        let (repo, fresh_clone) = match registry.get(&key) {
            Some(existing) if existing.local_path.is_dir() => (existing.clone(), false),
            _ => {
                if target.exists() {
                    tracing::warn!(target = %target.display(), "replacing untracked checkout");
                    std::fs::remove_dir_all(&target)
                        .map_err(|e| ext_fs::Error::io(&target, e))?;
                }
                (self.git.clone(url, &target)?, true)
            }
        };

        let structure = self.git.validate_structure(&repo.local_path)?;
        if !structure.is_valid() {
            if fresh_clone {
                let _ = std::fs::remove_dir_all(&repo.local_path);
            }
            return Err(Error::SourceNotFound(format!(
                "no plugin manifest found in {url}"
            )));
        }

        let root = repo.local_path.clone();
        let candidates = self.discover_candidates(&root, outcomes)?;
        Ok(ResolvedSource {
            root,
            label: url.to_string(),
            repo_key: Some(key),
            repo: Some(repo),
            fresh_clone,
            candidates,
        })
    }

    /// Resolve a local file or directory into candidates.
    fn resolve_path(
        &self,
        path: &Path,
        outcomes: &mut Vec<ItemOutcome>,
    ) -> Result<ResolvedSource> {
        if path.is_dir() {
            let candidates = self.discover_candidates(path, outcomes)?;
            if candidates.is_empty() && outcomes.is_empty() {
                return Err(Error::SourceNotFound(format!(
                    "no plugins or extensions found under {}",
                    path.display()
                )));
            }
            return Ok(ResolvedSource {
                root: path.to_path_buf(),
                label: path.display().to_string(),
                repo_key: None,
                repo: None,
                fresh_clone: false,
                candidates,
            });
        }
        if !path.is_file() {
            return Err(Error::SourceNotFound(path.display().to_string()));
        }

        let detector = TypeDetector::new();
        let kind = detector.detect(path).ok_or_else(|| Error::UndetectedKind {
            path: path.to_path_buf(),
        })?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .ok_or_else(|| Error::SourceNotFound(path.display().to_string()))?;
        let validation = validators::validate(kind, path)?;

        Ok(ResolvedSource {
            root: path.parent().unwrap_or(path).to_path_buf(),
            label: path.display().to_string(),
            repo_key: None,
            repo: None,
            fresh_clone: false,
            candidates: vec![Candidate {
                id: name.clone(),
                kind,
                name,
                path: path.to_path_buf(),
                plugin: None,
                version: None,
                validation,
            }],
        })
    }

    /// Run discovery under `root`. Plugins that failed manifest validation
    /// become failed outcomes; their siblings still contribute candidates.
    fn discover_candidates(
        &self,
        root: &Path,
        outcomes: &mut Vec<ItemOutcome>,
    ) -> Result<Vec<Candidate>> {
        let engine = DiscoveryEngine::new();
        let mut candidates = Vec::new();
        for plugin in engine.scan(root)? {
            if !plugin.is_valid() {
                let codes: Vec<&str> = plugin.validation.errors().map(|i| i.code.as_str()).collect();
                outcomes.push(
                    ItemOutcome::failed(
                        &plugin.name,
                        None,
                        &plugin.name,
                        format!("plugin manifest invalid: {}", codes.join(", ")),
                    )
                    .with_validation(plugin.validation.clone()),
                );
                continue;
            }
            let version = plugin.manifest.as_ref().and_then(|m| m.version.clone());
            for component in plugin.components {
                candidates.push(Candidate {
                    id: component.id,
                    kind: component.kind,
                    name: component.name,
                    path: component.path,
                    plugin: Some(plugin.name.clone()),
                    version: version.clone(),
                    validation: component.validation,
                });
            }
        }
        Ok(candidates)
    }

    /// Apply the selection policy: single candidates and `install_all`
    /// bypass the prompter; deselected candidates become skipped outcomes.
    fn select(
        &self,
        eligible: Vec<Candidate>,
        options: &InstallOptions,
        outcomes: &mut Vec<ItemOutcome>,
    ) -> Vec<Candidate> {
        if eligible.len() <= 1 || options.install_all {
            return eligible;
        }
        let chosen: Option<BTreeSet<usize>> = match self.prompter.select(&eligible) {
            Selection::All => return eligible,
            Selection::Indices(indices) => Some(indices.into_iter().collect()),
            Selection::None => None,
        };
        let mut selected = Vec::new();
        for (index, candidate) in eligible.into_iter().enumerate() {
            if chosen.as_ref().is_some_and(|set| set.contains(&index)) {
                selected.push(candidate);
            } else {
                outcomes.push(ItemOutcome::skipped(
                    &candidate.id,
                    candidate.kind,
                    &candidate.name,
                    "not selected",
                ));
            }
        }
        selected
    }

    /// Install one selected candidate through its own transaction.
    fn install_item(
        &self,
        paths: &ScopePaths,
        scope: Scope,
        txn: &TransactionManager,
        candidate: &Candidate,
        resolved: &ResolvedSource,
        options: &InstallOptions,
    ) -> Result<OutcomeStatus> {
        if self.cancel.is_cancelled() {
            return Err(ext_txn::Error::Cancelled.into());
        }

        // The namespaced id is the installed identity; two plugins may both
        // ship a `deploy` command without colliding.
        let existing = self.store.find(scope, candidate.kind, &candidate.id)?;
        if existing.is_some() && !options.force {
            return Ok(OutcomeStatus::Skipped {
                reason: "already installed".to_string(),
            });
        }

        let file_name = candidate
            .path
            .file_name()
            .ok_or_else(|| Error::SourceNotFound(candidate.path.display().to_string()))?;
        // Mirror the id's segments on disk: `toolkit:ops:deploy` lands at
        // `commands/toolkit/ops/deploy.md`.
        let mut dest_dir = paths.kind_dir(candidate.kind.dir_name());
        let segments: Vec<&str> = candidate.id.split(':').collect();
        for segment in &segments[..segments.len().saturating_sub(1)] {
            dest_dir = dest_dir.join(segment);
        }
        let dest = dest_dir.join(file_name);
        let contents = read_bytes(&candidate.path)?;

        let mut record = ExtensionRecord::new(candidate.kind, &candidate.id, scope);
        record.source = resolved.label.clone();
        record.version = candidate.version.clone();
        record.files = vec![dest.clone()];
        if let Some(plugin) = &candidate.plugin {
            record.metadata.insert("plugin".into(), plugin.clone());
        }
        if let Some(key) = &resolved.repo_key {
            record.metadata.insert("repository".into(), key.clone());
        }
        if let Ok(rel) = candidate.path.strip_prefix(&resolved.root) {
            record
                .metadata
                .insert("source_path".into(), rel.to_string_lossy().into_owned());
        }

        let mut ops = Vec::new();
        if let Some(old) = &existing {
            for stale in old.files.iter().filter(|f| **f != dest) {
                ops.push(Operation::DeleteFile {
                    target: stale.clone(),
                });
            }
        }
        ops.push(Operation::WriteFile {
            target: dest,
            contents: contents.clone(),
        });
        ops.extend(self.config_ops(
            paths,
            scope,
            &mut record,
            &contents,
            &candidate.path,
            existing.as_ref(),
        )?);

        txn.execute(ops)?;
        let key = record_key(candidate.kind, &candidate.id);
        tracing::info!(%key, scope = %scope.as_str(), source = %record.source, "extension installed");
        Ok(OutcomeStatus::Installed)
    }

    /// Build the config / settings mutations for one extension's content.
    ///
    /// Each target file gets at most one operation. A replacement rewrites
    /// the record wholesale so no stale fields of the old record survive a
    /// merge; a fresh install is a plain merge.
    fn config_ops(
        &self,
        paths: &ScopePaths,
        scope: Scope,
        record: &mut ExtensionRecord,
        contents: &[u8],
        source_path: &Path,
        existing: Option<&ExtensionRecord>,
    ) -> Result<Vec<Operation>> {
        let replace = existing.is_some();
        let mut ops = Vec::new();
        let mut config_patch = serde_json::Map::new();

        match record.kind {
            ExtensionKind::Hook => {
                let (hook_name, patch) = hook_settings_patch(source_path, contents)?;
                record.metadata.insert("hook_name".into(), hook_name);
                if let Some(old) = existing {
                    // The old definition may subscribe to events the new one
                    // dropped; strip its entries before applying the fresh
                    // set, and rewrite the document since a merge cannot
                    // remove them.
                    let old_name = old
                        .metadata
                        .get("hook_name")
                        .map(String::as_str)
                        .unwrap_or(&old.name);
                    let mut settings = self.store.settings_doc(scope)?;
                    strip_hook_entries(&mut settings, old_name);
                    let settings = deep_merge(&settings, &patch);
                    ops.push(write_doc(paths.settings_file(), &settings));
                } else {
                    ops.push(Operation::MergeJson {
                        target: paths.settings_file(),
                        patch,
                    });
                }
            }
            ExtensionKind::Server => {
                let definition = parse_json(source_path, contents)?;
                config_patch.insert("servers".into(), obj(&record.name, definition));
            }
            ExtensionKind::Agent | ExtensionKind::Command => {}
        }

        let key = record_key(record.kind, &record.name);
        let record_value = serde_json::to_value(&*record)?;

        if replace {
            let mut config = self.store.config_doc(scope)?;
            if !config.is_object() {
                config = Value::Object(Default::default());
            }
            for (field, value) in &config_patch {
                deep_set(&mut config, field, value.clone());
            }
            if let Some(map) = config.as_object_mut() {
                let extensions = map
                    .entry(EXTENSIONS_KEY)
                    .or_insert_with(|| Value::Object(Default::default()));
                deep_set(extensions, &key, record_value);
            }
            ops.push(write_doc(paths.config_file(), &config));
        } else {
            config_patch.insert(EXTENSIONS_KEY.into(), obj(&key, record_value));
            ops.push(Operation::MergeJson {
                target: paths.config_file(),
                patch: Value::Object(config_patch),
            });
        }
        Ok(ops)
    }

    /// Re-copy installed component files after a repository fast-forward.
    fn refresh_components(
        &self,
        scope: Scope,
        paths: &ScopePaths,
        txn: &TransactionManager,
        repo_key: &str,
        repo_root: &Path,
        outcomes: &mut Vec<ItemOutcome>,
    ) -> Result<()> {
        for record in self.store.installed(scope)? {
            if record.metadata.get("repository").map(String::as_str) != Some(repo_key) {
                continue;
            }
            let key = record_key(record.kind, &record.name);
            let Some(rel) = record.metadata.get("source_path") else {
                continue;
            };
            let source = repo_root.join(rel);
            if !source.is_file() {
                outcomes.push(ItemOutcome::skipped(
                    &key,
                    record.kind,
                    &record.name,
                    "source removed upstream",
                ));
                continue;
            }
            let Some(dest) = record.files.first() else {
                continue;
            };

            let outcome = match self.refresh_one(scope, paths, txn, &record, &source, dest) {
                Ok(()) => ItemOutcome::new(&key, record.kind, &record.name, OutcomeStatus::Updated),
                Err(e) => ItemOutcome::failed(&key, record.kind, &record.name, e.to_string()),
            };
            outcomes.push(outcome);
        }
        Ok(())
    }

    fn refresh_one(
        &self,
        scope: Scope,
        paths: &ScopePaths,
        txn: &TransactionManager,
        record: &ExtensionRecord,
        source: &Path,
        dest: &Path,
    ) -> Result<()> {
        let contents = read_bytes(source)?;
        let mut ops = vec![Operation::WriteFile {
            target: dest.to_path_buf(),
            contents: contents.clone(),
        }];
        match record.kind {
            ExtensionKind::Hook => {
                let (hook_name, patch) = hook_settings_patch(source, &contents)?;
                // Entries registered by the previous version stay unless
                // stripped; the upstream definition may have changed events
                // or even its name.
                let old_name = record
                    .metadata
                    .get("hook_name")
                    .map(String::as_str)
                    .unwrap_or(&record.name);
                let mut settings = self.store.settings_doc(scope)?;
                strip_hook_entries(&mut settings, old_name);
                let settings = deep_merge(&settings, &patch);
                ops.push(write_doc(paths.settings_file(), &settings));
                if hook_name != old_name {
                    let key = record_key(record.kind, &record.name);
                    ops.push(Operation::MergeJson {
                        target: paths.config_file(),
                        patch: obj(
                            EXTENSIONS_KEY,
                            obj(&key, obj("metadata", obj("hook_name", json!(hook_name)))),
                        ),
                    });
                }
            }
            ExtensionKind::Server => {
                let definition = parse_json(source, &contents)?;
                ops.push(Operation::MergeJson {
                    target: paths.config_file(),
                    patch: obj("servers", obj(&record.name, definition)),
                });
            }
            ExtensionKind::Agent | ExtensionKind::Command => {}
        }
        txn.execute(ops)?;
        Ok(())
    }

    /// Persist the registry after a remote install, or drop an unused fresh
    /// clone when nothing was installed from it.
    fn finish_remote(
        &self,
        paths: &ScopePaths,
        resolved: ResolvedSource,
        installed_plugins: BTreeSet<String>,
    ) -> Result<()> {
        let Some(mut repo) = resolved.repo else {
            return Ok(());
        };
        if installed_plugins.is_empty() {
            if resolved.fresh_clone {
                let _ = std::fs::remove_dir_all(&repo.local_path);
            }
            return Ok(());
        }
        repo.plugins.extend(installed_plugins);
        let registry_path = paths.repo_registry_file();
        let mut registry = RepositoryRegistry::load(&registry_path)?;
        registry.upsert(repo);
        registry.save(&registry_path)?;
        Ok(())
    }

    /// Drop the removed extension's plugin from the registry; the record
    /// (and its checkout) go away with the last plugin.
    fn release_plugin(
        &self,
        scope: Scope,
        paths: &ScopePaths,
        record: &ExtensionRecord,
    ) -> Result<()> {
        let (Some(repo_key), Some(plugin)) = (
            record.metadata.get("repository"),
            record.metadata.get("plugin"),
        ) else {
            return Ok(());
        };
        let still_used = self.store.installed(scope)?.iter().any(|r| {
            r.metadata.get("repository") == Some(repo_key) && r.metadata.get("plugin") == Some(plugin)
        });
        if still_used {
            return Ok(());
        }

        let registry_path = paths.repo_registry_file();
        let mut registry = RepositoryRegistry::load(&registry_path)?;
        if let Some(dropped) = registry.remove_plugin(repo_key, plugin) {
            tracing::info!(repo = %repo_key, "last plugin removed; dropping checkout");
            if let Err(e) = std::fs::remove_dir_all(&dropped.local_path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(
                        path = %dropped.local_path.display(),
                        error = %e,
                        "failed to remove checkout"
                    );
                }
            }
        }
        registry.save(&registry_path)?;
        Ok(())
    }
}

fn read_bytes(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| ext_fs::Error::io(path, e).into())
}

fn parse_json(path: &Path, contents: &[u8]) -> Result<Value> {
    serde_json::from_slice(contents).map_err(|e| {
        ext_fs::Error::JsonParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        }
        .into()
    })
}

/// Serialize a document the same way staged merges are written.
fn write_doc(target: PathBuf, doc: &Value) -> Operation {
    Operation::WriteFile {
        target,
        contents: format!("{doc:#}\n").into_bytes(),
    }
}

/// Single-key JSON object.
fn obj(key: &str, value: Value) -> Value {
    let mut map = serde_json::Map::new();
    map.insert(key.to_string(), value);
    Value::Object(map)
}

/// Set `key` inside an object value, coping with a non-object by replacing.
fn deep_set(doc: &mut Value, key: &str, value: Value) {
    if !doc.is_object() {
        *doc = Value::Object(Default::default());
    }
    if let Some(map) = doc.as_object_mut() {
        map.insert(key.to_string(), value);
    }
}

/// Build the `settings.json` patch for a hook definition: one entry per
/// subscribed event, keyed by the hook's declared name so a reinstall
/// replaces the previous entry.
fn hook_settings_patch(path: &Path, contents: &[u8]) -> Result<(String, Value)> {
    let doc = parse_json(path, contents)?;
    let name = doc
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| ext_fs::Error::JsonParse {
            path: path.to_path_buf(),
            message: "hook definition has no name".to_string(),
        })?
        .to_string();
    let commands = doc.get("commands").cloned().unwrap_or(Value::Array(Vec::new()));
    let entry = json!({ "name": &name, "commands": commands });

    let mut events = serde_json::Map::new();
    if let Some(list) = doc.get("eventTypes").and_then(Value::as_array) {
        for event in list.iter().filter_map(Value::as_str) {
            events.insert(event.to_string(), json!([entry.clone()]));
        }
    }
    Ok((name, json!({ "hooks": events })))
}

/// Remove every hook entry named `hook_name` from each event list.
fn strip_hook_entries(settings: &mut Value, hook_name: &str) {
    let Some(hooks) = settings.get_mut("hooks").and_then(Value::as_object_mut) else {
        return;
    };
    for (_, entries) in hooks.iter_mut() {
        if let Some(list) = entries.as_array_mut() {
            list.retain(|entry| entry.get("name").and_then(Value::as_str) != Some(hook_name));
        }
    }
    hooks.retain(|_, entries| entries.as_array().is_none_or(|list| !list.is_empty()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_source_parsing() {
        assert_eq!(
            InstallSource::parse("https://github.com/acme/toolkit.git"),
            InstallSource::Remote("https://github.com/acme/toolkit.git".into())
        );
        assert_eq!(
            InstallSource::parse("git@github.com:acme/toolkit.git"),
            InstallSource::Remote("git@github.com:acme/toolkit.git".into())
        );
        assert_eq!(
            InstallSource::parse("./plugins/toolkit"),
            InstallSource::Path(PathBuf::from("./plugins/toolkit"))
        );
    }

    #[test]
    fn test_hook_settings_patch_one_entry_per_event() {
        let contents = br#"{
            "name": "fmt",
            "eventTypes": ["PreToolUse", "PostToolUse"],
            "commands": ["cargo fmt"]
        }"#;
        let (name, patch) = hook_settings_patch(Path::new("fmt.json"), contents).unwrap();
        assert_eq!(name, "fmt");
        assert_eq!(
            patch["hooks"]["PreToolUse"],
            json!([{ "name": "fmt", "commands": ["cargo fmt"] }])
        );
        assert_eq!(
            patch["hooks"]["PostToolUse"],
            json!([{ "name": "fmt", "commands": ["cargo fmt"] }])
        );
    }

    #[test]
    fn test_strip_hook_entries_drops_empty_events() {
        let mut settings = json!({
            "hooks": {
                "PreToolUse": [
                    { "name": "fmt", "commands": ["cargo fmt"] },
                    { "name": "lint", "commands": ["cargo clippy"] }
                ],
                "Stop": [{ "name": "fmt", "commands": ["cargo fmt"] }]
            }
        });
        strip_hook_entries(&mut settings, "fmt");
        assert_eq!(
            settings,
            json!({
                "hooks": {
                    "PreToolUse": [{ "name": "lint", "commands": ["cargo clippy"] }]
                }
            })
        );
    }

    #[test]
    fn test_builder_order_keeps_manager_settings() {
        let timeout = std::time::Duration::from_secs(7);
        let store = Store::new(ScopePaths::at("/tmp/agent-home/.agent"), None);
        let installer = Installer::new(store)
            .with_repository_manager(RepositoryManager::new().with_timeout(timeout))
            .with_cancel_flag(CancelFlag::new());
        assert_eq!(installer.git.timeout(), timeout);
    }

    #[test]
    fn test_deep_set_replaces_non_object() {
        let mut doc = json!("scalar");
        deep_set(&mut doc, "a", json!(1));
        assert_eq!(doc, json!({ "a": 1 }));
    }
}
