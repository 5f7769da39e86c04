//! Plugin discovery engine
//!
//! Walks a filesystem tree (a local directory or a freshly cloned
//! repository), locates plugin manifests, and produces namespaced component
//! records. A malformed manifest is a per-plugin validation error and never
//! aborts sibling plugins.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use ext_fs::paths::MANIFEST_FILENAME;
use ext_meta::{ExtensionKind, ValidationIssue, ValidationResult};

use crate::manifest::PluginManifest;
use crate::{Error, Result, TypeDetector, frontmatter, validators};

static TEMPLATE_VAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").unwrap());

/// One discovered plugin component.
#[derive(Debug, Clone)]
pub struct ComponentInfo {
    /// Structural namespaced identifier, `plugin[:subdir...]:component`.
    pub id: String,
    pub kind: ExtensionKind,
    /// Leaf component name (file stem).
    pub name: String,
    pub path: PathBuf,
    /// Front-matter fields or JSON name/description metadata.
    pub metadata: BTreeMap<String, String>,
    /// `${VAR}` template variables referenced by the component file.
    pub template_vars: Vec<String>,
    pub validation: ValidationResult,
}

/// One discovered plugin with its components.
#[derive(Debug, Clone)]
pub struct PluginInfo {
    pub name: String,
    pub root: PathBuf,
    /// Absent when the manifest failed to parse.
    pub manifest: Option<PluginManifest>,
    /// Manifest-level findings, including parse failures.
    pub validation: ValidationResult,
    pub components: Vec<ComponentInfo>,
}

impl PluginInfo {
    pub fn is_valid(&self) -> bool {
        self.validation.is_valid()
    }
}

/// Build the structural namespaced identifier for a component.
///
/// `rel_path` is relative to the component-kind directory; subdirectories
/// become namespace segments, so two plugins can never produce a colliding
/// identifier even with identical leaf file names.
pub fn namespaced_id(plugin: &str, rel_path: &Path) -> String {
    let mut segments = vec![plugin.to_string()];
    if let Some(parent) = rel_path.parent() {
        for component in parent.components() {
            segments.push(component.as_os_str().to_string_lossy().into_owned());
        }
    }
    let stem = rel_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    segments.push(stem);
    segments.join(":")
}

/// Scans filesystem trees for installable plugins.
#[derive(Debug, Clone, Default)]
pub struct DiscoveryEngine {
    detector: TypeDetector,
}

impl DiscoveryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_detector(detector: TypeDetector) -> Self {
        Self { detector }
    }

    /// Discover every plugin beneath `root`, sorted by plugin name.
    pub fn scan(&self, root: &Path) -> Result<Vec<PluginInfo>> {
        let mut manifest_paths = Vec::new();
        find_manifests(root, &mut manifest_paths)?;
        manifest_paths.sort();

        let mut plugins = Vec::new();
        for manifest_path in manifest_paths {
            plugins.push(self.scan_plugin(&manifest_path)?);
        }
        plugins.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(plugins)
    }

    fn scan_plugin(&self, manifest_path: &Path) -> Result<PluginInfo> {
        let plugin_root = manifest_path
            .parent()
            .unwrap_or(manifest_path)
            .to_path_buf();
        let dir_name = plugin_root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let manifest = match PluginManifest::load(manifest_path) {
            Ok(manifest) => manifest,
            Err(Error::ManifestParse { message, .. }) => {
                tracing::warn!(plugin = %dir_name, %message, "skipping plugin with malformed manifest");
                return Ok(PluginInfo {
                    name: dir_name,
                    root: plugin_root,
                    manifest: None,
                    validation: ValidationResult::invalid("MANIFEST_PARSE", message),
                    components: Vec::new(),
                });
            }
            Err(e) => return Err(e),
        };

        let validation = manifest.validate();
        if !validation.is_valid() {
            return Ok(PluginInfo {
                name: manifest.name.clone(),
                root: plugin_root,
                manifest: Some(manifest),
                validation,
                components: Vec::new(),
            });
        }

        let mut components = Vec::new();
        for kind in ExtensionKind::ALL {
            let dir = plugin_root.join(component_dir(&manifest, kind));
            if !dir.is_dir() {
                continue;
            }
            self.scan_component_dir(&manifest.name, kind, &dir, &mut components)?;
        }
        components.sort_by(|a, b| a.id.cmp(&b.id));

        tracing::debug!(
            plugin = %manifest.name,
            components = components.len(),
            "discovered plugin"
        );
        Ok(PluginInfo {
            name: manifest.name.clone(),
            root: plugin_root,
            manifest: Some(manifest),
            validation,
            components,
        })
    }

    fn scan_component_dir(
        &self,
        plugin: &str,
        kind: ExtensionKind,
        dir: &Path,
        out: &mut Vec<ComponentInfo>,
    ) -> Result<()> {
        let mut files = Vec::new();
        collect_files(dir, &mut files)?;
        files.sort();

        for path in files {
            // Tier-2 convention already places the file under a kind
            // directory; an explicit declaration may still override it.
            let detected = self.detector.detect(&path).unwrap_or(kind);
            let rel = path.strip_prefix(dir).unwrap_or(&path);

            let validation = match validators::validate(detected, &path) {
                Ok(result) => result,
                Err(crate::Error::Fs(e)) if e.is_not_found() => continue,
                Err(e) => return Err(e),
            };

            out.push(ComponentInfo {
                id: namespaced_id(plugin, rel),
                kind: detected,
                name: rel
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                path: path.clone(),
                metadata: extract_metadata(&path, detected),
                template_vars: extract_template_vars(&path),
                validation,
            });
        }
        Ok(())
    }
}

fn component_dir(manifest: &PluginManifest, kind: ExtensionKind) -> String {
    let overrides = manifest.components.as_ref();
    let custom = overrides.and_then(|dirs| match kind {
        ExtensionKind::Hook => dirs.hooks.clone(),
        ExtensionKind::Server => dirs.servers.clone(),
        ExtensionKind::Agent => dirs.agents.clone(),
        ExtensionKind::Command => dirs.commands.clone(),
    });
    custom.unwrap_or_else(|| kind.dir_name().to_string())
}

/// Front-matter fields for Markdown kinds; `name`/`description` for JSON kinds.
fn extract_metadata(path: &Path, kind: ExtensionKind) -> BTreeMap<String, String> {
    let Ok(content) = fs::read_to_string(path) else {
        return BTreeMap::new();
    };
    match kind {
        ExtensionKind::Agent | ExtensionKind::Command => frontmatter::split(&content)
            .and_then(|(yaml, _)| frontmatter::parse_fields(yaml))
            .unwrap_or_default(),
        ExtensionKind::Hook | ExtensionKind::Server => {
            let Ok(value) = serde_json::from_str::<serde_json::Value>(&content) else {
                return BTreeMap::new();
            };
            let mut fields = BTreeMap::new();
            for key in ["name", "description"] {
                if let Some(s) = value.get(key).and_then(serde_json::Value::as_str) {
                    fields.insert(key.to_string(), s.to_string());
                }
            }
            fields
        }
    }
}

/// Distinct `${VAR}` references in file order.
fn extract_template_vars(path: &Path) -> Vec<String> {
    let Ok(content) = fs::read_to_string(path) else {
        return Vec::new();
    };
    let mut vars = Vec::new();
    for capture in TEMPLATE_VAR_RE.captures_iter(&content) {
        let name = capture[1].to_string();
        if !vars.contains(&name) {
            vars.push(name);
        }
    }
    vars
}

fn find_manifests(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    let entries = fs::read_dir(dir).map_err(|e| ext_fs::Error::io(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| ext_fs::Error::io(dir, e))?;
        let path = entry.path();
        if path.is_dir() {
            if path.file_name().is_some_and(|n| n == ".git") {
                continue;
            }
            find_manifests(&path, out)?;
        } else if path.file_name().is_some_and(|n| n == MANIFEST_FILENAME) {
            out.push(path);
        }
    }
    Ok(())
}

fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    let entries = fs::read_dir(dir).map_err(|e| ext_fs::Error::io(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| ext_fs::Error::io(dir, e))?;
        let path = entry.path();
        if path.is_dir() {
            collect_files(&path, out)?;
        } else {
            out.push(path);
        }
    }
    Ok(())
}
