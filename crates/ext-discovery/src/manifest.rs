//! Plugin manifest parsing for `plugin.json` files.
//!
//! A plugin manifest sits at the root of each plugin directory inside a
//! repository. The canonical filename is
//! [`MANIFEST_FILENAME`](ext_fs::paths::MANIFEST_FILENAME) (`plugin.json`).
//!
//! # Example JSON
//!
//! ```json
//! {
//!   "name": "deploy-toolkit",
//!   "version": "1.2.0",
//!   "description": "Deployment hooks and commands",
//!   "author": "Acme",
//!   "components": {
//!     "commands": "custom-commands"
//!   }
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use ext_meta::{ValidationIssue, ValidationResult};

use crate::error::{Error, Result};

/// Plugin manifest loaded from `plugin.json`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PluginManifest {
    /// Plugin name; alphanumeric, hyphen, and underscore only.
    pub name: String,
    /// Semver version string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// Per-kind component directory overrides, relative to the plugin root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub components: Option<ComponentDirs>,
}

/// Overrides for the conventional component directory names.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ComponentDirs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hooks: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub servers: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agents: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commands: Option<String>,
}

impl PluginManifest {
    /// Load and parse a manifest file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = ext_fs::read_text(path)?;
        serde_json::from_str(&content).map_err(|e| Error::ManifestParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Schema-level validation beyond what serde enforces.
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::ok();

        if self.name.is_empty() {
            result.push(ValidationIssue::error(
                "MANIFEST_MISSING_NAME",
                "plugin manifest requires a non-empty name",
            ));
        } else if !self
            .name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            result.push(
                ValidationIssue::error(
                    "MANIFEST_INVALID_NAME",
                    format!(
                        "plugin name '{}' may only contain alphanumerics, hyphens, and underscores",
                        self.name
                    ),
                )
                .with_fix("rename the plugin to match [A-Za-z0-9_-]+"),
            );
        }

        if let Some(version) = &self.version
            && semver::Version::parse(version).is_err()
        {
            result.push(ValidationIssue::warning(
                "MANIFEST_NON_SEMVER_VERSION",
                format!("version '{version}' is not a semver string"),
            ));
        }

        result
    }
}
