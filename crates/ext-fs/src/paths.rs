//! Well-known host configuration paths
//!
//! The host application keeps its configuration under `.agent/` — in the
//! user's home directory for user scope, in the project root for project
//! scope. All path resolution goes through [`ScopePaths`]; nothing else in
//! the workspace hardcodes these locations.

use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// Directory name of the host configuration tree.
pub const CONFIG_DIR_NAME: &str = ".agent";
/// Hook definitions and per-extension enablement.
pub const SETTINGS_FILE: &str = "settings.json";
/// Servers, installed extension records, tracked repositories.
pub const CONFIG_FILE: &str = "config.json";
/// Canonical plugin manifest filename at a plugin root.
pub const MANIFEST_FILENAME: &str = "plugin.json";

/// Resolved filesystem layout for one installation scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopePaths {
    root: PathBuf,
}

impl ScopePaths {
    /// Layout rooted at an explicit directory (the `.agent` directory itself).
    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// User-scope layout under the home directory.
    pub fn user() -> Result<Self> {
        let home = dirs::home_dir().ok_or(Error::NoHomeDir)?;
        Ok(Self::at(home.join(CONFIG_DIR_NAME)))
    }

    /// Project-scope layout under a project root.
    pub fn project(project_root: &Path) -> Self {
        Self::at(project_root.join(CONFIG_DIR_NAME))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn settings_file(&self) -> PathBuf {
        self.root.join(SETTINGS_FILE)
    }

    pub fn config_file(&self) -> PathBuf {
        self.root.join(CONFIG_FILE)
    }

    /// Directory where installed extension files of one kind are placed,
    /// e.g. `.agent/hooks/`.
    pub fn kind_dir(&self, kind_dir_name: &str) -> PathBuf {
        self.root.join(kind_dir_name)
    }

    /// Directory holding cloned plugin repositories.
    pub fn repos_dir(&self) -> PathBuf {
        self.root.join("repos")
    }

    /// Registry of tracked repositories.
    pub fn repo_registry_file(&self) -> PathBuf {
        self.root.join("repositories.toml")
    }

    /// Directory holding transaction backups.
    pub fn backups_dir(&self) -> PathBuf {
        self.root.join("backups")
    }

    /// Advisory lock file serializing transactions in this scope.
    pub fn lock_file(&self) -> PathBuf {
        self.root.join(".scope.lock")
    }
}
