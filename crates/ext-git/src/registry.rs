//! Persistent registry of tracked repositories
//!
//! Persisted as a TOML file with file locking: shared lock for reads,
//! exclusive lock plus write-to-temp-then-rename for saves, so concurrent
//! invocations never observe a torn registry.

use std::fs::{self, File, OpenOptions};
use std::io::Read;
use std::path::Path;

use fs2::FileExt;
use serde::{Deserialize, Serialize};

use crate::record::RepositoryRecord;
use crate::{Error, Result};

/// Registry of all tracked plugin repositories, keyed by `owner/name`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepositoryRegistry {
    /// Registry format version for forward compatibility
    version: String,
    repositories: Vec<RepositoryRecord>,
}

impl RepositoryRegistry {
    pub fn new() -> Self {
        Self {
            version: "1.0".to_string(),
            repositories: Vec::new(),
        }
    }

    /// Load the registry, taking a shared lock for the duration of the read.
    /// A missing file is an empty registry.
    pub fn load(path: &Path) -> Result<Self> {
        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::new()),
            Err(e) => return Err(ext_fs::Error::io(path, e).into()),
        };
        file.lock_shared().map_err(|e| ext_fs::Error::io(path, e))?;

        // Read through the locked handle to avoid a TOCTOU race
        let mut content = String::new();
        (&file)
            .read_to_string(&mut content)
            .map_err(|e| ext_fs::Error::io(path, e))?;

        toml::from_str(&content).map_err(|e| Error::RegistryParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Save atomically under an exclusive lock.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| Error::RegistrySerialize(e.to_string()))?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ext_fs::Error::io(parent, e))?;
        }

        let lock_file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|e| ext_fs::Error::io(path, e))?;
        lock_file
            .lock_exclusive()
            .map_err(|e| ext_fs::Error::io(path, e))?;

        let temp_path = path.with_extension("toml.tmp");
        fs::write(&temp_path, &content).map_err(|e| ext_fs::Error::io(&temp_path, e))?;
        fs::rename(&temp_path, path).map_err(|e| ext_fs::Error::io(path, e))?;

        // Lock released when lock_file is dropped
        Ok(())
    }

    /// Insert or replace a record by its `owner/name` key.
    pub fn upsert(&mut self, record: RepositoryRecord) {
        if let Some(existing) = self
            .repositories
            .iter_mut()
            .find(|r| r.key() == record.key())
        {
            *existing = record;
        } else {
            self.repositories.push(record);
        }
    }

    pub fn get(&self, key: &str) -> Option<&RepositoryRecord> {
        self.repositories.iter().find(|r| r.key() == key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut RepositoryRecord> {
        self.repositories.iter_mut().find(|r| r.key() == key)
    }

    pub fn remove(&mut self, key: &str) -> Option<RepositoryRecord> {
        let index = self.repositories.iter().position(|r| r.key() == key)?;
        Some(self.repositories.remove(index))
    }

    /// Drop `plugin` from the record at `key`. When the last referencing
    /// plugin goes, the record itself is removed and returned.
    pub fn remove_plugin(&mut self, key: &str, plugin: &str) -> Option<RepositoryRecord> {
        let record = self.get_mut(key)?;
        record.plugins.remove(plugin);
        if record.plugins.is_empty() {
            self.remove(key)
        } else {
            None
        }
    }

    pub fn list(&self) -> &[RepositoryRecord] {
        &self.repositories
    }

    pub fn len(&self) -> usize {
        self.repositories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.repositories.is_empty()
    }
}
