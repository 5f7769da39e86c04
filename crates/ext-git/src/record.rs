//! Tracked repository records

use std::collections::BTreeSet;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// One tracked plugin repository.
///
/// `commit` tracks the local HEAD; every successful manager operation leaves
/// the two equal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryRecord {
    pub owner: String,
    pub name: String,
    pub url: String,
    pub local_path: PathBuf,
    /// SHA of the tracked commit (equals local HEAD).
    pub commit: String,
    pub last_updated: DateTime<Utc>,
    /// Names of plugins installed from this repository. The record lives
    /// only as long as this set is non-empty once plugins reference it.
    #[serde(default)]
    pub plugins: BTreeSet<String>,
}

impl RepositoryRecord {
    pub fn new(url: &str, local_path: impl Into<PathBuf>, commit: impl Into<String>) -> Result<Self> {
        let (owner, name) = parse_owner_name(url)?;
        Ok(Self {
            owner,
            name,
            url: url.to_string(),
            local_path: local_path.into(),
            commit: commit.into(),
            last_updated: Utc::now(),
            plugins: BTreeSet::new(),
        })
    }

    /// `owner/name` registry key.
    pub fn key(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

/// Derive `owner/name` from an HTTPS, SSH, or local-path remote URL.
pub fn parse_owner_name(url: &str) -> Result<(String, String)> {
    let trimmed = url.trim_end_matches('/');
    let without_suffix = trimmed.strip_suffix(".git").unwrap_or(trimmed);

    // SSH form: git@host:owner/name
    let path_part = if let Some((_, rest)) = without_suffix.split_once(':')
        && !rest.contains("//")
        && without_suffix.contains('@')
    {
        rest
    } else if let Some((_, rest)) = without_suffix.split_once("://") {
        // HTTPS form: strip the host segment
        rest.split_once('/').map(|(_, p)| p).unwrap_or("")
    } else {
        // Local path: use the last two components
        without_suffix
    };

    let mut segments: Vec<&str> = path_part.split('/').filter(|s| !s.is_empty()).collect();
    if segments.len() < 2 {
        return Err(Error::InvalidRemote {
            url: url.to_string(),
        });
    }
    let name = segments.pop().unwrap_or_default().to_string();
    let owner = segments.pop().unwrap_or_default().to_string();
    if owner.is_empty() || name.is_empty() {
        return Err(Error::InvalidRemote {
            url: url.to_string(),
        });
    }
    Ok((owner, name))
}
