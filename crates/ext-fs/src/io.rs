//! Atomic I/O primitives
//!
//! All configuration writes go through write-to-temp-then-rename in the
//! target's own directory, so a rename never crosses a filesystem boundary.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// Build a temp-file path next to `target`, so the final rename stays on one
/// filesystem.
pub fn staging_path(target: &Path, tag: &str) -> PathBuf {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    target.with_file_name(format!(".{name}.{tag}.tmp"))
}

/// Write `content` atomically to `path`.
///
/// The content is written and synced to a sibling temp file, then renamed
/// over the target. Parent directories are created as needed.
pub fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }

    let temp_path = staging_path(path, &std::process::id().to_string());

    let mut temp_file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&temp_path)
        .map_err(|e| Error::io(&temp_path, e))?;

    temp_file
        .write_all(content)
        .map_err(|e| Error::io(&temp_path, e))?;
    temp_file
        .sync_all()
        .map_err(|e| Error::io(&temp_path, e))?;
    drop(temp_file);

    fs::rename(&temp_path, path).map_err(|e| Error::io(path, e))?;
    Ok(())
}

/// Read a file into a string.
pub fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| Error::io(path, e))
}

/// Read and parse a JSON file.
pub fn read_json(path: &Path) -> Result<serde_json::Value> {
    let content = read_text(path)?;
    serde_json::from_str(&content).map_err(|e| Error::JsonParse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Serialize `value` as pretty JSON and write it atomically.
pub fn write_json(path: &Path, value: &serde_json::Value) -> Result<()> {
    let mut content = serde_json::to_string_pretty(value).map_err(|e| Error::JsonParse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    content.push('\n');
    write_atomic(path, content.as_bytes())
}
