//! Server configuration validator

use std::path::Path;

use serde_json::Value;

use ext_meta::{ValidationIssue, ValidationResult};

use crate::Result;

/// Validate a server definition (JSON).
///
/// Requires an executable `command` string; `args` must be an array of
/// strings and `env` a string-keyed map of string values.
pub fn validate(path: &Path) -> Result<ValidationResult> {
    let content = ext_fs::read_text(path)?;
    let mut result = ValidationResult::ok();

    let config: Value = match serde_json::from_str(&content) {
        Ok(value) => value,
        Err(e) => {
            result.push(ValidationIssue::error(
                "SERVER_PARSE",
                format!("server config is not valid JSON: {e}"),
            ));
            return Ok(result);
        }
    };

    match config.get("command").and_then(Value::as_str) {
        Some(command) if !command.trim().is_empty() => {}
        Some(_) => result.push(ValidationIssue::error(
            "SERVER_EMPTY_COMMAND",
            "server command must not be empty",
        )),
        None => result.push(ValidationIssue::error(
            "SERVER_MISSING_COMMAND",
            "server config requires a string `command`",
        )),
    }

    if let Some(args) = config.get("args") {
        match args.as_array() {
            Some(items) if items.iter().all(Value::is_string) => {}
            _ => result.push(ValidationIssue::error(
                "SERVER_INVALID_ARGS",
                "`args` must be an array of strings",
            )),
        }
    }

    if let Some(env) = config.get("env") {
        match env.as_object() {
            Some(map) if map.values().all(Value::is_string) => {}
            _ => result.push(ValidationIssue::error(
                "SERVER_INVALID_ENV",
                "`env` must be a string-to-string map",
            )),
        }
    }

    Ok(result)
}
