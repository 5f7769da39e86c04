//! Hook configuration validator

use std::path::Path;

use serde::Deserialize;

use ext_meta::{ValidationIssue, ValidationResult};

use crate::Result;
use crate::validators::security;

/// The fixed set of host event types a hook may subscribe to.
pub const EVENT_TYPES: [&str; 9] = [
    "PreToolUse",
    "PostToolUse",
    "UserPromptSubmit",
    "Notification",
    "Stop",
    "SubagentStop",
    "PreCompact",
    "SessionStart",
    "SessionEnd",
];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HookConfig {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    event_types: Vec<String>,
    #[serde(default)]
    commands: Vec<String>,
}

/// Validate a hook definition (JSON).
///
/// Requires a name, a non-empty event-type list drawn from [`EVENT_TYPES`],
/// and a non-empty command list. Every command is scanned against the
/// security deny-list.
pub fn validate(path: &Path) -> Result<ValidationResult> {
    let content = ext_fs::read_text(path)?;
    let mut result = ValidationResult::ok();

    let config: HookConfig = match serde_json::from_str(&content) {
        Ok(config) => config,
        Err(e) => {
            result.push(ValidationIssue::error(
                "HOOK_PARSE",
                format!("hook config is not valid JSON: {e}"),
            ));
            return Ok(result);
        }
    };

    match &config.name {
        Some(name) if !name.trim().is_empty() => {}
        _ => result.push(ValidationIssue::error(
            "HOOK_MISSING_NAME",
            "hook config requires a non-empty name",
        )),
    }

    if config.event_types.is_empty() {
        result.push(
            ValidationIssue::error("HOOK_NO_EVENT_TYPES", "hook declares no event types")
                .with_fix(format!("add an eventTypes entry, one of: {}", EVENT_TYPES.join(", "))),
        );
    }
    for event in &config.event_types {
        if !EVENT_TYPES.contains(&event.as_str()) {
            result.push(ValidationIssue::error(
                "HOOK_UNKNOWN_EVENT_TYPE",
                format!("unknown event type '{event}'"),
            ));
        }
    }

    if config.commands.is_empty() {
        result.push(ValidationIssue::error(
            "HOOK_NO_COMMANDS",
            "hook declares no commands",
        ));
    }
    for command in &config.commands {
        for issue in security::scan_command(command) {
            result.push(issue);
        }
    }

    Ok(result)
}
