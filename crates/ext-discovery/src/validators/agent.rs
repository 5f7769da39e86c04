//! Agent definition validator

use std::path::Path;

use ext_meta::{ValidationIssue, ValidationResult};

use crate::Result;
use crate::frontmatter;

/// Tools an agent may declare. Unknown entries are warnings, never errors.
pub const KNOWN_TOOLS: [&str; 8] = [
    "Read", "Write", "Edit", "Bash", "Grep", "Glob", "WebFetch", "Task",
];

/// Permission levels an agent may request.
pub const KNOWN_PERMISSIONS: [&str; 4] = ["read", "write", "execute", "network"];

/// Validate an agent definition (Markdown with YAML front matter).
///
/// Front matter must parse and carry `name` and `description`. `tools` and
/// `permissions` entries are checked against the known vocabulary; unknown
/// entries downgrade to warnings.
pub fn validate(path: &Path) -> Result<ValidationResult> {
    let content = ext_fs::read_text(path)?;
    let mut result = ValidationResult::ok();

    let Some((yaml, _body)) = frontmatter::split(&content) else {
        result.push(
            ValidationIssue::error(
                "AGENT_NO_FRONT_MATTER",
                "agent definition requires YAML front matter",
            )
            .with_fix("start the file with a `---` fenced YAML block"),
        );
        return Ok(result);
    };

    let value: serde_yaml::Value = match serde_yaml::from_str(yaml) {
        Ok(value) => value,
        Err(e) => {
            result.push(ValidationIssue::error(
                "AGENT_FRONT_MATTER_PARSE",
                format!("front matter is not valid YAML: {e}"),
            ));
            return Ok(result);
        }
    };

    for field in ["name", "description"] {
        match value.get(field).and_then(serde_yaml::Value::as_str) {
            Some(s) if !s.trim().is_empty() => {}
            _ => result.push(ValidationIssue::error(
                "AGENT_MISSING_FIELD",
                format!("front matter requires a non-empty `{field}`"),
            )),
        }
    }

    check_vocabulary(&value, "tools", &KNOWN_TOOLS, "AGENT_UNKNOWN_TOOL", &mut result);
    check_vocabulary(
        &value,
        "permissions",
        &KNOWN_PERMISSIONS,
        "AGENT_UNKNOWN_PERMISSION",
        &mut result,
    );

    Ok(result)
}

fn check_vocabulary(
    value: &serde_yaml::Value,
    field: &str,
    known: &[&str],
    code: &str,
    result: &mut ValidationResult,
) {
    let Some(entries) = value.get(field) else {
        return;
    };
    let Some(sequence) = entries.as_sequence() else {
        result.push(ValidationIssue::error(
            "AGENT_INVALID_LIST",
            format!("`{field}` must be a list"),
        ));
        return;
    };
    for entry in sequence {
        let Some(name) = entry.as_str() else {
            result.push(ValidationIssue::error(
                "AGENT_INVALID_LIST",
                format!("`{field}` entries must be strings"),
            ));
            continue;
        };
        if !known.contains(&name) {
            result.push(ValidationIssue::warning(
                code,
                format!("unknown {field} entry '{name}'"),
            ));
        }
    }
}
