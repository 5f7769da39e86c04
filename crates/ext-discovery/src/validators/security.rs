//! Shell command deny-list
//!
//! Hook commands run with the user's privileges, so each one is scanned
//! against a fixed table of dangerous patterns before installation. A match
//! produces a `SECURITY_`-coded error that only an explicit force flag at the
//! orchestrator layer may override.

use std::sync::LazyLock;

use regex::Regex;

use ext_meta::ValidationIssue;

struct DenyRule {
    code: &'static str,
    pattern: Regex,
    message: &'static str,
}

static DENY_RULES: LazyLock<Vec<DenyRule>> = LazyLock::new(|| {
    let rule = |code, pattern: &str, message| DenyRule {
        code,
        // Patterns are literals in this table; a failure here is a programming error.
        pattern: Regex::new(pattern).unwrap(),
        message,
    };
    vec![
        rule(
            "SECURITY_PATH_TRAVERSAL",
            r"\.\./",
            "command contains a parent-directory traversal",
        ),
        rule(
            "SECURITY_DESTRUCTIVE_DELETE",
            r"(?:^|[;&|]\s*|\bsudo\s+)rm\s+(-[a-zA-Z]*\s+)*(/|~(/|\s|$)|\$HOME)",
            "command deletes from the filesystem root or home directory",
        ),
        rule(
            "SECURITY_RECURSIVE_FORCE_DELETE",
            r"rm\s+-[a-zA-Z]*(rf|fr)[a-zA-Z]*\b|rm\s+-r\s+-f|rm\s+-f\s+-r",
            "command performs a recursive force delete",
        ),
        rule(
            "SECURITY_PIPE_TO_SHELL",
            r"(curl|wget)\b[^|;]*\|\s*(sudo\s+)?(ba|z|da)?sh\b",
            "command pipes a download into a shell",
        ),
        rule(
            "SECURITY_DEVICE_WRITE",
            r">\s*/dev/(sd|hd|nvme|vd)|dd\s[^;|]*\bof=/dev/",
            "command writes to a raw block device",
        ),
        rule(
            "SECURITY_FORMAT_FILESYSTEM",
            r"\bmkfs(\.[a-z0-9]+)?\s",
            "command re-formats a filesystem",
        ),
    ]
});

/// Scan one shell command, returning an issue per matched deny rule.
pub fn scan_command(command: &str) -> Vec<ValidationIssue> {
    DENY_RULES
        .iter()
        .filter(|rule| rule.pattern.is_match(command))
        .map(|rule| {
            tracing::warn!(code = rule.code, command, "dangerous hook command");
            ValidationIssue::error(rule.code, format!("{}: `{command}`", rule.message))
                .with_fix("remove the dangerous pattern, or re-run with --force to override")
        })
        .collect()
}
