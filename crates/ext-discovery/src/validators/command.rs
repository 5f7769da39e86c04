//! Command definition validator

use std::sync::LazyLock;

use std::path::Path;

use regex::Regex;

use ext_meta::{ValidationIssue, ValidationResult};

use crate::Result;

static TITLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#\s+/?[A-Za-z0-9][A-Za-z0-9:_-]*\s*$").unwrap());

/// Validate a command definition (Markdown).
///
/// The first non-blank line (after optional front matter) must be a title in
/// command syntax (`# /name` or `# name`). `## Usage` and `## Parameters`
/// sections, when present, must have non-empty bodies.
pub fn validate(path: &Path) -> Result<ValidationResult> {
    let content = ext_fs::read_text(path)?;
    let mut result = ValidationResult::ok();

    let body = crate::frontmatter::split(&content)
        .map(|(_, body)| body)
        .unwrap_or(&content);

    match body.lines().find(|line| !line.trim().is_empty()) {
        Some(line) if TITLE_RE.is_match(line.trim_end()) => {}
        Some(line) => result.push(
            ValidationIssue::error(
                "COMMAND_BAD_TITLE",
                format!("first line is not a command title: '{}'", line.trim()),
            )
            .with_fix("start the file with `# /command-name`"),
        ),
        None => result.push(ValidationIssue::error(
            "COMMAND_EMPTY",
            "command definition is empty",
        )),
    }

    for section in ["Usage", "Parameters"] {
        if section_is_empty(body, section) == Some(true) {
            result.push(ValidationIssue::error(
                "COMMAND_EMPTY_SECTION",
                format!("`## {section}` section has no content"),
            ));
        }
    }

    Ok(result)
}

/// Whether a `## {name}` section exists and has no content before the next
/// heading. `None` when the section is absent.
fn section_is_empty(content: &str, name: &str) -> Option<bool> {
    let heading = format!("## {name}");
    let mut lines = content.lines().skip_while(|l| l.trim_end() != heading);
    lines.next()?;
    Some(
        lines
            .take_while(|line| !line.starts_with("##"))
            .all(|line| line.trim().is_empty()),
    )
}
