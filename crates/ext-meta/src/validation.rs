//! Validation result types
//!
//! Validators report malformed content through [`ValidationResult`] rather
//! than error returns, so one bad candidate never aborts its siblings.

use serde::{Deserialize, Serialize};

/// Severity of a single validation finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational; never affects validity.
    Info,
    /// Suspicious but acceptable; never affects validity.
    Warning,
    /// Invalidates the candidate.
    Error,
}

/// One validation finding with a stable machine-readable code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// Stable code such as `HOOK_MISSING_NAME` or `SECURITY_PIPE_TO_SHELL`.
    pub code: String,
    /// Human-readable message.
    pub message: String,
    pub severity: Severity,
    /// Suggested remediation, when one exists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fix: Option<String>,
}

impl ValidationIssue {
    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            severity: Severity::Error,
            fix: None,
        }
    }

    pub fn warning(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            severity: Severity::Warning,
            fix: None,
        }
    }

    pub fn with_fix(mut self, fix: impl Into<String>) -> Self {
        self.fix = Some(fix.into());
        self
    }

    /// Security findings use a reserved `SECURITY_` code prefix so the
    /// orchestrator can identify what a force flag may override.
    pub fn is_security(&self) -> bool {
        self.code.starts_with("SECURITY_")
    }
}

/// Outcome of validating one candidate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationResult {
    /// A result with no findings.
    pub fn ok() -> Self {
        Self::default()
    }

    /// A result carrying a single error.
    pub fn invalid(code: impl Into<String>, message: impl Into<String>) -> Self {
        let mut result = Self::default();
        result.push(ValidationIssue::error(code, message));
        result
    }

    pub fn push(&mut self, issue: ValidationIssue) {
        self.issues.push(issue);
    }

    /// Valid when no error-severity finding is present.
    pub fn is_valid(&self) -> bool {
        !self
            .issues
            .iter()
            .any(|i| i.severity == Severity::Error)
    }

    /// Valid when the only errors are security findings (which an explicit
    /// force flag may override).
    pub fn is_valid_with_force(&self) -> bool {
        !self
            .issues
            .iter()
            .any(|i| i.severity == Severity::Error && !i.is_security())
    }

    /// Whether any security-coded finding is present.
    pub fn has_security_issues(&self) -> bool {
        self.issues.iter().any(ValidationIssue::is_security)
    }

    pub fn errors(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Error)
    }

    /// Absorb another result's findings.
    pub fn merge(&mut self, other: ValidationResult) {
        self.issues.extend(other.issues);
    }
}
