//! Per-item results of batch operations
//!
//! Every operation reports one outcome per affected item instead of a
//! single pass/fail. A batch where one item fails still completes the
//! others; callers inspect the list.

use ext_meta::{ExtensionKind, ValidationResult};

/// Final status of a single item within a batch operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutcomeStatus {
    Installed,
    Updated,
    Removed,
    Enabled,
    Disabled,
    /// Nothing was done; reason explains why (already installed,
    /// deselected, already up to date).
    Skipped { reason: String },
    Failed { message: String },
}

impl OutcomeStatus {
    pub fn is_success(&self) -> bool {
        !matches!(
            self,
            OutcomeStatus::Skipped { .. } | OutcomeStatus::Failed { .. }
        )
    }
}

/// Result for a single item inside a batch operation. Repository-level
/// items (update of a tracked repository) carry no extension kind.
#[derive(Debug, Clone)]
pub struct ItemOutcome {
    pub id: String,
    pub kind: Option<ExtensionKind>,
    pub name: String,
    pub status: OutcomeStatus,
    /// Validation issues observed during the operation, if any.
    pub validation: ValidationResult,
}

impl ItemOutcome {
    pub fn new(
        id: impl Into<String>,
        kind: impl Into<Option<ExtensionKind>>,
        name: impl Into<String>,
        status: OutcomeStatus,
    ) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            name: name.into(),
            status,
            validation: ValidationResult::ok(),
        }
    }

    pub fn with_validation(mut self, validation: ValidationResult) -> Self {
        self.validation = validation;
        self
    }

    pub fn skipped(
        id: impl Into<String>,
        kind: impl Into<Option<ExtensionKind>>,
        name: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::new(
            id,
            kind,
            name,
            OutcomeStatus::Skipped {
                reason: reason.into(),
            },
        )
    }

    pub fn failed(
        id: impl Into<String>,
        kind: impl Into<Option<ExtensionKind>>,
        name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(
            id,
            kind,
            name,
            OutcomeStatus::Failed {
                message: message.into(),
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_predicate() {
        assert!(OutcomeStatus::Installed.is_success());
        assert!(OutcomeStatus::Removed.is_success());
        assert!(
            !OutcomeStatus::Skipped {
                reason: "already installed".into()
            }
            .is_success()
        );
        assert!(
            !OutcomeStatus::Failed {
                message: "io".into()
            }
            .is_success()
        );
    }

    #[test]
    fn test_repo_level_outcome_has_no_kind() {
        let outcome = ItemOutcome::new("acme/toolkit", None, "acme/toolkit", OutcomeStatus::Updated);
        assert!(outcome.kind.is_none());
    }
}
