//! Error types for normalization and rules-based rendering.

use std::fmt;

/// Result of a rules-engine stage.
pub type Result<T> = std::result::Result<T, RulesFailure>;

/// Why the rules engine could not produce a citation.
///
/// Every variant is recoverable: the caller is expected to escalate to a
/// fallback generator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RulesFailure {
    /// The record lacks authors, title, or an issued year.
    #[error("missing data: {0}")]
    MissingData(String),

    /// No style definition exists under the requested name.
    #[error("unknown style '{0}'")]
    UnknownStyle(String),

    /// The style definition is malformed or produced no entry.
    #[error("processing error: {0}")]
    ProcessingError(String),
}

impl RulesFailure {
    /// Short machine-friendly name of the failure kind.
    pub fn kind(&self) -> &'static str {
        match self {
            RulesFailure::MissingData(_) => "missing_data",
            RulesFailure::UnknownStyle(_) => "unknown_style",
            RulesFailure::ProcessingError(_) => "processing_error",
        }
    }
}

/// A single problem found while normalizing a raw record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldProblem {
    /// JSON path of the offending field (e.g. `author[1].family`).
    pub field: String,
    /// What is wrong with it.
    pub message: String,
}

impl FieldProblem {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// The raw record could not be shaped into a canonical record.
///
/// Carries every problem found, not only the first.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid citation record: {}", problems.iter().map(|p| p.to_string()).collect::<Vec<_>>().join("; "))]
pub struct ValidationError {
    pub problems: Vec<FieldProblem>,
}

impl ValidationError {
    /// True if any problem concerns `field` or one of its children.
    pub fn mentions(&self, field: &str) -> bool {
        self.problems.iter().any(|p| {
            p.field == field
                || p.field.starts_with(&format!("{}[", field))
                || p.field.starts_with(&format!("{}.", field))
        })
    }
}

impl From<ValidationError> for RulesFailure {
    fn from(err: ValidationError) -> Self {
        RulesFailure::MissingData(err.to_string())
    }
}
