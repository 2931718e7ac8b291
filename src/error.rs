// 🚫 Error Taxonomy - Validation and lookup failures
// Every error surfaces synchronously to the caller of `EventPipeline::run`

use thiserror::Error;

// ============================================================================
// VALIDATION ERROR
// ============================================================================

/// Raised by a `Validator` modifier when its precondition rejects the input.
/// The wrapped stage never runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub stage: String,
    pub rule: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(stage: &str, rule: &str, message: &str) -> Self {
        ValidationError {
            stage: stage.to_string(),
            rule: rule.to_string(),
            message: message.to_string(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}: {}", self.stage, self.rule, self.message)
    }
}

impl std::error::Error for ValidationError {}

// ============================================================================
// LOOKUP ERROR
// ============================================================================

/// Which context value a resolver was asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupKind {
    Region,
    Timezone,
    Locale,
}

impl LookupKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LookupKind::Region => "region",
            LookupKind::Timezone => "timezone",
            LookupKind::Locale => "locale",
        }
    }
}

impl std::fmt::Display for LookupKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("invalid ip address: {input:?}")]
    InvalidAddress { input: String },

    #[error("no {kind} rule matches {input:?}")]
    Unresolved { kind: LookupKind, input: String },
}

// ============================================================================
// PIPELINE ERROR
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("lookup failed: {0}")]
    Lookup(#[from] LookupError),
}

impl PipelineError {
    pub fn is_validation(&self) -> bool {
        matches!(self, PipelineError::Validation(_))
    }

    pub fn is_lookup(&self) -> bool {
        matches!(self, PipelineError::Lookup(_))
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::new("sanitize", "processed_at_required", "event was never timestamped");
        assert_eq!(
            err.to_string(),
            "[sanitize] processed_at_required: event was never timestamped"
        );
    }

    #[test]
    fn test_pipeline_error_from_variants() {
        let err: PipelineError = ValidationError::new("sanitize", "rule", "msg").into();
        assert!(err.is_validation());
        assert!(!err.is_lookup());

        let err: PipelineError = LookupError::Unresolved {
            kind: LookupKind::Locale,
            input: "Plan9".to_string(),
        }
        .into();
        assert!(err.is_lookup());
        assert_eq!(err.to_string(), "lookup failed: no locale rule matches \"Plan9\"");
    }
}
