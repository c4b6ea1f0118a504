use thiserror::Error;

/// Precondition violations. Inputs are rejected before any computation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("invalid rating: {0} (expected 1..=4)")]
    InvalidRating(u8),
    #[error("invalid outcome: {0} (expected 0 or 1)")]
    InvalidOutcome(u8),
    #[error("invalid memory state: {0}")]
    InvalidMemoryState(String),
    #[error("invalid item parameters for {item_id}: {reason}")]
    InvalidItemParams { item_id: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AssessmentError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("unknown item: {0}")]
    UnknownItem(String),
    #[error("unexpected item: expected {expected}, got {actual}")]
    UnexpectedItem { expected: String, actual: String },
    #[error("assessment session already complete")]
    SessionComplete,
    #[error("item bank too small: need {needed} {kind} items, found {found}")]
    InsufficientItems {
        kind: &'static str,
        needed: usize,
        found: usize,
    },
}
