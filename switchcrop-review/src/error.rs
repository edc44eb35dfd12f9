//! Error types for switchcrop-review
//!
//! Transport failures and backend rejections both end the session in
//! `Failed` with a single message. Validation errors stay local to the
//! current stage. Catalog lookup misses never escalate.

use switchcrop_common::events::WorkflowState;
use thiserror::Error;

/// Review error type
#[derive(Debug, Error)]
pub enum ReviewError {
    /// Network or HTTP failure talking to the backend
    #[error("Transport error: {0}")]
    Transport(String),

    /// Backend answered `success: false` (or an error body) with a message
    #[error("Backend rejected request: {0}")]
    BackendRejection(String),

    /// User-correctable input problem (interval bounds, empty selection)
    #[error("Validation error: {0}")]
    Validation(String),

    /// File key not present in the catalog
    #[error("Not found: {0}")]
    NotFound(String),

    /// Interval edit value is not a finite number of seconds
    #[error("Rejected interval value: {0}")]
    Rejected(String),

    /// Event not permitted by the transition table in the current stage
    #[error("Event '{event}' is not allowed while {state}")]
    InvalidTransition {
        state: WorkflowState,
        event: &'static str,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// switchcrop-common error
    #[error("Common error: {0}")]
    Common(#[from] switchcrop_common::Error),
}

impl ReviewError {
    /// Message shown to the user when this error ends the workflow
    ///
    /// Backend messages are surfaced verbatim.
    pub fn user_message(&self) -> String {
        match self {
            ReviewError::Transport(msg)
            | ReviewError::BackendRejection(msg)
            | ReviewError::Validation(msg)
            | ReviewError::NotFound(msg)
            | ReviewError::Rejected(msg) => msg.clone(),
            other => other.to_string(),
        }
    }

    /// Errors that move the workflow to `Failed`
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ReviewError::Transport(_) | ReviewError::BackendRejection(_)
        )
    }
}

impl From<reqwest::Error> for ReviewError {
    fn from(e: reqwest::Error) -> Self {
        ReviewError::Transport(e.to_string())
    }
}

/// Result type for review operations
pub type ReviewResult<T> = Result<T, ReviewError>;
