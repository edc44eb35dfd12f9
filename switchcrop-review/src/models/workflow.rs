//! Review workflow state machine
//!
//! STAGING → UPLOADING → REVIEWING → EDITING → BATCH_SUBMITTING → BATCH_COMPLETE
//!
//! Any backend failure lands in FAILED. Restart from FAILED or BATCH_COMPLETE
//! returns to STAGING. The transition table in [`WorkflowStateMachine::apply`]
//! is the only place control flow between stages is decided.

use crate::error::{ReviewError, ReviewResult};
use crate::models::interval::Interval;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use switchcrop_common::events::WorkflowState;

/// Message used when the backend analyzes nothing from a non-empty upload
pub const NO_FILES_PROCESSED: &str = "No valid audio files processed";

/// Where to fetch the crop archive from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadReference {
    /// Backend-relative or absolute URL
    pub url: String,
    /// Suggested local file name
    pub filename: String,
}

/// Result of a successful batch crop
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub processed_files: usize,
    pub failed_files: usize,
    pub download: DownloadReference,
}

/// Inputs to the state machine
#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowEvent {
    FilesChosen { count: usize },
    SubmitUpload { staged: usize },
    UploadSucceeded { analyzed: usize },
    UploadFailed { message: String },
    Proceed,
    ProceedFailed { message: String },
    /// Spectrogram for the selected file could not be loaded
    ViewFailed { message: String },
    SubmitBatch { interval: Interval },
    BatchSucceeded(BatchOutcome),
    BatchFailed { message: String },
    Restart,
}

impl WorkflowEvent {
    pub fn name(&self) -> &'static str {
        match self {
            WorkflowEvent::FilesChosen { .. } => "files_chosen",
            WorkflowEvent::SubmitUpload { .. } => "submit_upload",
            WorkflowEvent::UploadSucceeded { .. } => "upload_succeeded",
            WorkflowEvent::UploadFailed { .. } => "upload_failed",
            WorkflowEvent::Proceed => "proceed",
            WorkflowEvent::ProceedFailed { .. } => "proceed_failed",
            WorkflowEvent::ViewFailed { .. } => "view_failed",
            WorkflowEvent::SubmitBatch { .. } => "submit_batch",
            WorkflowEvent::BatchSucceeded(_) => "batch_succeeded",
            WorkflowEvent::BatchFailed { .. } => "batch_failed",
            WorkflowEvent::Restart => "restart",
        }
    }
}

/// Record of one applied event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTransition {
    pub session_id: Uuid,
    pub old_state: WorkflowState,
    pub new_state: WorkflowState,
    pub transitioned_at: DateTime<Utc>,
}

impl StateTransition {
    pub fn changed(&self) -> bool {
        self.old_state != self.new_state
    }
}

/// Five-stage pipeline plus its two terminal states
#[derive(Debug, Clone)]
pub struct WorkflowStateMachine {
    session_id: Uuid,
    state: WorkflowState,
    /// Message shown while Failed
    failure: Option<String>,
    /// Archive details while BatchComplete
    outcome: Option<BatchOutcome>,
}

impl WorkflowStateMachine {
    pub fn new() -> Self {
        Self {
            session_id: Uuid::new_v4(),
            state: WorkflowState::Staging,
            failure: None,
            outcome: None,
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn state(&self) -> WorkflowState {
        self.state
    }

    pub fn failure_message(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    pub fn outcome(&self) -> Option<&BatchOutcome> {
        self.outcome.as_ref()
    }

    /// Apply one event against the transition table
    ///
    /// Guard failures that are user-correctable return `Validation` and leave
    /// the state untouched. Events the current stage does not accept return
    /// `InvalidTransition`.
    pub fn apply(&mut self, event: WorkflowEvent) -> ReviewResult<StateTransition> {
        use WorkflowEvent as E;
        use WorkflowState as S;

        let name = event.name();
        let next = match (self.state, event) {
            (S::Staging, E::FilesChosen { count }) => {
                if count == 0 {
                    return Err(ReviewError::Validation(
                        "No supported audio files were selected".to_string(),
                    ));
                }
                S::Staging
            }
            (S::Staging, E::SubmitUpload { staged }) => {
                if staged == 0 {
                    return Err(ReviewError::Validation(
                        "Select at least one audio file before uploading".to_string(),
                    ));
                }
                S::Uploading
            }
            (S::Uploading, E::UploadSucceeded { analyzed }) => {
                if analyzed == 0 {
                    self.failure = Some(NO_FILES_PROCESSED.to_string());
                    S::Failed
                } else {
                    S::Reviewing
                }
            }
            (S::Uploading, E::UploadFailed { message })
            | (S::Reviewing, E::ProceedFailed { message })
            | (S::Editing, E::ViewFailed { message })
            | (S::BatchSubmitting, E::BatchFailed { message }) => {
                self.failure = Some(message);
                S::Failed
            }
            (S::Reviewing, E::Proceed) => S::Editing,
            (S::Editing, E::SubmitBatch { interval }) => {
                if !interval.is_valid() {
                    return Err(ReviewError::Validation(format!(
                        "Start time must be before end time (got {} - {})",
                        interval.start, interval.end
                    )));
                }
                S::BatchSubmitting
            }
            (S::BatchSubmitting, E::BatchSucceeded(outcome)) => {
                self.outcome = Some(outcome);
                S::BatchComplete
            }
            (state, E::Restart) if state.is_terminal() => {
                // A restarted workflow is a new session
                self.session_id = Uuid::new_v4();
                self.failure = None;
                self.outcome = None;
                S::Staging
            }
            (state, _) => {
                return Err(ReviewError::InvalidTransition { state, event: name });
            }
        };

        let transition = StateTransition {
            session_id: self.session_id,
            old_state: self.state,
            new_state: next,
            transitioned_at: Utc::now(),
        };
        self.state = next;

        if transition.changed() {
            tracing::info!(
                session_id = %self.session_id,
                event = name,
                from = %transition.old_state,
                to = %transition.new_state,
                "Workflow transition"
            );
        }

        Ok(transition)
    }
}

impl Default for WorkflowStateMachine {
    fn default() -> Self {
        Self::new()
    }
}
