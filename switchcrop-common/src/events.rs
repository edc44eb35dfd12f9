//! Event types for the switchcrop review client
//!
//! Provides the review event definitions and the EventBus used to observe a
//! review session without coupling to it.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Stage of the interval review workflow
///
/// Exactly one stage is active per session. `BatchComplete` and `Failed` are
/// terminal until an explicit restart returns the session to `Staging`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowState {
    /// Files are being chosen
    Staging,
    /// Staged files are in flight to the analysis backend
    Uploading,
    /// Per-file detections and the weighted average are on display
    Reviewing,
    /// Spectrogram view with the shared interval open for edits
    Editing,
    /// Final interval sent, waiting for the crop archive
    BatchSubmitting,
    /// Archive ready for download
    BatchComplete,
    /// A backend call failed; restart is the only way out
    Failed,
}

impl WorkflowState {
    /// Terminal stages only leave through restart
    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkflowState::BatchComplete | WorkflowState::Failed)
    }
}

impl std::fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            WorkflowState::Staging => "staging",
            WorkflowState::Uploading => "uploading",
            WorkflowState::Reviewing => "reviewing",
            WorkflowState::Editing => "editing",
            WorkflowState::BatchSubmitting => "batch_submitting",
            WorkflowState::BatchComplete => "batch_complete",
            WorkflowState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Review session events
///
/// Events are broadcast via EventBus and serialize with a `type` tag.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ReviewEvent {
    /// Workflow moved between stages
    StateChanged {
        session_id: Uuid,
        old_state: WorkflowState,
        new_state: WorkflowState,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A new file selection was staged
    FilesStaged {
        accepted: usize,
        skipped: usize,
        total_bytes: u64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Shared interval changed (typed edit, click, seed or reset)
    IntervalChanged {
        start: f64,
        end: f64,
        /// The opposite bound was nudged to keep `start < end`
        deflected: bool,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Catalog cursor moved
    FileSelected {
        index: usize,
        unique_filename: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Spectrogram for the selected file reached the surface
    SpectrogramRendered {
        unique_filename: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Spectrogram response arrived for a file that is no longer selected
    SpectrogramDiscarded {
        unique_filename: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Batch crop finished and produced an archive
    BatchCompleted {
        processed_files: usize,
        failed_files: usize,
        download_url: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Workflow entered Failed
    WorkflowFailed {
        message: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

/// Central event distribution bus
///
/// Uses tokio::broadcast internally: publishing never blocks, slow subscribers
/// observe `Lagged` instead of stalling the session.
///
/// # Examples
///
/// ```
/// use switchcrop_common::events::{EventBus, ReviewEvent};
///
/// let event_bus = EventBus::new(100);
/// let mut rx = event_bus.subscribe();
///
/// event_bus.emit_lossy(ReviewEvent::WorkflowFailed {
///     message: "bad format".to_string(),
///     timestamp: chrono::Utc::now(),
/// });
///
/// assert!(rx.try_recv().is_ok());
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ReviewEvent>,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<ReviewEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: ReviewEvent,
    ) -> Result<usize, broadcast::error::SendError<ReviewEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: ReviewEvent) {
        if self.tx.send(event).is_err() {
            tracing::trace!("Review event dropped: no subscribers");
        }
    }

    /// Number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_without_subscribers_is_err() {
        let bus = EventBus::new(10);
        let result = bus.emit(ReviewEvent::WorkflowFailed {
            message: "x".to_string(),
            timestamp: chrono::Utc::now(),
        });
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_subscriber_receives_event() {
        let bus = EventBus::new(10);
        let mut rx = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);

        bus.emit_lossy(ReviewEvent::IntervalChanged {
            start: 5.5,
            end: 6.5,
            deflected: false,
            timestamp: chrono::Utc::now(),
        });

        match rx.recv().await.unwrap() {
            ReviewEvent::IntervalChanged { start, end, .. } => {
                assert_eq!(start, 5.5);
                assert_eq!(end, 6.5);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_event_serializes_with_type_tag() {
        let event = ReviewEvent::StateChanged {
            session_id: Uuid::nil(),
            old_state: WorkflowState::Staging,
            new_state: WorkflowState::Uploading,
            timestamp: chrono::Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "StateChanged");
        assert_eq!(json["new_state"], "uploading");
    }

    #[test]
    fn test_terminal_states() {
        assert!(WorkflowState::BatchComplete.is_terminal());
        assert!(WorkflowState::Failed.is_terminal());
        assert!(!WorkflowState::Editing.is_terminal());
    }
}
