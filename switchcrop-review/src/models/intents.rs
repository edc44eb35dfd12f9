//! Closed set of user intents consumed by the review session
//!
//! Front ends translate their raw input (typed values, surface clicks, key
//! presses) into these and hand them to `ReviewSession::dispatch` one at a
//! time.

use crate::models::interval::Bound;

/// Change to the shared interval
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EditIntent {
    /// Typed value for a named bound
    Set { bound: Bound, value: f64 },
    /// Click on the surface at this time; resolves to the nearest bound
    Click { time: f64 },
}

/// Change of the selected file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigateIntent {
    Next,
    Previous,
    Select(String),
}

/// Advance the workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitIntent {
    Upload,
    Proceed,
    Batch,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    Edit(EditIntent),
    Navigate(NavigateIntent),
    Submit(SubmitIntent),
    Restart,
}

impl From<EditIntent> for Intent {
    fn from(intent: EditIntent) -> Self {
        Intent::Edit(intent)
    }
}

impl From<NavigateIntent> for Intent {
    fn from(intent: NavigateIntent) -> Self {
        Intent::Navigate(intent)
    }
}

impl From<SubmitIntent> for Intent {
    fn from(intent: SubmitIntent) -> Self {
        Intent::Submit(intent)
    }
}
