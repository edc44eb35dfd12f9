//! Intent dispatcher
//!
//! Front ends feed [`Intent`]s to [`ReviewSession::dispatch`] one at a time.
//! Each intent is fully applied (including any backend round trip) before
//! the next one is looked at, so intents take effect in the order given.

use crate::error::ReviewResult;
use crate::models::{
    AnalyzedFile, AppliedInterval, BatchOutcome, Direction, EditIntent, Intent, NavigateIntent,
    StagingReport, SubmitIntent, WorkflowState,
};
use crate::services::{AnalysisBackend, BatchCoordinator, Delivery, RenderSurface, ReviewSummary};
use std::path::{Path, PathBuf};

/// What a dispatched intent did
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Interval after a typed edit or a click
    IntervalChanged(AppliedInterval),
    /// Selection moved and the new file's spectrogram was requested
    Selected { file: AnalyzedFile, delivery: Delivery },
    Uploaded(ReviewSummary),
    /// Entered Editing with the first file shown
    Proceeded(Delivery),
    BatchCompleted(BatchOutcome),
    Restarted,
    /// Intent had no effect (click with nothing rendered, unknown file key)
    Ignored,
}

pub struct ReviewSession<B: AnalysisBackend, S: RenderSurface> {
    coordinator: BatchCoordinator<B, S>,
}

impl<B: AnalysisBackend, S: RenderSurface> ReviewSession<B, S> {
    pub fn new(coordinator: BatchCoordinator<B, S>) -> Self {
        Self { coordinator }
    }

    pub fn coordinator(&self) -> &BatchCoordinator<B, S> {
        &self.coordinator
    }

    pub fn coordinator_mut(&mut self) -> &mut BatchCoordinator<B, S> {
        &mut self.coordinator
    }

    pub fn state(&self) -> WorkflowState {
        self.coordinator.state()
    }

    /// Stage local files; only valid while Staging
    pub async fn stage(&mut self, paths: &[PathBuf]) -> ReviewResult<StagingReport> {
        self.coordinator.stage_files(paths).await
    }

    /// Fetch the selected file's spectrogram again
    pub async fn show(&mut self) -> ReviewResult<Delivery> {
        self.coordinator.show_current().await
    }

    /// Save the batch archive into `dest_dir`
    pub async fn download(&self, dest_dir: &Path) -> ReviewResult<PathBuf> {
        self.coordinator.download_archive(dest_dir).await
    }

    /// Apply one intent
    pub async fn dispatch(&mut self, intent: Intent) -> ReviewResult<Outcome> {
        tracing::debug!(?intent, state = %self.state(), "Dispatching intent");

        match intent {
            Intent::Edit(EditIntent::Set { bound, value }) => self
                .coordinator
                .set_bound(bound, value)
                .map(Outcome::IntervalChanged),
            Intent::Edit(EditIntent::Click { time }) => Ok(self
                .coordinator
                .click(time)?
                .map(Outcome::IntervalChanged)
                .unwrap_or(Outcome::Ignored)),
            Intent::Navigate(navigate) => self.navigate(navigate).await,
            Intent::Submit(SubmitIntent::Upload) => {
                self.coordinator.upload().await.map(Outcome::Uploaded)
            }
            Intent::Submit(SubmitIntent::Proceed) => {
                self.coordinator.proceed().await.map(Outcome::Proceeded)
            }
            Intent::Submit(SubmitIntent::Batch) => {
                self.coordinator.submit_batch().await.map(Outcome::BatchCompleted)
            }
            Intent::Restart => self.coordinator.restart().map(|_| Outcome::Restarted),
        }
    }

    async fn navigate(&mut self, intent: NavigateIntent) -> ReviewResult<Outcome> {
        let selected = match intent {
            NavigateIntent::Next => self.coordinator.navigate(Direction::Forward)?,
            NavigateIntent::Previous => self.coordinator.navigate(Direction::Backward)?,
            NavigateIntent::Select(key) => self.coordinator.select(&key)?,
        };

        match selected {
            Some(file) => {
                let delivery = self.coordinator.show_current().await?;
                Ok(Outcome::Selected { file, delivery })
            }
            None => Ok(Outcome::Ignored),
        }
    }
}
