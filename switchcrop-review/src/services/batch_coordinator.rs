//! Batch review coordinator
//!
//! Owns one review session: the workflow state machine, the shared interval,
//! the file catalog and the spectrogram view. Every backend call behind a
//! workflow transition goes through here, and every failure is either handed
//! back as a local validation error or moves the workflow to `Failed`.
//!
//! Spectrogram responses are correlated by ticket, not by arrival order: only
//! the response for the most recent request, for the file still selected, is
//! rendered. Anything else is dropped on arrival.

use crate::error::{ReviewError, ReviewResult};
use crate::models::workflow::NO_FILES_PROCESSED;
use crate::models::{
    AnalyzedFile, AppliedInterval, BatchOutcome, Bound, Direction, EditIntent, FileCatalog,
    Interval, IntervalModel, IntervalParams, SpectrogramPayload, StagingPolicy, StagingReport,
    StateTransition, UploadedFile, WeightedAverageInterval, WorkflowEvent, WorkflowState,
    WorkflowStateMachine,
};
use crate::services::backend_client::{AnalysisBackend, Detection, FileListEntry, UploadAnalysis};
use crate::services::visualization::{RenderSurface, VisualizationAdapter};
use chrono::Utc;
use std::path::{Path, PathBuf};
use switchcrop_common::config::ReviewSection;
use switchcrop_common::events::{EventBus, ReviewEvent};
use uuid::Uuid;

/// Tuning for one coordinator
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewParams {
    pub interval: IntervalParams,
    pub staging: StagingPolicy,
    /// Ceiling of the implicit spectrogram frequency axis
    pub max_frequency_hz: f64,
}

impl Default for ReviewParams {
    fn default() -> Self {
        Self::from(&ReviewSection::default())
    }
}

impl From<&ReviewSection> for ReviewParams {
    fn from(section: &ReviewSection) -> Self {
        Self {
            interval: IntervalParams::from(section),
            staging: StagingPolicy::from(section),
            max_frequency_hz: section.max_frequency_hz,
        }
    }
}

/// Correlates a spectrogram response with the request that asked for it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpectrogramTicket {
    unique_filename: String,
    generation: u64,
}

impl SpectrogramTicket {
    pub fn unique_filename(&self) -> &str {
        &self.unique_filename
    }
}

/// What became of a spectrogram response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Rendered { unique_filename: String },
    /// Selection moved on before the response arrived
    Discarded { unique_filename: String },
}

/// Detection table shown while Reviewing
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewSummary {
    pub weighted_average: Interval,
    pub files: Vec<Detection>,
    pub total_files: usize,
}

pub struct BatchCoordinator<B: AnalysisBackend, S: RenderSurface> {
    backend: B,
    machine: WorkflowStateMachine,
    interval: IntervalModel,
    catalog: FileCatalog,
    visualization: VisualizationAdapter<S>,
    staging: StagingPolicy,
    staged: Vec<UploadedFile>,
    analysis: Option<UploadAnalysis>,
    /// Latest spectrogram request still allowed to render
    pending: Option<SpectrogramTicket>,
    next_generation: u64,
    event_bus: EventBus,
}

impl<B: AnalysisBackend, S: RenderSurface> BatchCoordinator<B, S> {
    pub fn new(backend: B, surface: S, params: ReviewParams, event_bus: EventBus) -> Self {
        Self {
            backend,
            machine: WorkflowStateMachine::new(),
            interval: IntervalModel::new(params.interval),
            catalog: FileCatalog::new(),
            visualization: VisualizationAdapter::new(surface, params.max_frequency_hz),
            staging: params.staging,
            staged: Vec::new(),
            analysis: None,
            pending: None,
            next_generation: 0,
            event_bus,
        }
    }

    // ------------------------------------------------------------------
    // Read access
    // ------------------------------------------------------------------

    pub fn session_id(&self) -> Uuid {
        self.machine.session_id()
    }

    pub fn state(&self) -> WorkflowState {
        self.machine.state()
    }

    pub fn failure_message(&self) -> Option<&str> {
        self.machine.failure_message()
    }

    pub fn outcome(&self) -> Option<&BatchOutcome> {
        self.machine.outcome()
    }

    pub fn interval(&self) -> Interval {
        self.interval.read()
    }

    pub fn catalog(&self) -> &FileCatalog {
        &self.catalog
    }

    pub fn staged(&self) -> &[UploadedFile] {
        &self.staged
    }

    pub fn visualization(&self) -> &VisualizationAdapter<S> {
        &self.visualization
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// Upload results, available from Reviewing until restart
    pub fn summary(&self) -> Option<ReviewSummary> {
        let analysis = self.analysis.as_ref()?;
        Some(ReviewSummary {
            weighted_average: analysis
                .weighted_average
                .map(|avg| avg.as_interval())
                .unwrap_or_else(|| self.interval.params().default_interval),
            files: analysis.detections.clone(),
            total_files: analysis.total_files,
        })
    }

    // ------------------------------------------------------------------
    // Staging and upload
    // ------------------------------------------------------------------

    /// Replace the staged selection with the supported files among `paths`
    ///
    /// A selection with nothing usable is a validation error and keeps the
    /// previous selection.
    pub async fn stage_files(&mut self, paths: &[PathBuf]) -> ReviewResult<StagingReport> {
        self.require(WorkflowState::Staging, "files_chosen")?;

        let report = self.staging.inspect(paths).await;
        for skipped in &report.skipped {
            tracing::warn!(path = %skipped.path.display(), reason = %skipped.reason, "Skipping selected file");
        }

        self.transition(WorkflowEvent::FilesChosen {
            count: report.accepted.len(),
        })?;

        self.staged = report.accepted.clone();
        tracing::info!(
            staged = self.staged.len(),
            bytes = report.total_bytes(),
            "Files staged"
        );
        self.event_bus.emit_lossy(ReviewEvent::FilesStaged {
            accepted: report.accepted.len(),
            skipped: report.skipped.len(),
            total_bytes: report.total_bytes(),
            timestamp: Utc::now(),
        });
        Ok(report)
    }

    /// Upload every staged file in one request
    pub async fn upload(&mut self) -> ReviewResult<ReviewSummary> {
        self.require(WorkflowState::Staging, "submit_upload")?;
        self.staging.check_upload(&self.staged)?;
        self.transition(WorkflowEvent::SubmitUpload {
            staged: self.staged.len(),
        })?;

        let analysis = match self.backend.upload(&self.staged).await {
            Ok(analysis) => analysis,
            Err(e) => {
                return Err(self.fail(e, |message| WorkflowEvent::UploadFailed { message }));
            }
        };

        if let Err(e) = validate_detections(&analysis) {
            return Err(self.fail(e, |message| WorkflowEvent::UploadFailed { message }));
        }

        self.transition(WorkflowEvent::UploadSucceeded {
            analyzed: analysis.detections.len(),
        })?;
        if self.state() == WorkflowState::Failed {
            self.announce_failure();
            return Err(ReviewError::BackendRejection(NO_FILES_PROCESSED.to_string()));
        }

        if let Some(average) = analysis.weighted_average {
            self.seed(average);
        }
        self.staged.clear();
        self.analysis = Some(analysis);

        self.summary()
            .ok_or_else(|| ReviewError::BackendRejection("Upload produced no summary".to_string()))
    }

    // ------------------------------------------------------------------
    // Reviewing → Editing
    // ------------------------------------------------------------------

    /// Fetch the session's file list, load the catalog and show the first file
    pub async fn proceed(&mut self) -> ReviewResult<Delivery> {
        self.require(WorkflowState::Reviewing, "proceed")?;

        let entries = match self.backend.file_list().await {
            Ok(entries) => entries,
            Err(e) => {
                return Err(self.fail(e, |message| WorkflowEvent::ProceedFailed { message }));
            }
        };

        let detections = self
            .analysis
            .as_ref()
            .map(|a| a.detections.as_slice())
            .unwrap_or_default();
        let files = build_catalog(&entries, detections);
        if files.is_empty() {
            let e = ReviewError::BackendRejection(
                "None of the uploaded files are available on the server".to_string(),
            );
            return Err(self.fail(e, |message| WorkflowEvent::ProceedFailed { message }));
        }

        tracing::info!(
            files = files.len(),
            listed = entries.len(),
            "Catalog loaded"
        );
        self.catalog.load(files);
        if let Some(average) = self.analysis.as_ref().and_then(|a| a.weighted_average) {
            self.seed(average);
        }

        self.transition(WorkflowEvent::Proceed)?;
        self.announce_selection();
        self.show_current().await
    }

    // ------------------------------------------------------------------
    // Spectrogram view
    // ------------------------------------------------------------------

    /// Start a request for the selected file's spectrogram
    ///
    /// Supersedes any earlier request: its response will be discarded.
    pub fn request_spectrogram(&mut self) -> Option<SpectrogramTicket> {
        let file = self.catalog.current()?;
        self.next_generation += 1;
        let ticket = SpectrogramTicket {
            unique_filename: file.unique_filename.clone(),
            generation: self.next_generation,
        };
        self.pending = Some(ticket.clone());
        Some(ticket)
    }

    /// Perform the backend read for a ticket; does not touch session state
    pub async fn fetch_spectrogram(
        &self,
        ticket: &SpectrogramTicket,
    ) -> ReviewResult<SpectrogramPayload> {
        self.backend.spectrogram(&ticket.unique_filename).await
    }

    /// Hand a response to the view if it still matches the selection
    pub fn deliver_spectrogram(
        &mut self,
        ticket: SpectrogramTicket,
        result: ReviewResult<SpectrogramPayload>,
    ) -> ReviewResult<Delivery> {
        if !self.is_current(&ticket) {
            tracing::warn!(
                unique_filename = %ticket.unique_filename,
                "Discarding stale spectrogram response"
            );
            self.event_bus.emit_lossy(ReviewEvent::SpectrogramDiscarded {
                unique_filename: ticket.unique_filename.clone(),
                timestamp: Utc::now(),
            });
            return Ok(Delivery::Discarded {
                unique_filename: ticket.unique_filename,
            });
        }
        self.pending = None;

        match result {
            Ok(payload) => {
                self.visualization.render(&payload, self.interval.read());
                tracing::debug!(
                    unique_filename = %ticket.unique_filename,
                    frames = payload.frame_count(),
                    bins = payload.bin_count(),
                    "Spectrogram rendered"
                );
                self.event_bus.emit_lossy(ReviewEvent::SpectrogramRendered {
                    unique_filename: ticket.unique_filename.clone(),
                    timestamp: Utc::now(),
                });
                Ok(Delivery::Rendered {
                    unique_filename: ticket.unique_filename,
                })
            }
            Err(e) if e.is_fatal() => {
                Err(self.fail(e, |message| WorkflowEvent::ViewFailed { message }))
            }
            Err(e) => Err(e),
        }
    }

    /// Request, fetch and deliver the selected file's spectrogram
    pub async fn show_current(&mut self) -> ReviewResult<Delivery> {
        self.require(WorkflowState::Editing, "show")?;
        let ticket = self
            .request_spectrogram()
            .ok_or_else(|| ReviewError::Validation("No file is selected".to_string()))?;
        let result = self.fetch_spectrogram(&ticket).await;
        self.deliver_spectrogram(ticket, result)
    }

    fn is_current(&self, ticket: &SpectrogramTicket) -> bool {
        self.state() == WorkflowState::Editing
            && self.pending.as_ref() == Some(ticket)
            && self
                .catalog
                .current()
                .map(|file| file.unique_filename == ticket.unique_filename)
                .unwrap_or(false)
    }

    // ------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------

    /// Move the cursor with wraparound; returns the newly selected file
    pub fn navigate(&mut self, direction: Direction) -> ReviewResult<Option<AnalyzedFile>> {
        self.require(WorkflowState::Editing, "navigate")?;
        let selected = self.catalog.navigate(direction).cloned();
        if selected.is_some() {
            self.pending = None;
            self.announce_selection();
        }
        Ok(selected)
    }

    /// Select a file by key; an unknown key is ignored and changes nothing
    pub fn select(&mut self, unique_filename: &str) -> ReviewResult<Option<AnalyzedFile>> {
        self.require(WorkflowState::Editing, "select")?;
        match self.catalog.select_by_key(unique_filename) {
            Ok(file) => {
                let file = file.clone();
                self.pending = None;
                self.announce_selection();
                Ok(Some(file))
            }
            Err(ReviewError::NotFound(key)) => {
                tracing::debug!(unique_filename = %key, "Ignoring selection of unknown file");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    // ------------------------------------------------------------------
    // Interval edits
    // ------------------------------------------------------------------

    /// Apply a typed edit and move the markers
    pub fn set_bound(&mut self, bound: Bound, value: f64) -> ReviewResult<AppliedInterval> {
        let state = self.state();
        if !matches!(state, WorkflowState::Reviewing | WorkflowState::Editing) {
            return Err(ReviewError::InvalidTransition {
                state,
                event: "edit",
            });
        }

        let applied = self.interval.set(bound, value)?;
        self.visualization.update(applied.interval);

        tracing::debug!(
            bound = %bound,
            value,
            start = applied.interval.start,
            end = applied.interval.end,
            deflected = applied.deflected,
            "Interval edited"
        );
        self.event_bus.emit_lossy(ReviewEvent::IntervalChanged {
            start: applied.interval.start,
            end: applied.interval.end,
            deflected: applied.deflected,
            timestamp: Utc::now(),
        });
        Ok(applied)
    }

    /// Apply a surface click at `time` to the nearest bound
    ///
    /// Returns `None` when nothing is rendered to click on.
    pub fn click(&mut self, time: f64) -> ReviewResult<Option<AppliedInterval>> {
        match self.visualization.on_click(time) {
            Some(EditIntent::Set { bound, value }) => self.set_bound(bound, value).map(Some),
            Some(EditIntent::Click { .. }) | None => Ok(None),
        }
    }

    // ------------------------------------------------------------------
    // Batch submission
    // ------------------------------------------------------------------

    /// Send the final interval for cropping
    pub async fn submit_batch(&mut self) -> ReviewResult<BatchOutcome> {
        let interval = self.interval.read();
        self.transition(WorkflowEvent::SubmitBatch { interval })?;

        let outcome = match self.backend.process_batch(interval).await {
            Ok(outcome) => outcome,
            Err(e) => {
                return Err(self.fail(e, |message| WorkflowEvent::BatchFailed { message }));
            }
        };

        self.transition(WorkflowEvent::BatchSucceeded(outcome.clone()))?;
        tracing::info!(
            processed_files = outcome.processed_files,
            failed_files = outcome.failed_files,
            download_url = %outcome.download.url,
            "Batch complete"
        );
        self.event_bus.emit_lossy(ReviewEvent::BatchCompleted {
            processed_files: outcome.processed_files,
            failed_files: outcome.failed_files,
            download_url: outcome.download.url.clone(),
            timestamp: Utc::now(),
        });
        Ok(outcome)
    }

    /// Save the finished archive into `dest_dir`
    ///
    /// Failure is reported to the caller; the workflow stays BatchComplete.
    pub async fn download_archive(&self, dest_dir: &Path) -> ReviewResult<PathBuf> {
        let outcome = self.outcome().ok_or(ReviewError::InvalidTransition {
            state: self.state(),
            event: "download",
        })?;

        // Never let a server-supplied name escape dest_dir
        let filename = Path::new(&outcome.download.filename)
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_else(|| "processed_audio.zip".into());

        let bytes = self.backend.download(&outcome.download).await?;
        tokio::fs::create_dir_all(dest_dir).await?;
        let path = dest_dir.join(filename);
        tokio::fs::write(&path, &bytes).await?;

        tracing::info!(path = %path.display(), bytes = bytes.len(), "Archive saved");
        Ok(path)
    }

    // ------------------------------------------------------------------
    // Restart
    // ------------------------------------------------------------------

    /// Leave Failed or BatchComplete and start a clean session in Staging
    pub fn restart(&mut self) -> ReviewResult<()> {
        self.transition(WorkflowEvent::Restart)?;

        self.visualization.dispose();
        self.catalog.clear();
        self.interval.reset();
        self.staged.clear();
        self.analysis = None;
        self.pending = None;

        let interval = self.interval.read();
        self.event_bus.emit_lossy(ReviewEvent::IntervalChanged {
            start: interval.start,
            end: interval.end,
            deflected: false,
            timestamp: Utc::now(),
        });
        Ok(())
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn require(&self, expected: WorkflowState, event: &'static str) -> ReviewResult<()> {
        let state = self.state();
        if state != expected {
            return Err(ReviewError::InvalidTransition { state, event });
        }
        Ok(())
    }

    fn transition(&mut self, event: WorkflowEvent) -> ReviewResult<StateTransition> {
        let transition = self.machine.apply(event)?;
        if transition.changed() {
            self.event_bus.emit_lossy(ReviewEvent::StateChanged {
                session_id: transition.session_id,
                old_state: transition.old_state,
                new_state: transition.new_state,
                timestamp: transition.transitioned_at,
            });
        }
        Ok(transition)
    }

    /// Route a backend failure into Failed and hand the error back
    fn fail(
        &mut self,
        error: ReviewError,
        event: impl FnOnce(String) -> WorkflowEvent,
    ) -> ReviewError {
        let message = error.user_message();
        tracing::error!(session_id = %self.session_id(), error = %error, "Workflow failed");
        match self.transition(event(message)) {
            Ok(_) => self.announce_failure(),
            Err(e) => tracing::error!("Could not record failure: {}", e),
        }
        error
    }

    fn announce_failure(&self) {
        if let Some(message) = self.failure_message() {
            self.event_bus.emit_lossy(ReviewEvent::WorkflowFailed {
                message: message.to_string(),
                timestamp: Utc::now(),
            });
        }
    }

    fn announce_selection(&self) {
        if let Some(file) = self.catalog.current() {
            tracing::debug!(
                index = self.catalog.current_index(),
                unique_filename = %file.unique_filename,
                "File selected"
            );
            self.event_bus.emit_lossy(ReviewEvent::FileSelected {
                index: self.catalog.current_index(),
                unique_filename: file.unique_filename.clone(),
                timestamp: Utc::now(),
            });
        }
    }

    fn seed(&mut self, average: WeightedAverageInterval) {
        self.interval.seed_from(average);
        let interval = self.interval.read();
        self.visualization.update(interval);
        self.event_bus.emit_lossy(ReviewEvent::IntervalChanged {
            start: interval.start,
            end: interval.end,
            deflected: false,
            timestamp: Utc::now(),
        });
    }
}

/// Every analyzed file must carry a usable detection, and a non-empty
/// analysis must come with a weighted average
fn validate_detections(analysis: &UploadAnalysis) -> ReviewResult<()> {
    for detection in &analysis.detections {
        AnalyzedFile::new(
            detection.filename.as_str(),
            detection.unique_filename.clone().unwrap_or_default(),
            detection.duration,
            detection.detected_start,
            detection.detected_end,
        )?;
    }
    if !analysis.detections.is_empty() && analysis.weighted_average.is_none() {
        return Err(ReviewError::BackendRejection(
            "Upload response has no weighted_average".to_string(),
        ));
    }
    Ok(())
}

/// Join the server's file list (authoritative order) with the upload
/// detection table
///
/// Entries match on `unique_filename`; detections without a key match on
/// `filename`, newest list entry first. Unmatched entries belong to earlier
/// uploads and are skipped.
pub fn build_catalog(entries: &[FileListEntry], detections: &[Detection]) -> Vec<AnalyzedFile> {
    let mut claimed = vec![false; detections.len()];
    let mut matched: Vec<Option<usize>> = vec![None; entries.len()];

    for (i, entry) in entries.iter().enumerate() {
        let found = (0..detections.len()).find(|&j| {
            !claimed[j]
                && detections[j].unique_filename.as_deref() == Some(entry.unique_filename.as_str())
        });
        if let Some(j) = found {
            claimed[j] = true;
            matched[i] = Some(j);
        }
    }

    for (i, entry) in entries.iter().enumerate().rev() {
        if matched[i].is_some() {
            continue;
        }
        let found = (0..detections.len()).find(|&j| {
            !claimed[j]
                && detections[j].unique_filename.is_none()
                && detections[j].filename == entry.filename
        });
        if let Some(j) = found {
            claimed[j] = true;
            matched[i] = Some(j);
        }
    }

    entries
        .iter()
        .zip(matched)
        .filter_map(|(entry, found)| {
            let Some(j) = found else {
                tracing::warn!(
                    unique_filename = %entry.unique_filename,
                    "Skipping file not part of this upload"
                );
                return None;
            };
            let detection = &detections[j];
            match AnalyzedFile::new(
                entry.filename.as_str(),
                entry.unique_filename.as_str(),
                detection.duration,
                detection.detected_start,
                detection.detected_end,
            ) {
                Ok(file) => Some(file),
                Err(e) => {
                    tracing::warn!(unique_filename = %entry.unique_filename, "Skipping file: {}", e);
                    None
                }
            }
        })
        .collect()
}
