//! Review data models

pub mod catalog;
pub mod intents;
pub mod interval;
pub mod spectrogram;
pub mod staging;
pub mod workflow;

pub use catalog::{AnalyzedFile, Direction, FileCatalog};
pub use intents::{EditIntent, Intent, NavigateIntent, SubmitIntent};
pub use interval::{
    AppliedInterval, Bound, Interval, IntervalModel, IntervalParams, WeightedAverageInterval,
};
pub use spectrogram::SpectrogramPayload;
pub use staging::{SkipReason, SkippedFile, StagingPolicy, StagingReport, UploadedFile};
pub use workflow::{
    BatchOutcome, DownloadReference, StateTransition, WorkflowEvent, WorkflowState,
    WorkflowStateMachine,
};
