//! Services behind the review workflow
//!
//! - `backend_client`: HTTP access to the analysis backend
//! - `batch_coordinator`: session orchestration across the workflow stages
//! - `visualization`: spectrogram view and click-to-bound mapping
//! - `terminal_surface`: text rendering for the command-line front end

pub mod backend_client;
pub mod batch_coordinator;
pub mod terminal_surface;
pub mod visualization;

pub use backend_client::{AnalysisBackend, Detection, FileListEntry, HttpBackend, UploadAnalysis};
pub use batch_coordinator::{
    BatchCoordinator, Delivery, ReviewParams, ReviewSummary, SpectrogramTicket,
};
pub use terminal_surface::TerminalSurface;
pub use visualization::{nearest_bound, BoundaryMarker, Heatmap, RenderSurface, VisualizationAdapter};
