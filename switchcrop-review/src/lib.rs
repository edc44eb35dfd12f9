//! switchcrop-review library interface
//!
//! Interval review workflow for batch audio cropping: stage recordings,
//! upload them for detection, review and adjust one shared crop interval
//! against each file's spectrogram, then submit the batch.

pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod services;
pub mod session;

pub use crate::error::{ReviewError, ReviewResult};
pub use crate::session::{Outcome, ReviewSession};
