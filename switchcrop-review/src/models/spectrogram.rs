//! Spectrogram payload for one file
//!
//! Fetched lazily per file and held only for the duration of a render.

use crate::error::{ReviewError, ReviewResult};

/// Mel spectrogram in dB as served by the backend
#[derive(Debug, Clone, PartialEq)]
pub struct SpectrogramPayload {
    /// Key this payload was requested for
    pub unique_filename: String,
    pub filename: String,
    /// Seconds, one entry per column
    pub time_frames: Vec<f64>,
    /// Rows are frequency bins (low to high), columns follow `time_frames`
    pub mel_spec_db: Vec<Vec<f64>>,
    /// Analysis sample rate, when the backend reports it
    pub sample_rate: Option<u32>,
}

impl SpectrogramPayload {
    /// Check that every row has one value per time frame
    pub fn validate(&self) -> ReviewResult<()> {
        let columns = self.time_frames.len();
        if let Some((row, values)) = self
            .mel_spec_db
            .iter()
            .enumerate()
            .find(|(_, values)| values.len() != columns)
        {
            return Err(ReviewError::BackendRejection(format!(
                "spectrogram for {} is ragged: bin {} has {} values for {} frames",
                self.filename,
                row,
                values.len(),
                columns
            )));
        }
        Ok(())
    }

    pub fn bin_count(&self) -> usize {
        self.mel_spec_db.len()
    }

    pub fn frame_count(&self) -> usize {
        self.time_frames.len()
    }

    /// Time of the last frame, 0 for an empty payload
    pub fn duration(&self) -> f64 {
        self.time_frames.last().copied().unwrap_or(0.0)
    }

    /// Implicit frequency axis: bins spread evenly over `0..=max_frequency_hz`
    pub fn frequency_axis(&self, max_frequency_hz: f64) -> Vec<f64> {
        frequency_axis(self.bin_count(), max_frequency_hz)
    }
}

/// Evenly spaced frequencies for `bins` rows, first at 0 Hz and last at the ceiling
pub fn frequency_axis(bins: usize, max_frequency_hz: f64) -> Vec<f64> {
    match bins {
        0 => Vec::new(),
        1 => vec![0.0],
        n => (0..n)
            .map(|i| i as f64 * max_frequency_hz / (n - 1) as f64)
            .collect(),
    }
}
