//! Analyzed file catalog with a wrapping navigation cursor

use crate::error::{ReviewError, ReviewResult};
use crate::models::interval::Interval;
use serde::{Deserialize, Serialize};

/// Largest detected-end overshoot past the duration treated as rounding (seconds)
pub const END_ROUNDING_TOLERANCE: f64 = 0.05;

/// One file as analyzed by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzedFile {
    /// Display name
    pub filename: String,
    /// Stable server-side key (opaque)
    pub unique_filename: String,
    /// Seconds, > 0
    pub duration: f64,
    pub detected_start: f64,
    pub detected_end: f64,
}

impl AnalyzedFile {
    /// Build an entry, enforcing `0 <= detected_start < detected_end <= duration`
    ///
    /// The backend rounds both values independently, so a detected end up to
    /// [`END_ROUNDING_TOLERANCE`] past the duration is clamped to it. A larger
    /// overshoot is rejected like any other out-of-range detection.
    pub fn new(
        filename: impl Into<String>,
        unique_filename: impl Into<String>,
        duration: f64,
        detected_start: f64,
        detected_end: f64,
    ) -> ReviewResult<Self> {
        let filename = filename.into();
        if !duration.is_finite() || duration <= 0.0 {
            return Err(ReviewError::BackendRejection(format!(
                "{}: duration must be positive, got {}",
                filename, duration
            )));
        }

        let overshoot = detected_end - duration;
        let detected_end = if overshoot > 0.0 && overshoot <= END_ROUNDING_TOLERANCE {
            duration
        } else {
            detected_end
        };
        let detected = Interval::new(detected_start, detected_end);
        if !detected.is_valid() || detected_start < 0.0 || detected_end > duration {
            return Err(ReviewError::BackendRejection(format!(
                "{}: detected interval {}..{} does not fit in 0..{}",
                filename, detected_start, detected_end, duration
            )));
        }

        Ok(Self {
            filename,
            unique_filename: unique_filename.into(),
            duration,
            detected_start,
            detected_end,
        })
    }

    pub fn detected_interval(&self) -> Interval {
        Interval::new(self.detected_start, self.detected_end)
    }
}

/// Navigation direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

/// Ordered catalog of analyzed files (server response order)
///
/// `current_index` is always in range while the catalog is non-empty.
#[derive(Debug, Clone, Default)]
pub struct FileCatalog {
    files: Vec<AnalyzedFile>,
    current_index: usize,
}

impl FileCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the catalog and move the cursor to the first file
    pub fn load(&mut self, files: Vec<AnalyzedFile>) {
        self.files = files;
        self.current_index = 0;
    }

    pub fn clear(&mut self) {
        self.load(Vec::new());
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn files(&self) -> &[AnalyzedFile] {
        &self.files
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current(&self) -> Option<&AnalyzedFile> {
        self.files.get(self.current_index)
    }

    /// Step the cursor with wraparound; no-op on an empty catalog
    pub fn navigate(&mut self, direction: Direction) -> Option<&AnalyzedFile> {
        let len = self.files.len();
        if len == 0 {
            return None;
        }
        self.current_index = match direction {
            Direction::Forward => (self.current_index + 1) % len,
            Direction::Backward => (self.current_index + len - 1) % len,
        };
        self.current()
    }

    /// Move the cursor to the file with this key
    ///
    /// On a miss the cursor is left where it was.
    pub fn select_by_key(&mut self, unique_filename: &str) -> ReviewResult<&AnalyzedFile> {
        let index = self
            .files
            .iter()
            .position(|file| file.unique_filename == unique_filename)
            .ok_or_else(|| ReviewError::NotFound(unique_filename.to_string()))?;
        self.current_index = index;
        Ok(&self.files[index])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(key: &str) -> AnalyzedFile {
        AnalyzedFile::new(format!("{}.wav", key), key, 12.0, 5.5, 6.5).unwrap()
    }

    fn catalog(keys: &[&str]) -> FileCatalog {
        let mut catalog = FileCatalog::new();
        catalog.load(keys.iter().map(|k| file(k)).collect());
        catalog
    }

    #[test]
    fn test_load_resets_cursor() {
        let mut catalog = catalog(&["a", "b", "c"]);
        catalog.navigate(Direction::Forward);
        catalog.load(vec![file("x"), file("y")]);
        assert_eq!(catalog.current_index(), 0);
        assert_eq!(catalog.current().unwrap().unique_filename, "x");
    }

    #[test]
    fn test_forward_wraps_to_first() {
        let mut catalog = catalog(&["a", "b", "c"]);
        catalog.navigate(Direction::Forward);
        catalog.navigate(Direction::Forward);
        assert_eq!(catalog.current_index(), 2);
        let next = catalog.navigate(Direction::Forward).unwrap();
        assert_eq!(next.unique_filename, "a");
        assert_eq!(catalog.current_index(), 0);
    }

    #[test]
    fn test_backward_wraps_to_last() {
        let mut catalog = catalog(&["a", "b", "c"]);
        let prev = catalog.navigate(Direction::Backward).unwrap();
        assert_eq!(prev.unique_filename, "c");
        assert_eq!(catalog.current_index(), 2);
    }

    #[test]
    fn test_single_file_navigation_stays_put() {
        let mut catalog = catalog(&["only"]);
        assert_eq!(catalog.navigate(Direction::Forward).unwrap().unique_filename, "only");
        assert_eq!(catalog.navigate(Direction::Backward).unwrap().unique_filename, "only");
    }

    #[test]
    fn test_empty_catalog_navigation_is_noop() {
        let mut catalog = FileCatalog::new();
        assert!(catalog.navigate(Direction::Forward).is_none());
        assert!(catalog.navigate(Direction::Backward).is_none());
        assert_eq!(catalog.current_index(), 0);
        assert!(catalog.current().is_none());
    }

    #[test]
    fn test_select_by_key() {
        let mut catalog = catalog(&["a", "b", "c"]);
        let selected = catalog.select_by_key("c").unwrap();
        assert_eq!(selected.filename, "c.wav");
        assert_eq!(catalog.current_index(), 2);
    }

    #[test]
    fn test_select_miss_leaves_cursor() {
        let mut catalog = catalog(&["a", "b", "c"]);
        catalog.navigate(Direction::Forward);
        let result = catalog.select_by_key("zzz");
        assert!(matches!(result, Err(ReviewError::NotFound(_))));
        assert_eq!(catalog.current_index(), 1);
    }

    #[test]
    fn test_detected_end_overshoot_is_clamped() {
        let file = AnalyzedFile::new("short.wav", "k", 6.97, 5.5, 7.0).unwrap();
        assert_eq!(file.detected_end, 6.97);

        let edge = AnalyzedFile::new("edge.wav", "e", 6.0, 5.0, 6.04).unwrap();
        assert_eq!(edge.detected_end, 6.0);
    }

    #[test]
    fn test_detected_end_far_past_duration_is_rejected() {
        let result = AnalyzedFile::new("long.wav", "l", 6.0, 5.0, 6.5);
        assert!(matches!(result, Err(ReviewError::BackendRejection(_))));
        assert!(AnalyzedFile::new("long.wav", "l", 6.0, 5.0, 7.0).is_err());
    }

    #[test]
    fn test_invalid_detection_is_rejected() {
        assert!(AnalyzedFile::new("a.wav", "a", 0.0, 0.0, 1.0).is_err());
        assert!(AnalyzedFile::new("a.wav", "a", 10.0, -1.0, 1.0).is_err());
        assert!(AnalyzedFile::new("a.wav", "a", 10.0, 6.0, 6.0).is_err());
        assert!(AnalyzedFile::new("a.wav", "a", 5.0, 5.5, 6.5).is_err());
    }
}
