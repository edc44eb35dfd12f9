//! Shared crop interval
//!
//! One `[start, end)` interval applies to the whole batch. Every mutation keeps
//! `start < end`: an edit that would invert the pair moves the opposite bound
//! to `value ± margin` instead of being dropped.

use crate::error::{ReviewError, ReviewResult};
use serde::{Deserialize, Serialize};
use switchcrop_common::config::ReviewSection;

/// Which end of the interval an edit targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bound {
    Start,
    End,
}

impl std::fmt::Display for Bound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Bound::Start => f.write_str("start"),
            Bound::End => f.write_str("end"),
        }
    }
}

/// An ordered pair of times in seconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    pub start: f64,
    pub end: f64,
}

impl Interval {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    /// Both bounds finite and strictly ordered
    pub fn is_valid(&self) -> bool {
        self.start.is_finite() && self.end.is_finite() && self.start < self.end
    }

    pub fn length(&self) -> f64 {
        self.end - self.start
    }
}

/// Backend summary of all detected intervals, used as the initial edit target
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightedAverageInterval {
    pub start: f64,
    pub end: f64,
}

impl WeightedAverageInterval {
    /// Accept a backend value only if it is a valid interval
    pub fn new(start: f64, end: f64) -> ReviewResult<Self> {
        if !Interval::new(start, end).is_valid() {
            return Err(ReviewError::BackendRejection(format!(
                "weighted average interval is not ordered: {}..{}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    pub fn as_interval(&self) -> Interval {
        Interval::new(self.start, self.end)
    }
}

/// Named parameters of the interval model
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntervalParams {
    /// How far the opposite bound is pushed when an edit would invert the pair
    pub deflection_margin: f64,
    /// Interval in force before seeding and after reset
    pub default_interval: Interval,
}

impl Default for IntervalParams {
    fn default() -> Self {
        Self {
            deflection_margin: 0.5,
            default_interval: Interval::new(5.5, 6.5),
        }
    }
}

impl From<&ReviewSection> for IntervalParams {
    fn from(section: &ReviewSection) -> Self {
        Self {
            deflection_margin: section.deflection_margin,
            default_interval: Interval::new(section.default_start, section.default_end),
        }
    }
}

/// Result of a successful `set`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AppliedInterval {
    pub interval: Interval,
    /// The bound that was edited
    pub bound: Bound,
    /// True when the opposite bound was moved to preserve ordering
    pub deflected: bool,
}

/// Mutable shared interval
#[derive(Debug, Clone)]
pub struct IntervalModel {
    params: IntervalParams,
    current: Interval,
}

impl IntervalModel {
    pub fn new(params: IntervalParams) -> Self {
        Self {
            current: params.default_interval,
            params,
        }
    }

    pub fn params(&self) -> &IntervalParams {
        &self.params
    }

    /// Current `(start, end)`
    pub fn read(&self) -> Interval {
        self.current
    }

    /// Set one bound, deflecting the other if ordering would break
    ///
    /// Editing start to `v >= end` yields `(v, v + margin)`; editing end to
    /// `v <= start` yields `(v - margin, v)`. Non-finite values, and values so
    /// large the margin cannot separate the pair, are rejected unchanged.
    pub fn set(&mut self, bound: Bound, value: f64) -> ReviewResult<AppliedInterval> {
        if !value.is_finite() {
            return Err(ReviewError::Rejected(format!(
                "{} must be a finite number of seconds, got {}",
                bound, value
            )));
        }

        let margin = self.params.deflection_margin;
        let (candidate, deflected) = match bound {
            Bound::Start if value < self.current.end => {
                (Interval::new(value, self.current.end), false)
            }
            Bound::Start => (Interval::new(value, value + margin), true),
            Bound::End if value > self.current.start => {
                (Interval::new(self.current.start, value), false)
            }
            Bound::End => (Interval::new(value - margin, value), true),
        };

        if !candidate.is_valid() {
            return Err(ReviewError::Rejected(format!(
                "{} value {} leaves no room for a {}s margin",
                bound, value, margin
            )));
        }

        self.current = candidate;
        Ok(AppliedInterval {
            interval: candidate,
            bound,
            deflected,
        })
    }

    /// Replace both bounds at once from the backend's weighted average
    pub fn seed_from(&mut self, average: WeightedAverageInterval) {
        self.current = average.as_interval();
    }

    /// Back to the configured default interval
    pub fn reset(&mut self) {
        self.current = self.params.default_interval;
    }
}

impl Default for IntervalModel {
    fn default() -> Self {
        Self::new(IntervalParams::default())
    }
}
