//! Text rendering surface for terminals
//!
//! Draws a one-line heatmap strip (mean dB per column, low energy to high on
//! a glyph ramp) with a time ruler, followed by a marker row showing `S` and
//! `E` under the interval bounds. Relayout rewrites only the marker row.

use crate::models::Bound;
use crate::services::visualization::{BoundaryMarker, Heatmap, RenderSurface};
use std::io::Write;
use switchcrop_common::human_time::{format_interval, format_seconds};

const GLYPH_RAMP: &[char] = &[' ', '.', ':', '-', '=', '+', '*', '#', '%', '@'];
const DEFAULT_WIDTH: usize = 72;

#[derive(Debug, Clone, Copy)]
struct Axis {
    start: f64,
    end: f64,
}

pub struct TerminalSurface<W: Write> {
    out: W,
    width: usize,
    axis: Option<Axis>,
}

impl<W: Write> TerminalSurface<W> {
    pub fn new(out: W) -> Self {
        Self::with_width(out, DEFAULT_WIDTH)
    }

    pub fn with_width(out: W, width: usize) -> Self {
        Self {
            out,
            width: width.max(8),
            axis: None,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Column for a time, clamped to the strip
    fn column(&self, axis: Axis, time: f64) -> usize {
        let span = axis.end - axis.start;
        if span <= 0.0 || !time.is_finite() {
            return 0;
        }
        let fraction = ((time - axis.start) / span).clamp(0.0, 1.0);
        ((fraction * (self.width - 1) as f64).round() as usize).min(self.width - 1)
    }

    fn strip(&self, heatmap: &Heatmap<'_>) -> String {
        let frames = heatmap.times.len();
        if frames == 0 || heatmap.magnitudes_db.is_empty() {
            return " ".repeat(self.width);
        }

        // Mean over frequency bins for every frame
        let frame_means: Vec<f64> = (0..frames)
            .map(|f| {
                let (sum, n) = heatmap
                    .magnitudes_db
                    .iter()
                    .filter_map(|row| row.get(f).copied())
                    .filter(|v| v.is_finite())
                    .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
                if n == 0 {
                    f64::NAN
                } else {
                    sum / n as f64
                }
            })
            .collect();

        let (lo, hi) = frame_means
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                (lo.min(v), hi.max(v))
            });

        (0..self.width)
            .map(|col| {
                let first = col * frames / self.width;
                let last = ((col + 1) * frames / self.width).max(first + 1).min(frames);
                let values: Vec<f64> = frame_means[first..last]
                    .iter()
                    .copied()
                    .filter(|v| v.is_finite())
                    .collect();
                if values.is_empty() || !lo.is_finite() {
                    return ' ';
                }
                let mean = values.iter().sum::<f64>() / values.len() as f64;
                let level = if hi > lo { (mean - lo) / (hi - lo) } else { 1.0 };
                let index = (level * (GLYPH_RAMP.len() - 1) as f64).round() as usize;
                GLYPH_RAMP[index.min(GLYPH_RAMP.len() - 1)]
            })
            .collect()
    }

    fn marker_row(&self, axis: Axis, markers: &[BoundaryMarker; 2]) -> String {
        let mut row = vec!['-'; self.width];
        for marker in markers {
            let glyph = match marker.bound {
                Bound::Start => 'S',
                Bound::End => 'E',
            };
            let col = self.column(axis, marker.time);
            // Both bounds in one column: keep the start visible
            if row[col] != 'S' {
                row[col] = glyph;
            }
        }
        row.into_iter().collect()
    }

    fn write_markers(&mut self, markers: &[BoundaryMarker; 2]) {
        let Some(axis) = self.axis else {
            return;
        };
        let row = self.marker_row(axis, markers);
        let result = writeln!(
            self.out,
            "{}\n  interval {}",
            row,
            format_interval(markers[0].time, markers[1].time)
        )
        .and_then(|_| self.out.flush());
        if let Err(e) = result {
            tracing::warn!("Terminal surface write failed: {}", e);
        }
    }
}

impl<W: Write> RenderSurface for TerminalSurface<W> {
    fn render(&mut self, heatmap: &Heatmap<'_>, markers: &[BoundaryMarker; 2]) {
        let axis = Axis {
            start: heatmap.times.first().copied().unwrap_or(0.0),
            end: heatmap.times.last().copied().unwrap_or(0.0),
        };
        self.axis = Some(axis);

        let strip = self.strip(heatmap);
        let top_hz = heatmap.frequencies.last().copied().unwrap_or(0.0);
        let ruler_right = format_seconds(axis.end);
        let ruler = format!(
            "{:<width$}{}",
            format_seconds(axis.start),
            ruler_right,
            width = self.width.saturating_sub(ruler_right.len())
        );

        let result = writeln!(
            self.out,
            "== {} ({} bins, 0-{:.0} Hz)\n{}\n{}",
            heatmap.title,
            heatmap.frequencies.len(),
            top_hz,
            strip,
            ruler
        );
        if let Err(e) = result {
            tracing::warn!("Terminal surface write failed: {}", e);
        }
        self.write_markers(markers);
    }

    fn relayout(&mut self, markers: &[BoundaryMarker; 2]) {
        self.write_markers(markers);
    }

    fn purge(&mut self) {
        self.axis = None;
    }
}
