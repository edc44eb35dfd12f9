//! Spectrogram view with the two interval boundary markers
//!
//! The adapter turns a [`SpectrogramPayload`] plus the current interval into
//! calls against a [`RenderSurface`] and turns surface clicks back into
//! [`EditIntent`]s. It never writes to the interval model itself.

use crate::models::{Bound, EditIntent, Interval, SpectrogramPayload};

/// Vertical line marking one end of the interval
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundaryMarker {
    pub bound: Bound,
    pub time: f64,
}

impl BoundaryMarker {
    pub fn pair(interval: Interval) -> [BoundaryMarker; 2] {
        [
            BoundaryMarker {
                bound: Bound::Start,
                time: interval.start,
            },
            BoundaryMarker {
                bound: Bound::End,
                time: interval.end,
            },
        ]
    }
}

/// Heatmap data handed to the surface for one full draw
#[derive(Debug, Clone)]
pub struct Heatmap<'a> {
    pub title: &'a str,
    /// Seconds, x axis
    pub times: &'a [f64],
    /// Hz, y axis, one per row of `magnitudes_db`
    pub frequencies: Vec<f64>,
    pub magnitudes_db: &'a [Vec<f64>],
}

/// Plotting capability the adapter draws on
pub trait RenderSurface {
    /// Full draw: heatmap plus markers
    fn render(&mut self, heatmap: &Heatmap<'_>, markers: &[BoundaryMarker; 2]);

    /// Move the markers without redrawing the heatmap
    fn relayout(&mut self, markers: &[BoundaryMarker; 2]);

    /// Release everything drawn so far
    fn purge(&mut self);
}

/// The bound a click at `time` should move
///
/// Start only when the click is strictly closer to it; ties go to end.
pub fn nearest_bound(time: f64, interval: Interval) -> Bound {
    let dist_to_start = (time - interval.start).abs();
    let dist_to_end = (time - interval.end).abs();
    if dist_to_start < dist_to_end {
        Bound::Start
    } else {
        Bound::End
    }
}

#[derive(Debug, Clone)]
struct RenderedView {
    unique_filename: String,
    interval: Interval,
}

pub struct VisualizationAdapter<S: RenderSurface> {
    surface: S,
    max_frequency_hz: f64,
    view: Option<RenderedView>,
}

impl<S: RenderSurface> VisualizationAdapter<S> {
    pub fn new(surface: S, max_frequency_hz: f64) -> Self {
        Self {
            surface,
            max_frequency_hz,
            view: None,
        }
    }

    /// Draw the payload with markers at the interval bounds
    ///
    /// Clicks are accepted from here until the next `dispose`.
    pub fn render(&mut self, payload: &SpectrogramPayload, interval: Interval) {
        let heatmap = Heatmap {
            title: &payload.filename,
            times: &payload.time_frames,
            frequencies: payload.frequency_axis(self.max_frequency_hz),
            magnitudes_db: &payload.mel_spec_db,
        };
        self.surface.render(&heatmap, &BoundaryMarker::pair(interval));
        self.view = Some(RenderedView {
            unique_filename: payload.unique_filename.clone(),
            interval,
        });
    }

    /// Reposition the markers in place
    ///
    /// Returns false when nothing is rendered; the next `render` picks up the
    /// interval instead.
    pub fn update(&mut self, interval: Interval) -> bool {
        match self.view.as_mut() {
            Some(view) => {
                view.interval = interval;
                self.surface.relayout(&BoundaryMarker::pair(interval));
                true
            }
            None => false,
        }
    }

    /// Translate a click into an edit of the nearest bound
    pub fn on_click(&self, time: f64) -> Option<EditIntent> {
        let view = self.view.as_ref()?;
        if !time.is_finite() {
            return None;
        }
        Some(EditIntent::Set {
            bound: nearest_bound(time, view.interval),
            value: time,
        })
    }

    /// Drop the current render; a no-op when nothing is rendered
    pub fn dispose(&mut self) {
        if self.view.take().is_some() {
            self.surface.purge();
        }
    }

    pub fn is_rendered(&self) -> bool {
        self.view.is_some()
    }

    /// Key of the file currently on the surface
    pub fn rendered_key(&self) -> Option<&str> {
        self.view.as_ref().map(|view| view.unique_filename.as_str())
    }

    /// Interval the markers currently show
    pub fn displayed_interval(&self) -> Option<Interval> {
        self.view.as_ref().map(|view| view.interval)
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }
}
