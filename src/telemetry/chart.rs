//! # Chart Feed
//!
//! Derives a plottable series of one numeric field from incoming samples.
//!
//! ## Retention
//!
//! Without a cap the series grows with the session. With `max_points` set,
//! the oldest points are dropped first (FIFO) once the cap is reached.
//! This only changes what the chart shows: the session log keeps every
//! sample. Renderers should use [`ChartFeed::points`] (packet count, value)
//! or [`ChartFeed::dropped`] to label the x axis after truncation.

use std::collections::VecDeque;
use std::num::NonZeroUsize;

use super::sample::{Sample, TelemetryField};

/// Plottable series keyed by packet count.
#[derive(Debug, Clone)]
pub struct ChartFeed {
    field: TelemetryField,
    max_points: Option<NonZeroUsize>,
    points: VecDeque<(u32, f64)>,
    dropped: u64,
}

impl Default for ChartFeed {
    fn default() -> Self {
        Self::new(TelemetryField::Altitude, None)
    }
}

impl ChartFeed {
    /// Creates a feed for `field`, optionally capped at `max_points`.
    #[must_use]
    pub fn new(field: TelemetryField, max_points: Option<NonZeroUsize>) -> Self {
        Self {
            field,
            max_points,
            points: VecDeque::new(),
            dropped: 0,
        }
    }

    /// Appends the configured field of `sample`, evicting the oldest point
    /// when the cap is reached.
    pub fn on_sample(&mut self, sample: &Sample) {
        if let Some(max) = self.max_points {
            while self.points.len() >= max.get() {
                self.points.pop_front();
                self.dropped += 1;
            }
        }
        self.points
            .push_back((sample.packet_count, self.field.value_of(sample)));
    }

    /// Values in arrival order.
    #[must_use]
    pub fn series(&self) -> Vec<f64> {
        self.points.iter().map(|&(_, value)| value).collect()
    }

    /// `(packet_count, value)` pairs in arrival order.
    #[must_use]
    pub fn points(&self) -> Vec<(u32, f64)> {
        self.points.iter().copied().collect()
    }

    #[must_use]
    pub fn field(&self) -> TelemetryField {
        self.field
    }

    #[must_use]
    pub fn max_points(&self) -> Option<NonZeroUsize> {
        self.max_points
    }

    /// Number of points evicted by the cap so far.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}
