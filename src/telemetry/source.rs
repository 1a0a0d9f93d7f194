//! # Sample Sources
//!
//! Producers of telemetry samples, one per sampling tick.
//!
//! [`SyntheticSource`] generates uniformly distributed readings around the
//! nominal values of a payload sitting on the pad:
//!
//! | Field | Range | Unit |
//! |-------|-------|------|
//! | Altitude | 95.0 - 105.0 | m |
//! | Temperature | 23.0 - 27.0 | °C |
//! | Pressure | 100.3 - 102.3 | kPa |
//! | Voltage | 7.2 - 7.6 | V |
//!
//! All readings are rounded to two decimals. The random generator is
//! injected so tests get reproducible sequences:
//!
//! ```
//! use cansat_ground::telemetry::source::{SampleBounds, SampleSource, SyntheticSource};
//!
//! let mut a = SyntheticSource::seeded("1000", SampleBounds::default(), 7)?;
//! let mut b = SyntheticSource::seeded("1000", SampleBounds::default(), 7)?;
//! assert_eq!(a.next_sample(1)?.altitude, b.next_sample(1)?.altitude);
//! # Ok::<(), cansat_ground::error::GroundStationError>(())
//! ```

use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;

use super::sample::{Mode, Sample, DEFAULT_STATE};
use crate::error::{GroundStationError, Result};

/// Produces one telemetry sample per tick.
///
/// Implementations must not assign packet counts themselves; the session
/// controller hands over the next count and only consumes it when the
/// sample is returned successfully.
#[cfg_attr(test, mockall::automock)]
pub trait SampleSource: Send {
    /// Produce the sample carrying `packet_count`.
    ///
    /// # Errors
    ///
    /// Returns an error if no reading is available for this tick. The
    /// controller logs and skips the tick.
    fn next_sample(&mut self, packet_count: u32) -> Result<Sample>;
}

/// Largest bound magnitude accepted for a generated field.
///
/// Keeps the range width finite and the hundredths count within `i64`.
pub const MAX_BOUND_MAGNITUDE: f64 = 1e9;

/// Inclusive value range for one generated field.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ValueRange {
    pub min: f64,
    pub max: f64,
}

impl ValueRange {
    #[must_use]
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Returns true if `value` lies within the range (inclusive).
    #[must_use]
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    /// Smallest and largest two-decimal value in the range, in hundredths.
    ///
    /// Measured on `h as f64 / 100.0`, the value actually produced, so `7.2`
    /// counts as 720 even though `7.2 * 100.0` lands slightly above it.
    fn hundredths(&self) -> (i64, i64) {
        let mut lo = (self.min * 100.0).ceil() as i64;
        while from_hundredths(lo - 1) >= self.min {
            lo -= 1;
        }
        while from_hundredths(lo) < self.min {
            lo += 1;
        }

        let mut hi = (self.max * 100.0).floor() as i64;
        while from_hundredths(hi + 1) <= self.max {
            hi += 1;
        }
        while from_hundredths(hi) > self.max {
            hi -= 1;
        }
        (lo, hi)
    }

    fn validate(&self, name: &str) -> Result<()> {
        if !self.min.is_finite() || !self.max.is_finite() {
            return Err(GroundStationError::InvalidConfiguration(format!(
                "{} bounds must be finite",
                name
            )));
        }
        if self.min.abs() > MAX_BOUND_MAGNITUDE || self.max.abs() > MAX_BOUND_MAGNITUDE {
            return Err(GroundStationError::InvalidConfiguration(format!(
                "{} bounds must lie within ±{}",
                name, MAX_BOUND_MAGNITUDE
            )));
        }
        if self.min > self.max {
            return Err(GroundStationError::InvalidConfiguration(format!(
                "{} min ({}) must not exceed max ({})",
                name, self.min, self.max
            )));
        }
        let (lo, hi) = self.hundredths();
        if lo > hi {
            return Err(GroundStationError::InvalidConfiguration(format!(
                "{} range {}..{} contains no two-decimal value",
                name, self.min, self.max
            )));
        }
        Ok(())
    }
}

fn from_hundredths(hundredths: i64) -> f64 {
    hundredths as f64 / 100.0
}

/// Bounds for every field the synthetic source generates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleBounds {
    pub altitude: ValueRange,
    pub temperature: ValueRange,
    pub pressure: ValueRange,
    pub voltage: ValueRange,
}

impl Default for SampleBounds {
    fn default() -> Self {
        Self {
            altitude: ValueRange::new(95.0, 105.0),
            temperature: ValueRange::new(23.0, 27.0),
            pressure: ValueRange::new(100.3, 102.3),
            voltage: ValueRange::new(7.2, 7.6),
        }
    }
}

impl SampleBounds {
    /// Check that every range is finite, ordered, no wider than
    /// [`MAX_BOUND_MAGNITUDE`] and holds at least one two-decimal value.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        self.altitude.validate("altitude")?;
        self.temperature.validate("temperature")?;
        self.pressure.validate("pressure")?;
        self.voltage.validate("voltage")?;
        Ok(())
    }
}

/// Synthetic telemetry generator.
///
/// Stamps every sample with [`Mode::Simulated`], the `ASCENT` state and the
/// current UTC time of day; optional instrumentation stays empty.
#[derive(Debug)]
pub struct SyntheticSource {
    team_id: String,
    bounds: SampleBounds,
    rng: StdRng,
}

impl SyntheticSource {
    /// Create a generator seeded from OS entropy.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` if `bounds` are degenerate.
    pub fn new(team_id: impl Into<String>, bounds: SampleBounds) -> Result<Self> {
        Self::with_rng(team_id, bounds, StdRng::from_entropy())
    }

    /// Create a reproducible generator from a fixed seed.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` if `bounds` are degenerate.
    pub fn seeded(team_id: impl Into<String>, bounds: SampleBounds, seed: u64) -> Result<Self> {
        Self::with_rng(team_id, bounds, StdRng::seed_from_u64(seed))
    }

    /// Create a generator around an existing random number generator.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` if `bounds` are degenerate.
    pub fn with_rng(team_id: impl Into<String>, bounds: SampleBounds, rng: StdRng) -> Result<Self> {
        bounds.validate()?;
        Ok(Self {
            team_id: team_id.into(),
            bounds,
            rng,
        })
    }

    /// Returns the bounds readings are drawn from.
    #[must_use]
    pub fn bounds(&self) -> &SampleBounds {
        &self.bounds
    }

    // Drawing whole hundredths keeps every reading on the two-decimal grid
    // and inside the bounds, whatever the bounds themselves look like.
    fn draw(&mut self, range: ValueRange) -> f64 {
        let (lo, hi) = range.hundredths();
        from_hundredths(self.rng.gen_range(lo..=hi))
    }
}

impl SampleSource for SyntheticSource {
    fn next_sample(&mut self, packet_count: u32) -> Result<Sample> {
        let bounds = self.bounds;
        let altitude = self.draw(bounds.altitude);
        let temperature = self.draw(bounds.temperature);
        let pressure = self.draw(bounds.pressure);
        let voltage = self.draw(bounds.voltage);

        Ok(Sample::new(
            self.team_id.clone(),
            Utc::now().time(),
            packet_count,
            Mode::Simulated,
            DEFAULT_STATE,
            altitude,
            temperature,
            pressure,
            voltage,
        ))
    }
}
