//! # Telemetry Module
//!
//! Sample types and the data path from source to chart.
//!
//! This module handles:
//! - Defining the telemetry sample record
//! - Generating synthetic samples (seedable)
//! - Keeping the ordered session log
//! - Deriving the live chart series

pub mod chart;
pub mod sample;
pub mod session_log;
pub mod source;

pub use chart::ChartFeed;
pub use sample::{Axes, GpsFix, Mode, Sample, TelemetryField};
pub use session_log::SessionLog;
pub use source::{SampleBounds, SampleSource, SyntheticSource};
