//! # Telemetry Sample Types
//!
//! One telemetry observation as received (or synthesized) by the ground station.
//!
//! ## Field Groups
//!
//! | Group | Fields | Always present |
//! |-------|--------|----------------|
//! | Header | team id, mission time, packet count, mode, state | yes |
//! | Environment | altitude, temperature, pressure, voltage | yes |
//! | Orientation | gyro, accel, magnetometer (R/P/Y triples) | no |
//! | Auto-gyro | rotation rate | no |
//! | GPS | time, altitude, latitude, longitude, satellites | no |
//! | Echo | last command accepted by the ground station | no |

use std::fmt;

use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

/// Format used for mission and GPS timestamps.
pub const MISSION_TIME_FORMAT: &str = "%H:%M:%S";

/// Mission phase label emitted by the synthetic source.
pub const DEFAULT_STATE: &str = "ASCENT";

/// Operating mode reported by the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    /// Readings generated or replayed on the ground
    #[serde(rename = "S")]
    Simulated,
    /// Readings from real flight sensors
    #[serde(rename = "F")]
    Flight,
}

impl Mode {
    /// Single-letter code used in exported records.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Mode::Simulated => "S",
            Mode::Flight => "F",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Roll/pitch/yaw triple shared by gyro, accelerometer and magnetometer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Axes {
    pub r: f64,
    pub p: f64,
    pub y: f64,
}

/// GPS block of a sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsFix {
    /// GPS time of day (UTC)
    pub time: NaiveTime,
    /// Altitude above mean sea level in meters
    pub altitude: f64,
    /// Latitude in decimal degrees
    pub latitude: f64,
    /// Longitude in decimal degrees
    pub longitude: f64,
    /// Number of satellites tracked
    pub satellites: u8,
}

/// Numeric sample fields that can be plotted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TelemetryField {
    #[default]
    Altitude,
    Temperature,
    Pressure,
    Voltage,
}

impl TelemetryField {
    /// Reads this field out of a sample.
    #[must_use]
    pub fn value_of(&self, sample: &Sample) -> f64 {
        match self {
            TelemetryField::Altitude => sample.altitude,
            TelemetryField::Temperature => sample.temperature,
            TelemetryField::Pressure => sample.pressure,
            TelemetryField::Voltage => sample.voltage,
        }
    }

    /// Display unit for chart axes.
    #[must_use]
    pub fn unit(&self) -> &'static str {
        match self {
            TelemetryField::Altitude => "m",
            TelemetryField::Temperature => "°C",
            TelemetryField::Pressure => "kPa",
            TelemetryField::Voltage => "V",
        }
    }
}

/// One telemetry observation.
///
/// Samples are immutable once appended to a [`SessionLog`](super::SessionLog);
/// the only builder-style mutation, [`Sample::with_command_echo`], consumes
/// the value before it is recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub team_id: String,
    pub mission_time: NaiveTime,
    /// 1-based, strictly increasing within a session
    pub packet_count: u32,
    pub mode: Mode,
    /// Mission phase label
    pub state: String,
    pub altitude: f64,
    pub temperature: f64,
    pub pressure: f64,
    pub voltage: f64,
    pub gyro: Option<Axes>,
    pub accel: Option<Axes>,
    pub mag: Option<Axes>,
    pub auto_gyro_rotation_rate: Option<f64>,
    pub gps: Option<GpsFix>,
    pub cmd_echo: Option<String>,
}

impl Sample {
    /// Creates a sample carrying only the mandatory fields.
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn new(
        team_id: impl Into<String>,
        mission_time: NaiveTime,
        packet_count: u32,
        mode: Mode,
        state: impl Into<String>,
        altitude: f64,
        temperature: f64,
        pressure: f64,
        voltage: f64,
    ) -> Self {
        Self {
            team_id: team_id.into(),
            mission_time: truncate_to_seconds(mission_time),
            packet_count,
            mode,
            state: state.into(),
            altitude,
            temperature,
            pressure,
            voltage,
            gyro: None,
            accel: None,
            mag: None,
            auto_gyro_rotation_rate: None,
            gps: None,
            cmd_echo: None,
        }
    }

    /// Stamps the echo field with the last command text, if any.
    #[must_use]
    pub fn with_command_echo(mut self, echo: Option<&str>) -> Self {
        self.cmd_echo = echo.map(str::to_string);
        self
    }

    /// Mission time rendered as `HH:MM:SS`.
    #[must_use]
    pub fn mission_time_str(&self) -> String {
        self.mission_time.format(MISSION_TIME_FORMAT).to_string()
    }
}

/// Drops sub-second precision from a time of day.
#[must_use]
pub fn truncate_to_seconds(time: NaiveTime) -> NaiveTime {
    time.with_nanosecond(0).unwrap_or(time)
}

/// Rounds a reading to two decimal places.
#[inline]
#[must_use]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
