//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.
//!
//! Every section and key is optional; a missing file section falls back to
//! the defaults below.
//!
//! ```toml
//! [session]
//! team_id = "1000"
//! sampling_interval_ms = 1000
//!
//! [chart]
//! field = "altitude"
//! # max_points = 600
//!
//! [export]
//! dir = "."
//! filename = "Flight_{team_id}.csv"
//! format = "csv"
//!
//! [simulation]
//! # seed = 42
//! altitude_min = 95.0
//! altitude_max = 105.0
//!
//! [logging]
//! level = "info"
//! # log_dir = "./logs"
//! ```

use serde::Deserialize;
use std::fs;
use std::num::NonZeroUsize;
use std::path::Path;
use std::time::Duration;

use crate::error::{GroundStationError, Result};
use crate::export::{ExportFormat, TEAM_ID_PLACEHOLDER};
use crate::telemetry::sample::TelemetryField;
use crate::telemetry::source::{SampleBounds, ValueRange};

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub chart: ChartConfig,
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Session configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SessionConfig {
    #[serde(default = "default_team_id")]
    pub team_id: String,

    #[serde(default = "default_sampling_interval_ms")]
    pub sampling_interval_ms: u64,
}

/// Live chart configuration
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ChartConfig {
    #[serde(default)]
    pub field: TelemetryField,

    /// Cap on retained chart points (oldest dropped first)
    #[serde(default)]
    pub max_points: Option<usize>,
}

/// Export configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ExportConfig {
    #[serde(default = "default_export_dir")]
    pub dir: String,

    #[serde(default = "default_export_filename")]
    pub filename: String,

    #[serde(default)]
    pub format: ExportFormat,
}

/// Synthetic telemetry configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SimulationConfig {
    /// Fixed RNG seed; entropy is used when absent
    #[serde(default)]
    pub seed: Option<u64>,

    #[serde(default = "default_altitude_min")]
    pub altitude_min: f64,
    #[serde(default = "default_altitude_max")]
    pub altitude_max: f64,

    #[serde(default = "default_temperature_min")]
    pub temperature_min: f64,
    #[serde(default = "default_temperature_max")]
    pub temperature_max: f64,

    #[serde(default = "default_pressure_min")]
    pub pressure_min: f64,
    #[serde(default = "default_pressure_max")]
    pub pressure_max: f64,

    #[serde(default = "default_voltage_min")]
    pub voltage_min: f64,
    #[serde(default = "default_voltage_max")]
    pub voltage_max: f64,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Directory for daily rolling log files; console only when absent
    #[serde(default)]
    pub log_dir: Option<String>,
}

// Default value functions
fn default_team_id() -> String { "1000".to_string() }
fn default_sampling_interval_ms() -> u64 { 1000 }

fn default_export_dir() -> String { ".".to_string() }
fn default_export_filename() -> String { "Flight_{team_id}.csv".to_string() }

fn default_altitude_min() -> f64 { 95.0 }
fn default_altitude_max() -> f64 { 105.0 }
fn default_temperature_min() -> f64 { 23.0 }
fn default_temperature_max() -> f64 { 27.0 }
fn default_pressure_min() -> f64 { 100.3 }
fn default_pressure_max() -> f64 { 102.3 }
fn default_voltage_min() -> f64 { 7.2 }
fn default_voltage_max() -> f64 { 7.6 }

fn default_log_level() -> String { "info".to_string() }

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            team_id: default_team_id(),
            sampling_interval_ms: default_sampling_interval_ms(),
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            dir: default_export_dir(),
            filename: default_export_filename(),
            format: ExportFormat::default(),
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: None,
            altitude_min: default_altitude_min(),
            altitude_max: default_altitude_max(),
            temperature_min: default_temperature_min(),
            temperature_max: default_temperature_max(),
            pressure_min: default_pressure_min(),
            pressure_max: default_pressure_max(),
            voltage_min: default_voltage_min(),
            voltage_max: default_voltage_max(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            log_dir: None,
        }
    }
}

impl SimulationConfig {
    /// Generator bounds described by this section.
    #[must_use]
    pub fn bounds(&self) -> SampleBounds {
        SampleBounds {
            altitude: ValueRange::new(self.altitude_min, self.altitude_max),
            temperature: ValueRange::new(self.temperature_min, self.temperature_max),
            pressure: ValueRange::new(self.pressure_min, self.pressure_max),
            voltage: ValueRange::new(self.voltage_min, self.voltage_max),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// * `Result<Config>` - Loaded and validated configuration
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use cansat_ground::config::Config;
    ///
    /// let config = Config::load("config/ground-station.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parse and validate configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns `Config` on parse failure, `InvalidConfiguration` on
    /// validation failure.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Sampling period as a `Duration`.
    #[must_use]
    pub fn sampling_interval(&self) -> Duration {
        Duration::from_millis(self.session.sampling_interval_ms)
    }

    /// Chart cap, if one is configured.
    #[must_use]
    pub fn chart_max_points(&self) -> Option<NonZeroUsize> {
        self.chart.max_points.and_then(NonZeroUsize::new)
    }

    /// Validate configuration values
    ///
    /// # Returns
    ///
    /// * `Result<()>` - Ok if valid, Err if invalid
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` if any value is out of its valid range
    pub fn validate(&self) -> Result<()> {
        if self.session.team_id.trim().is_empty() {
            return Err(invalid("team_id cannot be empty"));
        }

        if self.session.team_id.contains(['/', '\\']) {
            return Err(invalid("team_id cannot contain path separators"));
        }

        if self.session.sampling_interval_ms == 0 || self.session.sampling_interval_ms > 3_600_000 {
            return Err(invalid("sampling_interval_ms must be between 1 and 3600000"));
        }

        if self.chart.max_points == Some(0) {
            return Err(invalid("max_points must be greater than 0 when set"));
        }

        if self.export.dir.is_empty() {
            return Err(invalid("export dir cannot be empty"));
        }

        if self.export.filename.trim().is_empty() {
            return Err(invalid("export filename cannot be empty"));
        }

        if self.export.filename.contains(['/', '\\']) {
            return Err(invalid("export filename must not contain path separators"));
        }

        if self.export.filename.replace(TEAM_ID_PLACEHOLDER, "").contains(['{', '}']) {
            return Err(invalid("export filename only supports the {team_id} placeholder"));
        }

        if self.logging.level.parse::<tracing::Level>().is_err() {
            return Err(invalid(format!(
                "log level '{}' must be one of: trace, debug, info, warn, error",
                self.logging.level
            )));
        }

        if matches!(&self.logging.log_dir, Some(dir) if dir.is_empty()) {
            return Err(invalid("log_dir cannot be empty when set"));
        }

        self.simulation.bounds().validate()?;

        Ok(())
    }
}

fn invalid(msg: impl Into<String>) -> GroundStationError {
    GroundStationError::InvalidConfiguration(msg.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_valid_config() -> Config {
        Config::default()
    }

    fn assert_invalid(config: &Config) {
        match config.validate() {
            Err(GroundStationError::InvalidConfiguration(_)) => {}
            other => panic!("Expected InvalidConfiguration, got: {:?}", other),
        }
    }

    #[test]
    fn test_default_config() {
        let config = create_valid_config();
        assert!(config.validate().is_ok());
        assert_eq!(config.sampling_interval(), Duration::from_millis(1000));
        assert_eq!(config.chart.field, TelemetryField::Altitude);
        assert!(config.chart_max_points().is_none());
        assert_eq!(config.export.format, ExportFormat::Csv);
        assert_eq!(config.simulation.bounds(), SampleBounds::default());
    }

    #[test]
    fn test_load_config_from_file() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let toml_content = r#"
[session]
team_id = "2042"
sampling_interval_ms = 500

[chart]
field = "pressure"
max_points = 120

[export]
dir = "/tmp"
format = "jsonl"

[simulation]
seed = 7

[logging]
level = "debug"
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = Config::load(temp_file.path()).unwrap();
        assert_eq!(config.session.team_id, "2042");
        assert_eq!(config.session.sampling_interval_ms, 500);
        assert_eq!(config.chart.field, TelemetryField::Pressure);
        assert_eq!(config.chart_max_points(), NonZeroUsize::new(120));
        assert_eq!(config.export.dir, "/tmp");
        assert_eq!(config.export.filename, "Flight_{team_id}.csv");
        assert_eq!(config.export.format, ExportFormat::Jsonl);
        assert_eq!(config.simulation.seed, Some(7));
        assert_eq!(config.simulation.altitude_min, 95.0);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_shipped_config_matches_defaults() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/config/ground-station.toml");
        let config = Config::load(path).unwrap();
        assert_eq!(config.session.team_id, default_team_id());
        assert_eq!(config.session.sampling_interval_ms, default_sampling_interval_ms());
        assert_eq!(config.export.filename, default_export_filename());
        assert_eq!(config.simulation.bounds(), SampleBounds::default());
        assert!(config.simulation.seed.is_none());
        assert!(config.logging.log_dir.is_none());
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config.session.team_id, "1000");
        assert_eq!(config.session.sampling_interval_ms, 1000);
    }

    #[test]
    fn test_missing_file() {
        let result = Config::load("/nonexistent/ground-station.toml");
        assert!(matches!(result, Err(GroundStationError::Io(_))));
    }

    #[test]
    fn test_malformed_toml() {
        let result = Config::from_toml_str("[session\nteam_id = ");
        assert!(matches!(result, Err(GroundStationError::Config(_))));
    }

    #[test]
    fn test_unknown_chart_field() {
        let result = Config::from_toml_str("[chart]\nfield = \"humidity\"\n");
        assert!(matches!(result, Err(GroundStationError::Config(_))));
    }

    #[test]
    fn test_negative_interval_is_parse_error() {
        let result = Config::from_toml_str("[session]\nsampling_interval_ms = -5\n");
        assert!(matches!(result, Err(GroundStationError::Config(_))));
    }

    #[test]
    fn test_empty_team_id() {
        let mut config = create_valid_config();
        config.session.team_id = "  ".to_string();
        assert_invalid(&config);
    }

    #[test]
    fn test_team_id_with_separator() {
        let mut config = create_valid_config();
        config.session.team_id = "../1000".to_string();
        assert_invalid(&config);
    }

    #[test]
    fn test_sampling_interval_zero() {
        let mut config = create_valid_config();
        config.session.sampling_interval_ms = 0;
        assert_invalid(&config);
    }

    #[test]
    fn test_sampling_interval_too_high() {
        let mut config = create_valid_config();
        config.session.sampling_interval_ms = 3_600_001;
        assert_invalid(&config);
    }

    #[test]
    fn test_max_points_zero() {
        let mut config = create_valid_config();
        config.chart.max_points = Some(0);
        assert_invalid(&config);
    }

    #[test]
    fn test_empty_export_dir() {
        let mut config = create_valid_config();
        config.export.dir = String::new();
        assert_invalid(&config);
    }

    #[test]
    fn test_export_filename_with_separator() {
        let mut config = create_valid_config();
        config.export.filename = "flights/Flight_{team_id}.csv".to_string();
        assert_invalid(&config);
    }

    #[test]
    fn test_export_filename_unknown_placeholder() {
        let mut config = create_valid_config();
        config.export.filename = "Flight_{date}.csv".to_string();
        assert_invalid(&config);
    }

    #[test]
    fn test_export_filename_without_placeholder() {
        let mut config = create_valid_config();
        config.export.filename = "flight.csv".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_log_level() {
        let mut config = create_valid_config();
        config.logging.level = "verbose".to_string();
        assert_invalid(&config);
    }

    #[test]
    fn test_valid_log_levels() {
        for level in ["trace", "debug", "info", "warn", "error"] {
            let mut config = create_valid_config();
            config.logging.level = level.to_string();
            assert!(config.validate().is_ok(), "Log level {} should be valid", level);
        }
    }

    #[test]
    fn test_empty_log_dir() {
        let mut config = create_valid_config();
        config.logging.log_dir = Some(String::new());
        assert_invalid(&config);
    }

    #[test]
    fn test_inverted_altitude_bounds() {
        let mut config = create_valid_config();
        config.simulation.altitude_min = 110.0;
        assert_invalid(&config);
    }

    #[test]
    fn test_non_finite_voltage_bounds() {
        let mut config = create_valid_config();
        config.simulation.voltage_max = f64::NAN;
        assert_invalid(&config);
    }

    #[test]
    fn test_huge_altitude_bounds() {
        let config = Config::from_toml_str(
            "[simulation]\naltitude_min = -1e308\naltitude_max = 1e308\n",
        )
        .unwrap();
        assert_invalid(&config);
    }

    #[test]
    fn test_voltage_bounds_without_two_decimal_value() {
        let mut config = create_valid_config();
        config.simulation.voltage_min = 7.201;
        config.simulation.voltage_max = 7.204;
        assert_invalid(&config);
    }

    #[test]
    fn test_default_functions() {
        assert_eq!(default_team_id(), "1000");
        assert_eq!(default_sampling_interval_ms(), 1000);
        assert_eq!(default_export_dir(), ".");
        assert_eq!(default_export_filename(), "Flight_{team_id}.csv");
        assert_eq!(default_altitude_min(), 95.0);
        assert_eq!(default_altitude_max(), 105.0);
        assert_eq!(default_temperature_min(), 23.0);
        assert_eq!(default_temperature_max(), 27.0);
        assert_eq!(default_pressure_min(), 100.3);
        assert_eq!(default_pressure_max(), 102.3);
        assert_eq!(default_voltage_min(), 7.2);
        assert_eq!(default_voltage_max(), 7.6);
        assert_eq!(default_log_level(), "info");
    }
}
