//! # Export Module
//!
//! Writes a session's samples to a durable record.
//!
//! ## CSV Schema (version 1)
//!
//! One header row followed by one row per sample, in session order. The 25
//! columns are fixed and always written in this order:
//!
//! | # | Column | Source |
//! |---|--------|--------|
//! | 1-5 | TEAM_ID, MISSION_TIME, PACKET_COUNT, MODE, STATE | header |
//! | 6-9 | ALTITUDE, TEMPERATURE, PRESSURE, VOLTAGE | environment |
//! | 10-18 | GYRO_R/P/Y, ACCEL_R/P/Y, MAG_R/P/Y | orientation |
//! | 19 | AUTO_GYRO_ROTATION_RATE | auto-gyro |
//! | 20-24 | GPS_TIME, GPS_ALTITUDE, GPS_LAT, GPS_LON, GPS_SATS | GPS |
//! | 25 | CMD_ECHO | last command |
//!
//! Absent optional fields are written as empty cells. Numbers are written
//! exactly as stored, without re-rounding.
//!
//! ## Atomicity
//!
//! Records are written to a temporary file next to the destination and
//! renamed into place, so a failed export never leaves a half-written file
//! under the destination name.

use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{GroundStationError, Result};
use crate::telemetry::sample::{Axes, Sample, MISSION_TIME_FORMAT};

/// Version of the CSV column layout.
pub const SCHEMA_VERSION: u32 = 1;

/// Placeholder replaced by the team id in filename templates.
pub const TEAM_ID_PLACEHOLDER: &str = "{team_id}";

/// Exported column names, in order.
pub const COLUMNS: [&str; 25] = [
    "TEAM_ID",
    "MISSION_TIME",
    "PACKET_COUNT",
    "MODE",
    "STATE",
    "ALTITUDE",
    "TEMPERATURE",
    "PRESSURE",
    "VOLTAGE",
    "GYRO_R",
    "GYRO_P",
    "GYRO_Y",
    "ACCEL_R",
    "ACCEL_P",
    "ACCEL_Y",
    "MAG_R",
    "MAG_P",
    "MAG_Y",
    "AUTO_GYRO_ROTATION_RATE",
    "GPS_TIME",
    "GPS_ALTITUDE",
    "GPS_LAT",
    "GPS_LON",
    "GPS_SATS",
    "CMD_ECHO",
];

/// Output format of an export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Fixed 25-column CSV
    #[default]
    Csv,
    /// One JSON object per sample
    Jsonl,
}

/// Serializes session logs to files.
#[derive(Debug, Clone)]
pub struct Exporter {
    format: ExportFormat,
    dir: PathBuf,
    filename_template: String,
}

impl Exporter {
    /// Creates an exporter writing into `dir` with files named after
    /// `filename_template` (`{team_id}` is substituted).
    pub fn new(format: ExportFormat, dir: impl Into<PathBuf>, filename_template: impl Into<String>) -> Self {
        Self {
            format,
            dir: dir.into(),
            filename_template: filename_template.into(),
        }
    }

    #[must_use]
    pub fn format(&self) -> ExportFormat {
        self.format
    }

    /// Default destination for a team's session record.
    ///
    /// # Examples
    ///
    /// ```
    /// use cansat_ground::export::{ExportFormat, Exporter};
    /// use std::path::Path;
    ///
    /// let exporter = Exporter::new(ExportFormat::Csv, "out", "Flight_{team_id}.csv");
    /// assert_eq!(exporter.destination("1000"), Path::new("out/Flight_1000.csv"));
    /// ```
    #[must_use]
    pub fn destination(&self, team_id: &str) -> PathBuf {
        self.dir
            .join(self.filename_template.replace(TEAM_ID_PLACEHOLDER, team_id))
    }

    /// Write `samples` to `destination`, replacing any existing file.
    ///
    /// # Errors
    ///
    /// Returns `IoFailure` if the destination directory is missing or not
    /// writable, or if any write fails. No partial file is left at
    /// `destination`.
    pub fn export(&self, samples: &[Sample], destination: &Path) -> Result<()> {
        let dir = match destination.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut tmp = NamedTempFile::new_in(dir)
            .map_err(|e| GroundStationError::io_failure(destination, e))?;

        let written = match self.format {
            ExportFormat::Csv => write_csv(tmp.as_file_mut(), samples),
            ExportFormat::Jsonl => write_jsonl(tmp.as_file_mut(), samples),
        };
        written
            .and_then(|()| tmp.as_file().sync_all())
            .map_err(|e| GroundStationError::io_failure(destination, e))?;

        tmp.persist(destination)
            .map_err(|e| GroundStationError::io_failure(destination, e.error))?;

        debug!("Exported {} samples to {}", samples.len(), destination.display());
        Ok(())
    }
}

/// Write the CSV header and one row per sample.
fn write_csv<W: Write>(out: W, samples: &[Sample]) -> io::Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(COLUMNS)?;
    for sample in samples {
        writer.write_record(csv_row(sample))?;
    }
    writer.flush()
}

/// Write one JSON object per line.
fn write_jsonl<W: Write>(out: W, samples: &[Sample]) -> io::Result<()> {
    let mut writer = BufWriter::new(out);
    for sample in samples {
        serde_json::to_writer(&mut writer, sample)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()
}

/// Cells of one sample in [`COLUMNS`] order.
#[must_use]
pub fn csv_row(sample: &Sample) -> Vec<String> {
    let mut row = Vec::with_capacity(COLUMNS.len());

    row.push(sample.team_id.clone());
    row.push(sample.mission_time_str());
    row.push(sample.packet_count.to_string());
    row.push(sample.mode.code().to_string());
    row.push(sample.state.clone());
    row.push(sample.altitude.to_string());
    row.push(sample.temperature.to_string());
    row.push(sample.pressure.to_string());
    row.push(sample.voltage.to_string());

    for axes in [sample.gyro, sample.accel, sample.mag] {
        row.extend(axes_cells(axes));
    }

    row.push(optional(sample.auto_gyro_rotation_rate));

    match &sample.gps {
        Some(gps) => {
            row.push(gps.time.format(MISSION_TIME_FORMAT).to_string());
            row.push(gps.altitude.to_string());
            row.push(gps.latitude.to_string());
            row.push(gps.longitude.to_string());
            row.push(gps.satellites.to_string());
        }
        None => row.extend(std::iter::repeat(String::new()).take(5)),
    }

    row.push(sample.cmd_echo.clone().unwrap_or_default());
    row
}

fn axes_cells(axes: Option<Axes>) -> [String; 3] {
    match axes {
        Some(a) => [a.r.to_string(), a.p.to_string(), a.y.to_string()],
        None => [String::new(), String::new(), String::new()],
    }
}

fn optional<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::sample::{GpsFix, Mode, DEFAULT_STATE};
    use chrono::NaiveTime;
    use std::fs;

    fn sample(packet_count: u32) -> Sample {
        let time = NaiveTime::from_hms_opt(14, 5, 9).unwrap();
        Sample::new("1000", time, packet_count, Mode::Simulated, DEFAULT_STATE, 100.25, 24.1, 101.37, 7.45)
    }

    fn read_rows(path: &Path) -> (csv::StringRecord, Vec<csv::StringRecord>) {
        let mut reader = csv::Reader::from_path(path).unwrap();
        let headers = reader.headers().unwrap().clone();
        let rows = reader.records().map(|r| r.unwrap()).collect();
        (headers, rows)
    }

    #[test]
    fn test_column_count() {
        assert_eq!(COLUMNS.len(), 25);
        assert_eq!(COLUMNS[0], "TEAM_ID");
        assert_eq!(COLUMNS[24], "CMD_ECHO");
        assert_eq!(SCHEMA_VERSION, 1);
    }

    #[test]
    fn test_default_destination() {
        let exporter = Exporter::new(ExportFormat::Csv, "/tmp/flights", "Flight_{team_id}.csv");
        assert_eq!(exporter.destination("1000"), PathBuf::from("/tmp/flights/Flight_1000.csv"));
    }

    #[test]
    fn test_empty_log_writes_header_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Flight_1000.csv");
        let exporter = Exporter::new(ExportFormat::Csv, dir.path(), "Flight_{team_id}.csv");

        exporter.export(&[], &path).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 1);
        assert_eq!(contents.trim_end(), COLUMNS.join(","));
    }

    #[test]
    fn test_round_trip_packet_counts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let exporter = Exporter::new(ExportFormat::Csv, dir.path(), "out.csv");
        let samples: Vec<Sample> = (1..=4).map(sample).collect();

        exporter.export(&samples, &path).unwrap();

        let (headers, rows) = read_rows(&path);
        assert_eq!(headers.iter().collect::<Vec<_>>(), COLUMNS.to_vec());
        assert_eq!(rows.len(), 4);
        let counts: Vec<u32> = rows.iter().map(|r| r[2].parse().unwrap()).collect();
        assert_eq!(counts, vec![1, 2, 3, 4]);

        for row in &rows {
            assert_eq!(row.len(), 25);
            assert_eq!(&row[0], "1000");
            assert_eq!(&row[1], "14:05:09");
            assert_eq!(&row[3], "S");
            assert_eq!(&row[4], "ASCENT");
            assert_eq!(&row[5], "100.25");
            assert_eq!(&row[6], "24.1");
            assert_eq!(&row[7], "101.37");
            assert_eq!(&row[8], "7.45");
        }
    }

    #[test]
    fn test_missing_optional_fields_are_empty_cells() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let exporter = Exporter::new(ExportFormat::Csv, dir.path(), "out.csv");

        exporter.export(&[sample(1)], &path).unwrap();

        let (_, rows) = read_rows(&path);
        for idx in 9..25 {
            assert_eq!(&rows[0][idx], "", "column {} should be empty", COLUMNS[idx]);
        }
        let raw = fs::read_to_string(&path).unwrap();
        assert!(!raw.contains("null"));
        assert!(!raw.contains("None"));
    }

    #[test]
    fn test_optional_fields_written_when_present() {
        let mut s = sample(1).with_command_echo(Some("CMD,1000,CX,ON"));
        s.gyro = Some(Axes { r: 1.5, p: -0.25, y: 0.0 });
        s.auto_gyro_rotation_rate = Some(12.0);
        s.gps = Some(GpsFix {
            time: NaiveTime::from_hms_opt(14, 5, 8).unwrap(),
            altitude: 312.4,
            latitude: 43.65,
            longitude: -79.38,
            satellites: 7,
        });

        let row = csv_row(&s);
        assert_eq!(row.len(), 25);
        assert_eq!(&row[9..12], &["1.5", "-0.25", "0"]);
        assert_eq!(&row[12..18], &["", "", "", "", "", ""]);
        assert_eq!(row[18], "12");
        assert_eq!(&row[19..24], &["14:05:08", "312.4", "43.65", "-79.38", "7"]);
        assert_eq!(row[24], "CMD,1000,CX,ON");
    }

    #[test]
    fn test_command_echo_with_commas_survives_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let exporter = Exporter::new(ExportFormat::Csv, dir.path(), "out.csv");
        let s = sample(1).with_command_echo(Some("CMD,1000,MEC,HEATSHIELD,ON"));

        exporter.export(&[s], &path).unwrap();

        let (_, rows) = read_rows(&path);
        assert_eq!(rows[0].len(), 25);
        assert_eq!(&rows[0][24], "CMD,1000,MEC,HEATSHIELD,ON");
    }

    #[test]
    fn test_export_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        fs::write(&path, "stale contents\n").unwrap();
        let exporter = Exporter::new(ExportFormat::Csv, dir.path(), "out.csv");

        exporter.export(&[sample(1)], &path).unwrap();

        let (_, rows) = read_rows(&path);
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn test_unwritable_destination_is_io_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.csv");
        let exporter = Exporter::new(ExportFormat::Csv, dir.path(), "out.csv");

        let err = exporter.export(&[sample(1)], &path).unwrap_err();
        match err {
            GroundStationError::IoFailure { path: failed, .. } => assert_eq!(failed, path),
            other => panic!("Expected IoFailure, got: {:?}", other),
        }
        assert!(!path.exists());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_jsonl_export() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.jsonl");
        let exporter = Exporter::new(ExportFormat::Jsonl, dir.path(), "out.jsonl");
        let samples: Vec<Sample> = (1..=3).map(sample).collect();

        exporter.export(&samples, &path).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        let parsed: Vec<Sample> = contents
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(parsed.len(), 3);
        for (read, written) in parsed.iter().zip(&samples) {
            assert_eq!(read.packet_count, written.packet_count);
            assert_eq!(read.team_id, written.team_id);
            assert_eq!(read.mission_time, written.mission_time);
            assert_eq!(read.mode, written.mode);
            assert!((read.altitude - written.altitude).abs() < 1e-9);
            assert!(read.cmd_echo.is_none());
        }
    }

    #[test]
    fn test_jsonl_empty_log_writes_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.jsonl");
        let exporter = Exporter::new(ExportFormat::Jsonl, dir.path(), "out.jsonl");

        exporter.export(&[], &path).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "");
    }
}
