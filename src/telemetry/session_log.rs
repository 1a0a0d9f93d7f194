//! # Session Log
//!
//! Append-only store of every sample observed during a run. Insertion order,
//! arrival order and packet-count order are the same thing here: the log
//! only accepts the sample whose packet count is exactly one past the last.

use super::sample::Sample;
use crate::error::{GroundStationError, Result};

/// Ordered, append-only sequence of samples.
#[derive(Debug, Default, Clone)]
pub struct SessionLog {
    samples: Vec<Sample>,
}

impl SessionLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Packet count the next appended sample must carry.
    #[must_use]
    pub fn next_packet_count(&self) -> u32 {
        self.samples.len() as u32 + 1
    }

    /// Append a sample.
    ///
    /// # Errors
    ///
    /// Returns `PacketOutOfSequence` if the sample's packet count is not
    /// [`next_packet_count`](Self::next_packet_count). The log is left
    /// unchanged in that case.
    pub fn append(&mut self, sample: Sample) -> Result<&Sample> {
        let expected = self.next_packet_count();
        if sample.packet_count != expected {
            return Err(GroundStationError::PacketOutOfSequence {
                expected,
                actual: sample.packet_count,
            });
        }
        self.samples.push(sample);
        Ok(&self.samples[self.samples.len() - 1])
    }

    /// All samples in packet order.
    #[must_use]
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Owned copy of the log for readers outside the engine lock.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Sample> {
        self.samples.clone()
    }

    #[must_use]
    pub fn last(&self) -> Option<&Sample> {
        self.samples.last()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::sample::{Mode, DEFAULT_STATE};
    use chrono::NaiveTime;

    fn sample(packet_count: u32) -> Sample {
        let time = NaiveTime::from_hms_opt(10, 0, packet_count % 60).unwrap();
        Sample::new("1000", time, packet_count, Mode::Simulated, DEFAULT_STATE, 100.0, 25.0, 101.3, 7.4)
    }

    #[test]
    fn test_new_log_is_empty() {
        let log = SessionLog::new();
        assert!(log.is_empty());
        assert_eq!(log.len(), 0);
        assert_eq!(log.next_packet_count(), 1);
        assert!(log.last().is_none());
    }

    #[test]
    fn test_append_in_order() {
        let mut log = SessionLog::new();
        for count in 1..=5 {
            log.append(sample(count)).unwrap();
        }

        let counts: Vec<u32> = log.samples().iter().map(|s| s.packet_count).collect();
        assert_eq!(counts, vec![1, 2, 3, 4, 5]);
        assert_eq!(log.next_packet_count(), 6);
        assert_eq!(log.last().unwrap().packet_count, 5);
    }

    #[test]
    fn test_gap_rejected() {
        let mut log = SessionLog::new();
        log.append(sample(1)).unwrap();

        let err = log.append(sample(3)).unwrap_err();
        match err {
            GroundStationError::PacketOutOfSequence { expected, actual } => {
                assert_eq!(expected, 2);
                assert_eq!(actual, 3);
            }
            other => panic!("Expected PacketOutOfSequence, got: {:?}", other),
        }
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut log = SessionLog::new();
        log.append(sample(1)).unwrap();
        log.append(sample(2)).unwrap();

        assert!(log.append(sample(2)).is_err());
        assert!(log.append(sample(1)).is_err());
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn test_first_sample_must_be_one() {
        let mut log = SessionLog::new();
        assert!(log.append(sample(0)).is_err());
        assert!(log.append(sample(2)).is_err());
        assert!(log.is_empty());
    }

    #[test]
    fn test_snapshot_is_independent() {
        let mut log = SessionLog::new();
        log.append(sample(1)).unwrap();
        let snapshot = log.snapshot();

        log.append(sample(2)).unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(log.len(), 2);
    }
}
