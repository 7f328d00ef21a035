//! Link monitor configuration
//!
//! The resynchronization knobs depend on the hardware setup under test;
//! the defaults are starting points, not documented values.

use crate::constants::{
    DEFAULT_BIT_ERROR_REPORT_CAP, DEFAULT_GAP_THRESHOLD, DEFAULT_MAX_PAYLOAD_LEN, DEFAULT_PAYLOAD_LEN,
    DEFAULT_RESYNC_ATTEMPT_LIMIT, DEFAULT_SEED, MAX_PAYLOAD_LIMIT,
};
use crate::error::ConfigError;
use crate::generator::{PrbsPolynomial, SequenceGenerator};
use crate::tracker::TrackerPolicy;
use serde::{Deserialize, Serialize};

/// Everything a link monitor consumes from its surroundings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// PRBS seed shared by generator and checker
    pub seed: u64,
    /// PRBS polynomial
    pub polynomial: PrbsPolynomial,
    /// Payload bytes per generated frame
    pub payload_len: usize,
    /// Largest payload accepted on receive
    pub max_payload_len: usize,
    /// Consecutive gaps tolerated before resynchronizing
    pub gap_threshold: u32,
    /// Resynchronization attempts tolerated before faulting
    pub resync_attempt_limit: u32,
    /// Byte mismatches listed per validation report
    pub bit_error_report_cap: usize,
    /// Frame count to use as the loss-rate denominator
    pub expected_frames: Option<u64>,
    /// Treat any payload not exactly `payload_len` bytes as a length mismatch
    pub strict_length: bool,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED,
            polynomial: PrbsPolynomial::default(),
            payload_len: DEFAULT_PAYLOAD_LEN,
            max_payload_len: DEFAULT_MAX_PAYLOAD_LEN,
            gap_threshold: DEFAULT_GAP_THRESHOLD,
            resync_attempt_limit: DEFAULT_RESYNC_ATTEMPT_LIMIT,
            bit_error_report_cap: DEFAULT_BIT_ERROR_REPORT_CAP,
            expected_frames: None,
            strict_length: false,
        }
    }
}

impl MonitorConfig {
    /// Fail fast on values that would make a session meaningless
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_payload_len == 0 || self.max_payload_len > MAX_PAYLOAD_LIMIT {
            return Err(ConfigError::InvalidLength {
                length: self.max_payload_len,
                max: MAX_PAYLOAD_LIMIT,
            });
        }
        if self.payload_len == 0 || self.payload_len > self.max_payload_len {
            return Err(ConfigError::InvalidLength {
                length: self.payload_len,
                max: self.max_payload_len,
            });
        }
        if self.bit_error_report_cap == 0 {
            return Err(ConfigError::InvalidArgument(
                "bit_error_report_cap must be at least 1".to_string(),
            ));
        }
        if self.expected_frames == Some(0) {
            return Err(ConfigError::InvalidArgument(
                "expected_frames must be positive when set".to_string(),
            ));
        }
        self.polynomial.seed_state(self.seed)?;
        Ok(())
    }

    /// Build the generator this configuration describes
    pub fn generator(&self) -> Result<SequenceGenerator, ConfigError> {
        SequenceGenerator::new(self.polynomial, self.seed, self.max_payload_len)
    }

    /// Resynchronization policy for the tracker
    pub fn tracker_policy(&self) -> TrackerPolicy {
        TrackerPolicy {
            gap_threshold: self.gap_threshold,
            resync_attempt_limit: self.resync_attempt_limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        MonitorConfig::default().validate().unwrap();
    }

    #[test]
    fn test_rejects_bad_lengths() {
        let config = MonitorConfig {
            payload_len: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidLength { .. })));

        let config = MonitorConfig {
            payload_len: 4096,
            max_payload_len: 1024,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = MonitorConfig {
            max_payload_len: MAX_PAYLOAD_LIMIT + 1,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_seed() {
        let config = MonitorConfig {
            seed: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::ZeroSeed(0))));
    }

    #[test]
    fn test_rejects_zero_report_cap() {
        let config = MonitorConfig {
            bit_error_report_cap: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidArgument(_))));
    }
}
