//! PRBS payload checking
//!
//! Every received payload is compared against the window the generator
//! produces for the frame's own `sequence_start`. Bit errors are therefore
//! detected independently of whether the frame arrived in order.

use crate::constants::CHECK_WORD_BYTES;
use crate::generator::SequenceGenerator;
use crate::types::{Frame, SequencePosition};
use serde::{Deserialize, Serialize};

/// One differing byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ByteMismatch {
    /// Offset within the payload
    pub offset: usize,
    /// Byte the generator produced
    pub expected: u8,
    /// Byte that arrived
    pub actual: u8,
}

impl ByteMismatch {
    /// Number of flipped bits in this byte
    pub fn flipped_bits(&self) -> u32 {
        (self.expected ^ self.actual).count_ones()
    }
}

/// Bounded description of a corrupted payload
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BitErrorReport {
    /// First `cap` mismatching bytes, in offset order
    pub mismatches: Vec<ByteMismatch>,
    /// Total bytes that differ, including those beyond the cap
    pub mismatched_bytes: usize,
    /// Total flipped bits across the whole payload
    pub bit_errors: u64,
    /// 32-bit checker words containing at least one error
    pub word_errors: u64,
    /// True when `mismatches` stopped at the cap
    pub truncated: bool,
}

/// Classified outcome of checking one frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationResult {
    /// Payload matches the expected window
    Ok,
    /// Payload has flipped bits
    BitErrors(BitErrorReport),
    /// Payload length differs from the configured frame size, is empty, or
    /// exceeds the generator window
    LengthMismatch {
        /// Configured payload length, or the generator window
        expected: usize,
        /// Observed payload length
        actual: usize,
    },
    /// Payload is clean but does not start where the link expected
    SequenceGap {
        /// Position the tracker was waiting for
        expected_start: SequencePosition,
        /// Position the frame carries
        actual_start: SequencePosition,
    },
}

impl ValidationResult {
    /// True when the payload itself matched the PRBS window
    pub fn payload_ok(&self) -> bool {
        matches!(self, ValidationResult::Ok | ValidationResult::SequenceGap { .. })
    }

    /// Flipped bits carried by this result
    pub fn bit_errors(&self) -> u64 {
        match self {
            ValidationResult::BitErrors(report) => report.bit_errors,
            _ => 0,
        }
    }
}

/// Recomputes expected payloads and compares them byte by byte
#[derive(Debug, Clone)]
pub struct PayloadValidator {
    generator: SequenceGenerator,
    report_cap: usize,
    expected_len: Option<usize>,
}

impl PayloadValidator {
    /// Create a validator; `report_cap` bounds the mismatch list of a single report
    pub fn new(generator: SequenceGenerator, report_cap: usize) -> Self {
        Self {
            generator,
            report_cap,
            expected_len: None,
        }
    }

    /// Report `LengthMismatch` for any payload that is not exactly `len` bytes
    pub fn with_expected_len(mut self, len: usize) -> Self {
        self.expected_len = Some(len);
        self
    }

    /// The generator used for expected payloads
    pub fn generator(&self) -> &SequenceGenerator {
        &self.generator
    }

    /// Check a frame against the PRBS window at its own start position
    pub fn validate(&self, frame: &Frame) -> ValidationResult {
        let actual = frame.payload.as_ref();

        if let Some(expected) = self.expected_len {
            if actual.len() != expected {
                return ValidationResult::LengthMismatch {
                    expected,
                    actual: actual.len(),
                };
            }
        }
        // An empty payload carries no PRBS evidence
        if actual.is_empty() || actual.len() > self.generator.max_len() {
            return ValidationResult::LengthMismatch {
                expected: self.generator.max_len(),
                actual: actual.len(),
            };
        }

        let mut expected = self.generator.stream(frame.header.sequence_start);
        let mut report = BitErrorReport::default();
        let mut last_bad_word = None;

        for (offset, &got) in actual.iter().enumerate() {
            let want = expected.next_byte();
            let diff = want ^ got;
            if diff == 0 {
                continue;
            }

            report.mismatched_bytes += 1;
            report.bit_errors += diff.count_ones() as u64;

            let word = offset / CHECK_WORD_BYTES;
            if last_bad_word != Some(word) {
                report.word_errors += 1;
                last_bad_word = Some(word);
            }

            if report.mismatches.len() < self.report_cap {
                report.mismatches.push(ByteMismatch {
                    offset,
                    expected: want,
                    actual: got,
                });
            } else {
                report.truncated = true;
            }
        }

        if report.mismatched_bytes == 0 {
            ValidationResult::Ok
        } else {
            ValidationResult::BitErrors(report)
        }
    }

    /// Check a frame and also classify its position against `expected_start`
    ///
    /// Payload errors take precedence: a corrupted frame reports
    /// `BitErrors` whatever its position.
    pub fn validate_expected(&self, frame: &Frame, expected_start: SequencePosition) -> ValidationResult {
        match self.validate(frame) {
            ValidationResult::Ok if frame.header.sequence_start != expected_start => {
                ValidationResult::SequenceGap {
                    expected_start,
                    actual_start: frame.header.sequence_start,
                }
            }
            other => other,
        }
    }
}
