//! Per-link sequence tracking and resynchronization
//!
//! The tracker only sees positions and whether the payload checked clean;
//! payload comparison happens in the validator before the tracker runs.
//!
//! ```text
//! Uninitialized --clean frame--> Synchronized
//! Synchronized --consecutive gaps > threshold--> Resynchronizing
//! Resynchronizing --clean frame--> Synchronized
//! Resynchronizing --attempts > limit--> Faulted (until reset)
//! ```

use crate::types::SequencePosition;
use core::fmt;
use serde::{Deserialize, Serialize};

#[cfg(feature = "logging")]
use tracing::debug;

/// Why a link was declared down
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FaultReason {
    /// Frames kept arriving but never matched the PRBS at their position
    SustainedDesync,
    /// Resynchronization attempts ran out without a clean frame
    ResyncExhausted,
}

impl fmt::Display for FaultReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FaultReason::SustainedDesync => write!(f, "sustained desynchronization"),
            FaultReason::ResyncExhausted => write!(f, "resynchronization attempts exhausted"),
        }
    }
}

/// Tracker state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TrackerState {
    /// No clean frame seen since the session started
    Uninitialized,
    /// Aligned; waiting for the frame starting at `next_expected`
    Synchronized {
        /// Position the next in-order frame should start at
        next_expected: SequencePosition,
    },
    /// Alignment lost; looking for a clean frame to re-baseline on
    Resynchronizing {
        /// Frames seen without recovering
        attempts: u32,
        /// Highest position accounted for so far
        last_expected: SequencePosition,
    },
    /// Link reported down; cleared only by reset
    Faulted {
        /// Why the link went down
        reason: FaultReason,
    },
}

impl TrackerState {
    /// Short lowercase name for logs and reports
    pub fn name(&self) -> &'static str {
        match self {
            TrackerState::Uninitialized => "uninitialized",
            TrackerState::Synchronized { .. } => "synchronized",
            TrackerState::Resynchronizing { .. } => "resynchronizing",
            TrackerState::Faulted { .. } => "faulted",
        }
    }
}

/// Resynchronization policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerPolicy {
    /// Consecutive gap events tolerated; one more enters Resynchronizing
    pub gap_threshold: u32,
    /// Resynchronization attempts tolerated; one more enters Faulted
    pub resync_attempt_limit: u32,
}

/// One received frame as the tracker sees it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Observation {
    /// Frame identifier from the header
    pub frame_id: u64,
    /// First payload position
    pub sequence_start: SequencePosition,
    /// Payload length in positions
    pub len: u64,
    /// Whether the payload matched the PRBS window at `sequence_start`
    pub payload_ok: bool,
}

impl Observation {
    fn end(&self) -> SequencePosition {
        self.sequence_start.saturating_add(self.len)
    }
}

/// Loss inferred from a forward jump
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Loss {
    /// Position the tracker expected
    pub expected_start: SequencePosition,
    /// Position that arrived
    pub actual_start: SequencePosition,
    /// Missing stream positions
    pub lost_units: u64,
    /// Missing frames not already charged by malformed deliveries
    pub lost_frames: u64,
}

/// What a single observation did to the tracker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackEvent {
    /// First clean frame established the baseline
    Synchronized {
        /// Start of the baseline frame
        baseline: SequencePosition,
    },
    /// Frame continued the sequence exactly
    InOrder,
    /// Frames went missing; the tracker moved past them
    Gap(Loss),
    /// A gap pushed the consecutive-gap count over the threshold
    ResyncStarted(Loss),
    /// Frame was behind the expected position (reordered or duplicate)
    Stale,
    /// A failed frame while resynchronizing
    ResyncAttempt {
        /// Attempts so far
        attempt: u32,
    },
    /// A clean frame ended resynchronization
    Recovered(Loss),
    /// Attempts exceeded the limit; the link is down
    Faulted(FaultReason),
    /// Nothing changed (waiting for a first clean frame, or already faulted)
    Ignored,
}

/// Per-link running sequence state
#[derive(Debug, Clone)]
pub struct SequenceTracker {
    policy: TrackerPolicy,
    state: TrackerState,
    consecutive_gaps: u32,
    last_frame_id: Option<u64>,
    precharged_losses: u64,
    resync_corrupt_only: bool,
}

impl SequenceTracker {
    /// Create a tracker in the `Uninitialized` state
    pub fn new(policy: TrackerPolicy) -> Self {
        Self {
            policy,
            state: TrackerState::Uninitialized,
            consecutive_gaps: 0,
            last_frame_id: None,
            precharged_losses: 0,
            resync_corrupt_only: true,
        }
    }

    /// Current state
    pub fn state(&self) -> TrackerState {
        self.state
    }

    /// Consecutive gap events since the last in-order frame
    pub fn consecutive_gaps(&self) -> u32 {
        self.consecutive_gaps
    }

    /// Return to `Uninitialized`, forgetting all history
    pub fn reset(&mut self) {
        *self = Self::new(self.policy);
    }

    /// Feed one decoded frame
    pub fn observe(&mut self, obs: Observation) -> TrackEvent {
        match self.state {
            TrackerState::Uninitialized => {
                if !obs.payload_ok {
                    return TrackEvent::Ignored;
                }
                self.accept(&obs);
                #[cfg(feature = "logging")]
                debug!("Synchronized at position {} (frame {})", obs.sequence_start, obs.frame_id);
                TrackEvent::Synchronized {
                    baseline: obs.sequence_start,
                }
            }
            TrackerState::Synchronized { next_expected } => self.observe_synchronized(obs, next_expected),
            TrackerState::Resynchronizing {
                attempts,
                last_expected,
            } => self.observe_resynchronizing(obs, attempts, last_expected),
            TrackerState::Faulted { .. } => TrackEvent::Ignored,
        }
    }

    /// Feed a delivery that could not be decoded
    ///
    /// The frame is charged as lost straight away; the next gap subtracts
    /// it so the same missing frame is not counted twice.
    pub fn observe_malformed(&mut self) -> TrackEvent {
        self.precharged_losses = self.precharged_losses.saturating_add(1);
        match self.state {
            TrackerState::Resynchronizing {
                attempts,
                last_expected,
            } => {
                self.resync_corrupt_only = false;
                self.fail_attempt(attempts, last_expected)
            }
            _ => TrackEvent::Ignored,
        }
    }

    fn observe_synchronized(&mut self, obs: Observation, next_expected: SequencePosition) -> TrackEvent {
        if obs.sequence_start == next_expected {
            self.consecutive_gaps = 0;
            self.accept(&obs);
            return TrackEvent::InOrder;
        }

        if obs.sequence_start < next_expected {
            return TrackEvent::Stale;
        }

        let loss = self.loss_between(next_expected, &obs);
        self.consecutive_gaps = self.consecutive_gaps.saturating_add(1);
        self.accept(&obs);

        if self.consecutive_gaps > self.policy.gap_threshold {
            #[cfg(feature = "logging")]
            debug!(
                "{} consecutive gaps exceed threshold {}, resynchronizing",
                self.consecutive_gaps, self.policy.gap_threshold
            );
            self.state = TrackerState::Resynchronizing {
                attempts: 0,
                last_expected: obs.end(),
            };
            self.resync_corrupt_only = true;
            TrackEvent::ResyncStarted(loss)
        } else {
            TrackEvent::Gap(loss)
        }
    }

    fn observe_resynchronizing(
        &mut self,
        obs: Observation,
        attempts: u32,
        last_expected: SequencePosition,
    ) -> TrackEvent {
        if obs.payload_ok && obs.sequence_start >= last_expected {
            let loss = self.loss_between(last_expected, &obs);
            self.consecutive_gaps = 0;
            self.accept(&obs);
            #[cfg(feature = "logging")]
            debug!("Recovered at position {} after {} attempts", obs.sequence_start, attempts);
            return TrackEvent::Recovered(loss);
        }

        if !obs.payload_ok {
            // Header positions are checksummed, so corrupted frames still account their span
            self.last_frame_id = Some(obs.frame_id);
        } else {
            self.resync_corrupt_only = false;
        }
        self.fail_attempt(attempts, last_expected.max(obs.end()))
    }

    fn fail_attempt(&mut self, attempts: u32, last_expected: SequencePosition) -> TrackEvent {
        let attempts = attempts.saturating_add(1);
        if attempts > self.policy.resync_attempt_limit {
            let reason = if self.resync_corrupt_only {
                FaultReason::SustainedDesync
            } else {
                FaultReason::ResyncExhausted
            };
            self.state = TrackerState::Faulted { reason };
            return TrackEvent::Faulted(reason);
        }
        self.state = TrackerState::Resynchronizing {
            attempts,
            last_expected,
        };
        TrackEvent::ResyncAttempt { attempt: attempts }
    }

    fn accept(&mut self, obs: &Observation) {
        self.state = TrackerState::Synchronized {
            next_expected: obs.end(),
        };
        self.last_frame_id = Some(obs.frame_id);
        self.precharged_losses = 0;
    }

    fn loss_between(&self, expected_start: SequencePosition, obs: &Observation) -> Loss {
        let lost_units = obs.sequence_start.saturating_sub(expected_start);
        let lost_frames = if lost_units == 0 {
            0
        } else {
            let by_id = self
                .last_frame_id
                .and_then(|last| obs.frame_id.checked_sub(last))
                .filter(|delta| *delta > 0)
                .map(|delta| delta - 1);
            let inferred = by_id.unwrap_or_else(|| {
                if obs.len == 0 {
                    1
                } else {
                    lost_units.div_ceil(obs.len)
                }
            });
            inferred.saturating_sub(self.precharged_losses)
        };

        Loss {
            expected_start,
            actual_start: obs.sequence_start,
            lost_units,
            lost_frames,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(gap_threshold: u32, resync_attempt_limit: u32) -> TrackerPolicy {
        TrackerPolicy {
            gap_threshold,
            resync_attempt_limit,
        }
    }

    fn obs(frame_id: u64, len: u64, ok: bool) -> Observation {
        Observation {
            frame_id,
            sequence_start: frame_id * len,
            len,
            payload_ok: ok,
        }
    }

    #[test]
    fn test_first_clean_frame_synchronizes() {
        let mut tracker = SequenceTracker::new(policy(2, 2));
        assert_eq!(tracker.observe(obs(5, 10, false)), TrackEvent::Ignored);
        assert_eq!(tracker.state(), TrackerState::Uninitialized);

        assert_eq!(
            tracker.observe(obs(5, 10, true)),
            TrackEvent::Synchronized { baseline: 50 }
        );
        assert_eq!(tracker.state(), TrackerState::Synchronized { next_expected: 60 });
    }

    #[test]
    fn test_in_order_stream() {
        let mut tracker = SequenceTracker::new(policy(2, 2));
        tracker.observe(obs(0, 10, true));
        for id in 1..50 {
            assert_eq!(tracker.observe(obs(id, 10, true)), TrackEvent::InOrder);
        }
        assert_eq!(tracker.state(), TrackerState::Synchronized { next_expected: 500 });
    }

    #[test]
    fn test_gap_of_two_frames() {
        let mut tracker = SequenceTracker::new(policy(2, 2));
        tracker.observe(obs(99, 10, true));

        let event = tracker.observe(obs(102, 10, true));

        assert_eq!(
            event,
            TrackEvent::Gap(Loss {
                expected_start: 1000,
                actual_start: 1020,
                lost_units: 20,
                lost_frames: 2,
            })
        );
        assert_eq!(tracker.state(), TrackerState::Synchronized { next_expected: 1030 });
    }

    #[test]
    fn test_stale_frame_does_not_advance() {
        let mut tracker = SequenceTracker::new(policy(2, 2));
        tracker.observe(obs(0, 10, true));
        tracker.observe(obs(1, 10, true));

        assert_eq!(tracker.observe(obs(0, 10, true)), TrackEvent::Stale);
        assert_eq!(tracker.state(), TrackerState::Synchronized { next_expected: 20 });
    }

    #[test]
    fn test_consecutive_gaps_start_resync() {
        let mut tracker = SequenceTracker::new(policy(1, 5));
        tracker.observe(obs(0, 10, true));

        assert!(matches!(tracker.observe(obs(2, 10, true)), TrackEvent::Gap(_)));
        assert!(matches!(tracker.observe(obs(4, 10, true)), TrackEvent::ResyncStarted(_)));
        assert_eq!(
            tracker.state(),
            TrackerState::Resynchronizing { attempts: 0, last_expected: 50 }
        );
    }

    #[test]
    fn test_in_order_frame_clears_gap_count() {
        let mut tracker = SequenceTracker::new(policy(1, 5));
        tracker.observe(obs(0, 10, true));
        tracker.observe(obs(2, 10, true));
        tracker.observe(obs(3, 10, true));
        assert_eq!(tracker.consecutive_gaps(), 0);
        assert!(matches!(tracker.observe(obs(5, 10, true)), TrackEvent::Gap(_)));
    }

    #[test]
    fn test_resync_recovers_on_clean_frame() {
        let mut tracker = SequenceTracker::new(policy(0, 5));
        tracker.observe(obs(0, 10, true));
        tracker.observe(obs(2, 10, true));

        assert_eq!(tracker.observe(obs(3, 10, false)), TrackEvent::ResyncAttempt { attempt: 1 });
        let event = tracker.observe(obs(6, 10, true));

        assert_eq!(
            event,
            TrackEvent::Recovered(Loss {
                expected_start: 40,
                actual_start: 60,
                lost_units: 20,
                lost_frames: 2,
            })
        );
        assert_eq!(tracker.state(), TrackerState::Synchronized { next_expected: 70 });
    }

    #[test]
    fn test_sustained_corruption_faults() {
        let mut tracker = SequenceTracker::new(policy(0, 2));
        tracker.observe(obs(0, 10, true));
        tracker.observe(obs(2, 10, true));

        assert_eq!(tracker.observe(obs(3, 10, false)), TrackEvent::ResyncAttempt { attempt: 1 });
        assert_eq!(tracker.observe(obs(4, 10, false)), TrackEvent::ResyncAttempt { attempt: 2 });
        assert_eq!(
            tracker.observe(obs(5, 10, false)),
            TrackEvent::Faulted(FaultReason::SustainedDesync)
        );
        assert_eq!(tracker.observe(obs(6, 10, true)), TrackEvent::Ignored);
        assert_eq!(
            tracker.state(),
            TrackerState::Faulted { reason: FaultReason::SustainedDesync }
        );
    }

    #[test]
    fn test_malformed_frames_exhaust_resync() {
        let mut tracker = SequenceTracker::new(policy(0, 1));
        tracker.observe(obs(0, 10, true));
        tracker.observe(obs(2, 10, true));

        tracker.observe_malformed();
        assert_eq!(
            tracker.observe_malformed(),
            TrackEvent::Faulted(FaultReason::ResyncExhausted)
        );
    }

    #[test]
    fn test_malformed_frame_is_not_double_counted() {
        let mut tracker = SequenceTracker::new(policy(4, 4));
        tracker.observe(obs(0, 10, true));
        tracker.observe_malformed();

        match tracker.observe(obs(2, 10, true)) {
            TrackEvent::Gap(loss) => {
                assert_eq!(loss.lost_units, 10);
                assert_eq!(loss.lost_frames, 0);
            }
            other => panic!("expected gap, got {other:?}"),
        }
    }

    #[test]
    fn test_reset_returns_to_uninitialized() {
        let mut tracker = SequenceTracker::new(policy(0, 0));
        tracker.observe(obs(0, 10, true));
        tracker.reset();
        assert_eq!(tracker.state(), TrackerState::Uninitialized);
        assert_eq!(tracker.consecutive_gaps(), 0);
    }
}
