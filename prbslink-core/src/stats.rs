//! Link health counters and derived rates

use crate::tracker::{Loss, TrackerState};
use crate::types::LinkId;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Monotonic, saturating per-link counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LinkCounters {
    /// Frames generated for transmission
    pub frames_sent: u64,
    /// Frames that decoded successfully
    pub frames_received: u64,
    /// Received frames whose payload matched
    pub frames_ok: u64,
    /// Received frames with at least one flipped bit
    pub frames_with_errors: u64,
    /// Frames inferred missing from sequence gaps, plus malformed deliveries
    pub frames_lost: u64,
    /// Frames that arrived behind the expected position
    pub frames_reordered: u64,
    /// Deliveries that failed to decode
    pub malformed_frames: u64,
    /// Frames whose payload length differed from the configured size
    pub length_mismatches: u64,
    /// Total flipped bits
    pub bit_errors_total: u64,
    /// 32-bit checker words with at least one flipped bit
    pub word_errors: u64,
    /// Payload bytes compared against the PRBS
    pub bytes_validated: u64,
    /// Stream positions skipped by gaps
    pub sequence_units_lost: u64,
    /// Errors reported by the transport collaborator
    pub link_errors: u64,
    /// Entries into resynchronization
    pub resync_events: u64,
    /// Transitions into the faulted state
    pub faults: u64,
}

/// Accumulates counters for one link session
#[derive(Debug, Clone)]
pub struct LinkStatistics {
    counters: LinkCounters,
    started: Instant,
}

impl Default for LinkStatistics {
    fn default() -> Self {
        Self::new()
    }
}

impl LinkStatistics {
    /// Start a session now with every counter at zero
    pub fn new() -> Self {
        Self {
            counters: LinkCounters::default(),
            started: Instant::now(),
        }
    }

    /// Raw counters
    pub fn counters(&self) -> &LinkCounters {
        &self.counters
    }

    /// Time since the session started
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Zero all counters and restart the session clock
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Record one generated frame
    pub fn record_sent(&mut self) {
        bump(&mut self.counters.frames_sent, 1);
    }

    /// Record a decoded frame and the outcome of its payload check
    pub fn record_received(&mut self, payload_len: usize, bit_errors: u64, word_errors: u64) {
        let c = &mut self.counters;
        bump(&mut c.frames_received, 1);
        bump(&mut c.bytes_validated, payload_len as u64);
        if bit_errors == 0 {
            bump(&mut c.frames_ok, 1);
        } else {
            bump(&mut c.frames_with_errors, 1);
            bump(&mut c.bit_errors_total, bit_errors);
            bump(&mut c.word_errors, word_errors);
        }
    }

    /// Record a decoded frame whose length did not match the configured size
    pub fn record_length_mismatch(&mut self) {
        bump(&mut self.counters.frames_received, 1);
        bump(&mut self.counters.length_mismatches, 1);
    }

    /// Record a delivery that failed to decode; it counts as one lost frame
    pub fn record_malformed(&mut self) {
        bump(&mut self.counters.malformed_frames, 1);
        bump(&mut self.counters.frames_lost, 1);
    }

    /// Record a forward jump in the sequence
    pub fn record_loss(&mut self, loss: &Loss) {
        bump(&mut self.counters.frames_lost, loss.lost_frames);
        bump(&mut self.counters.sequence_units_lost, loss.lost_units);
    }

    /// Record a frame that arrived behind the expected position
    pub fn record_reordered(&mut self) {
        bump(&mut self.counters.frames_reordered, 1);
    }

    /// Record an error reported by the transport
    pub fn record_link_error(&mut self) {
        bump(&mut self.counters.link_errors, 1);
    }

    /// Record entry into resynchronization
    pub fn record_resync(&mut self) {
        bump(&mut self.counters.resync_events, 1);
    }

    /// Record a transition into the faulted state
    pub fn record_fault(&mut self) {
        bump(&mut self.counters.faults, 1);
    }

    /// Freeze the counters into an immutable view
    pub fn view(&self, link: LinkId, tracker: TrackerState, expected_frames: Option<u64>) -> LinkStatisticsView {
        LinkStatisticsView::new(link, self.counters, tracker, self.elapsed(), expected_frames)
    }
}

#[inline]
fn bump(counter: &mut u64, by: u64) {
    *counter = counter.saturating_add(by);
}

/// Immutable point-in-time copy of a link's statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkStatisticsView {
    /// Link the counters belong to
    pub link: LinkId,
    /// Counter values at the moment of the snapshot
    pub counters: LinkCounters,
    /// Tracker state at the moment of the snapshot
    pub tracker: TrackerState,
    /// Session age
    pub elapsed: Duration,
    /// Flipped bits per validated bit
    pub bit_error_rate: f64,
    /// Lost frames per expected frame
    pub frame_loss_rate: f64,
    /// Validated payload bits per second
    pub throughput_bps: f64,
    /// Received frames per second
    pub frames_per_second: f64,
}

impl LinkStatisticsView {
    /// Derive rates from raw counters
    ///
    /// The loss-rate denominator is `expected_frames` when given, else
    /// `frames_sent`, else everything that was received or found missing.
    pub fn new(
        link: LinkId,
        counters: LinkCounters,
        tracker: TrackerState,
        elapsed: Duration,
        expected_frames: Option<u64>,
    ) -> Self {
        let bits = counters.bytes_validated.saturating_mul(8);
        let bit_error_rate = ratio(counters.bit_errors_total, bits);

        let denominator = expected_frames.filter(|n| *n > 0).unwrap_or(if counters.frames_sent > 0 {
            counters.frames_sent
        } else {
            counters.frames_received.saturating_add(counters.frames_lost)
        });
        let frame_loss_rate = ratio(counters.frames_lost, denominator);

        let secs = elapsed.as_secs_f64();
        let (throughput_bps, frames_per_second) = if secs > 0.0 {
            (bits as f64 / secs, counters.frames_received as f64 / secs)
        } else {
            (0.0, 0.0)
        };

        Self {
            link,
            counters,
            tracker,
            elapsed,
            bit_error_rate,
            frame_loss_rate,
            throughput_bps,
            frames_per_second,
        }
    }

    /// True when the link is down
    pub fn is_faulted(&self) -> bool {
        matches!(self.tracker, TrackerState::Faulted { .. })
    }
}

fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}
