//! Per-link orchestration
//!
//! A [`LinkMonitor`] is driven by exactly one thread (it takes `&mut self`
//! for every mutating call). Decoding and payload comparison run without
//! any lock; only the tracker and counter update, and the snapshot copy,
//! share one short critical section with [`MonitorHandle`] readers.

use crate::codec::FrameCodec;
use crate::config::MonitorConfig;
use crate::encoder::{encode_prbs_frame, TxSequencer};
use crate::error::{ConfigError, DecodeError};
use crate::generator::SequenceGenerator;
use crate::scanner::{ScanStats, StreamReassembler};
use crate::stats::{LinkStatistics, LinkStatisticsView};
use crate::tracker::{FaultReason, Observation, SequenceTracker, TrackEvent, TrackerState};
use crate::types::{Frame, LinkId};
use crate::validator::{PayloadValidator, ValidationResult};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::sync::{mpsc, Arc, Mutex, MutexGuard, PoisonError};

#[cfg(feature = "logging")]
use tracing::{debug, error, info, warn};

/// Emitted once per Resynchronizing → Faulted transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaultEvent {
    /// Link that went down
    pub link: LinkId,
    /// Why it went down
    pub reason: FaultReason,
}

type FaultCallback = Box<dyn Fn(&FaultEvent) + Send>;

/// Everything `reset()` reinitializes
#[derive(Debug)]
struct LinkState {
    tracker: SequenceTracker,
    stats: LinkStatistics,
    tx: TxSequencer,
    reassembler: StreamReassembler,
    last_result: Option<ValidationResult>,
}

impl LinkState {
    fn reset(&mut self) {
        self.tracker.reset();
        self.stats.reset();
        self.tx.reset();
        self.reassembler.reset();
        self.last_result = None;
    }
}

#[derive(Debug)]
struct Shared {
    link: LinkId,
    expected_frames: Option<u64>,
    state: Mutex<LinkState>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, LinkState> {
        // Counters are consistent between statements, so a panicked holder leaves nothing torn
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn snapshot(&self) -> LinkStatisticsView {
        let state = self.lock();
        state
            .stats
            .view(self.link, state.tracker.state(), self.expected_frames)
    }

    fn reset(&self) {
        self.lock().reset();
        #[cfg(feature = "logging")]
        info!("Link {} session reset", self.link);
    }
}

/// Read-only view and reset control for a monitor running on another thread
#[derive(Debug, Clone)]
pub struct MonitorHandle {
    shared: Arc<Shared>,
}

impl MonitorHandle {
    /// Link this handle observes
    pub fn link(&self) -> LinkId {
        self.shared.link
    }

    /// Consistent copy of the statistics and tracker state
    pub fn snapshot(&self) -> LinkStatisticsView {
        self.shared.snapshot()
    }

    /// Start a new session on the monitored link
    pub fn reset(&self) {
        self.shared.reset();
    }
}

/// Generator, checker and accounting for one logical link
pub struct LinkMonitor {
    shared: Arc<Shared>,
    codec: FrameCodec,
    generator: SequenceGenerator,
    validator: PayloadValidator,
    fault_sinks: Vec<FaultCallback>,
}

impl core::fmt::Debug for LinkMonitor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LinkMonitor")
            .field("link", &self.shared.link)
            .field("codec", &self.codec)
            .field("fault_sinks", &self.fault_sinks.len())
            .finish()
    }
}

impl LinkMonitor {
    /// Validate `config` and start a session on `link`
    pub fn new(link: LinkId, config: &MonitorConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let codec = FrameCodec::new(config.max_payload_len)?;
        let generator = config.generator()?;
        let mut validator = PayloadValidator::new(generator, config.bit_error_report_cap);
        if config.strict_length {
            validator = validator.with_expected_len(config.payload_len);
        }

        let state = LinkState {
            tracker: SequenceTracker::new(config.tracker_policy()),
            stats: LinkStatistics::new(),
            tx: TxSequencer::new(link, generator, config.payload_len)?,
            reassembler: StreamReassembler::new(codec),
            last_result: None,
        };

        #[cfg(feature = "logging")]
        info!(
            "Link {} session started: {:?} seed {:#x}, {} byte frames",
            link, config.polynomial, config.seed, config.payload_len
        );

        Ok(Self {
            shared: Arc::new(Shared {
                link,
                expected_frames: config.expected_frames,
                state: Mutex::new(state),
            }),
            codec,
            generator,
            validator,
            fault_sinks: Vec::new(),
        })
    }

    /// Link this monitor drives
    pub fn link(&self) -> LinkId {
        self.shared.link
    }

    /// Cloneable handle for telemetry threads
    pub fn handle(&self) -> MonitorHandle {
        MonitorHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Receive fault notifications on a channel
    pub fn subscribe_faults(&mut self) -> mpsc::Receiver<FaultEvent> {
        let (tx, rx) = mpsc::channel();
        self.on_fault(move |event| {
            // A dropped receiver just stops listening
            let _ = tx.send(*event);
        });
        rx
    }

    /// Run `callback` on every fault notification
    pub fn on_fault<F>(&mut self, callback: F)
    where
        F: Fn(&FaultEvent) + Send + 'static,
    {
        self.fault_sinks.push(Box::new(callback));
    }

    /// Outcome of the most recent decoded frame in the current session
    pub fn last_result(&self) -> Option<ValidationResult> {
        self.shared.lock().last_result.clone()
    }

    /// Produce the next outgoing frame and count it as sent
    pub fn next_tx_frame(&mut self) -> Bytes {
        let header = {
            let mut state = self.shared.lock();
            state.stats.record_sent();
            state.tx.claim()
        };
        encode_prbs_frame(&self.generator, &header)
    }

    /// Count an error reported by the transport collaborator
    pub fn record_link_error(&mut self) {
        self.shared.lock().stats.record_link_error();
    }

    /// Process one delivery holding exactly one encoded frame
    pub fn submit_rx(&mut self, raw: Bytes) {
        match self.codec.decode(raw) {
            Ok(frame) if frame.header.link != self.shared.link => {
                #[cfg(feature = "logging")]
                warn!(
                    "Link {} received frame {} tagged for {}",
                    self.shared.link, frame.header.frame_id, frame.header.link
                );
                self.process_malformed();
            }
            Ok(frame) => self.process_frame(frame),
            Err(e) => self.reject(e),
        }
    }

    /// Process a chunk of a byte-stream transport
    pub fn submit_rx_stream(&mut self, chunk: &[u8]) {
        let pieces = self.shared.lock().reassembler.push(chunk);
        for piece in pieces {
            match piece {
                Ok(raw) => self.submit_rx(raw),
                Err(e) => self.reject(e),
            }
        }
    }

    /// Reassembly counters for byte-stream deliveries
    pub fn scan_stats(&self) -> ScanStats {
        self.shared.lock().reassembler.stats()
    }

    /// Consistent copy of the statistics and tracker state
    pub fn snapshot(&self) -> LinkStatisticsView {
        self.shared.snapshot()
    }

    /// Current tracker state
    pub fn tracker_state(&self) -> TrackerState {
        self.shared.lock().tracker.state()
    }

    /// Start a new session: tracker `Uninitialized`, counters zero, tx at frame 0
    pub fn reset(&mut self) {
        self.shared.reset();
    }

    fn reject(&mut self, e: DecodeError) {
        #[cfg(feature = "logging")]
        warn!("Link {} malformed frame: {}", self.shared.link, e);
        #[cfg(not(feature = "logging"))]
        let _ = e;
        self.process_malformed();
    }

    fn process_malformed(&mut self) {
        let fault = {
            let mut state = self.shared.lock();
            state.stats.record_malformed();
            let event = state.tracker.observe_malformed();
            apply_event(&mut state.stats, event)
        };
        self.notify(fault);
    }

    fn process_frame(&mut self, frame: Frame) {
        let result = self.validator.validate(&frame);

        let fault = {
            let mut state = self.shared.lock();

            let result = match (result, state.tracker.state()) {
                (ValidationResult::Ok, TrackerState::Synchronized { next_expected })
                    if frame.header.sequence_start != next_expected =>
                {
                    ValidationResult::SequenceGap {
                        expected_start: next_expected,
                        actual_start: frame.header.sequence_start,
                    }
                }
                (other, _) => other,
            };

            match &result {
                ValidationResult::LengthMismatch { .. } => state.stats.record_length_mismatch(),
                ValidationResult::BitErrors(report) => {
                    state
                        .stats
                        .record_received(frame.len(), report.bit_errors, report.word_errors)
                }
                ValidationResult::Ok | ValidationResult::SequenceGap { .. } => {
                    state.stats.record_received(frame.len(), 0, 0)
                }
            }

            let event = state.tracker.observe(Observation {
                frame_id: frame.header.frame_id,
                sequence_start: frame.header.sequence_start,
                len: frame.len() as u64,
                payload_ok: result.payload_ok(),
            });

            #[cfg(feature = "logging")]
            log_event(self.shared.link, &frame, &event);

            state.last_result = Some(result);
            apply_event(&mut state.stats, event)
        };

        self.notify(fault);
    }

    fn notify(&self, fault: Option<FaultReason>) {
        if let Some(reason) = fault {
            let event = FaultEvent {
                link: self.shared.link,
                reason,
            };
            #[cfg(feature = "logging")]
            error!("Link {} faulted: {}", event.link, reason);
            for sink in &self.fault_sinks {
                sink(&event);
            }
        }
    }
}

/// Fold a tracker event into the counters; returns a new fault, if any
fn apply_event(stats: &mut LinkStatistics, event: TrackEvent) -> Option<FaultReason> {
    match event {
        TrackEvent::Gap(loss) | TrackEvent::Recovered(loss) => stats.record_loss(&loss),
        TrackEvent::ResyncStarted(loss) => {
            stats.record_loss(&loss);
            stats.record_resync();
        }
        TrackEvent::Stale => stats.record_reordered(),
        TrackEvent::Faulted(reason) => {
            stats.record_fault();
            return Some(reason);
        }
        TrackEvent::Synchronized { .. }
        | TrackEvent::InOrder
        | TrackEvent::ResyncAttempt { .. }
        | TrackEvent::Ignored => {}
    }
    None
}

#[cfg(feature = "logging")]
fn log_event(link: LinkId, frame: &Frame, event: &TrackEvent) {
    match event {
        TrackEvent::Synchronized { baseline } => {
            info!("Link {} synchronized at position {}", link, baseline)
        }
        TrackEvent::Gap(loss) => warn!(
            "Link {} gap before frame {}: {} positions, {} frames lost",
            link, frame.header.frame_id, loss.lost_units, loss.lost_frames
        ),
        TrackEvent::ResyncStarted(loss) => warn!(
            "Link {} resynchronizing after gap of {} positions",
            link, loss.lost_units
        ),
        TrackEvent::Recovered(loss) => info!(
            "Link {} recovered at frame {} ({} positions skipped)",
            link, frame.header.frame_id, loss.lost_units
        ),
        TrackEvent::Stale => debug!(
            "Link {} frame {} behind expected position",
            link, frame.header.frame_id
        ),
        TrackEvent::ResyncAttempt { attempt } => {
            debug!("Link {} resync attempt {} failed", link, attempt)
        }
        TrackEvent::InOrder | TrackEvent::Faulted(_) | TrackEvent::Ignored => {}
    }
}
