//! # Prbslink Core
//!
//! PRBS traffic generation, checking and link-health accounting for
//! point-to-point and Ethernet links under test.
//!
//! ## Modules
//!
//! - `constants`: Frame format constants, defaults and transport kinds
//! - `types`: Core types (LinkId, Frame, FrameHeader)
//! - `generator`: Random-access PRBS sequence generation
//! - `encoder`: Frame encoding and the transmit sequencer
//! - `decoder`: Strict frame decoding
//! - `codec`: Bounded encode/decode facade
//! - `scanner`: Marker-hunting reassembly for byte-stream links
//! - `validator`: Payload comparison and bit error reports
//! - `tracker`: Sequence tracking and resynchronization
//! - `stats`: Link counters and derived rates
//! - `config`: Monitor configuration
//! - `monitor`: Per-link orchestration and fault notification
//! - `transport`: Transport and delivery traits

#![warn(missing_docs)]

pub mod codec;
pub mod config;
pub mod constants;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod generator;
pub mod monitor;
pub mod scanner;
pub mod stats;
pub mod tracker;
pub mod transport;
pub mod types;
pub mod validator;

// Re-export commonly used types
pub use codec::FrameCodec;
pub use config::MonitorConfig;
pub use constants::TransportKind;
pub use error::{ConfigError, DecodeError, TransportError};
pub use generator::{PrbsPolynomial, SequenceGenerator};
pub use monitor::{FaultEvent, LinkMonitor, MonitorHandle};
pub use stats::{LinkCounters, LinkStatistics, LinkStatisticsView};
pub use tracker::{FaultReason, SequenceTracker, TrackerState};
pub use transport::{DeliveryMode, LinkEndpoint, QueueTransport, RxSink, Transport};
pub use types::{Frame, FrameHeader, LinkId, SequencePosition};
pub use validator::{BitErrorReport, PayloadValidator, ValidationResult};

/// Result type alias for frame decoding
pub type Result<T> = core::result::Result<T, DecodeError>;
