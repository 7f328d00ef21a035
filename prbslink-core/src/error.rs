//! Error types for prbslink operations

use thiserror::Error;

/// Errors raised while decoding a received frame
///
/// Always recoverable: the frame is discarded, counted as malformed and
/// processing continues with the next delivery.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Not enough bytes for a complete header
    #[error("Truncated header: expected {expected} bytes, got {actual}")]
    TruncatedHeader {
        /// The number of bytes a header needs.
        expected: usize,
        /// The number of bytes actually present.
        actual: usize,
    },

    /// Invalid frame marker detected
    #[error("Invalid frame marker: expected PRBS, got {0:?}")]
    BadMarker([u8; 4]),

    /// Unsupported protocol version
    #[error("Unsupported protocol version: {0}")]
    UnsupportedVersion(u8),

    /// Unknown transport tag in the header
    #[error("Unknown transport tag: {0}")]
    UnknownTransport(u8),

    /// Header checksum mismatch
    #[error("Header checksum mismatch: expected {expected:x}, got {actual:x}")]
    HeaderChecksum {
        /// The checksum carried in the header.
        expected: u32,
        /// The checksum computed over the received header.
        actual: u32,
    },

    /// Declared payload exceeds the configured maximum
    #[error("Payload size {declared} exceeds maximum {max}")]
    PayloadTooLarge {
        /// Declared payload length.
        declared: usize,
        /// Configured maximum.
        max: usize,
    },

    /// Header declares a zero-length payload
    #[error("Empty payload: a frame must carry at least one PRBS byte")]
    EmptyPayload,

    /// Alignment padding after the payload is not all zero
    #[error("Non-zero alignment padding: {bits} bits set")]
    NonZeroPadding {
        /// Set bits found in the padding.
        bits: u32,
    },

    /// Declared length does not match the bytes that followed the header
    #[error("Length mismatch: header declares {declared} bytes, {observed} bytes follow")]
    LengthMismatch {
        /// Bytes implied by the header (payload plus alignment padding).
        declared: usize,
        /// Bytes actually present after the header.
        observed: usize,
    },
}

/// Invalid configuration or generator arguments
///
/// Raised before a session starts; never produced mid-session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Requested window length is zero or above the maximum
    #[error("Invalid length {length}: must be between 1 and {max}")]
    InvalidLength {
        /// Requested length.
        length: usize,
        /// Allowed maximum.
        max: usize,
    },

    /// Seed reduces to the all-zero register, which locks the LFSR
    #[error("Seed {0:#x} reduces to the all-zero state for this polynomial")]
    ZeroSeed(u64),

    /// A configuration field is out of range
    #[error("Invalid configuration: {0}")]
    InvalidArgument(String),
}

/// Errors surfaced by an outbound transport collaborator
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Link is down or not trained
    #[error("Link down: {0}")]
    LinkDown(String),

    /// Transport cannot accept more frames right now
    #[error("Transport saturated")]
    Saturated,

    /// Frame exceeds the transport MTU
    #[error("Frame of {size} bytes exceeds transport MTU {mtu}")]
    FrameTooLarge {
        /// Encoded frame size.
        size: usize,
        /// Transport MTU.
        mtu: usize,
    },

    /// Any other transport-side failure
    #[error("Transport error: {0}")]
    Other(String),
}
