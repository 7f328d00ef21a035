//! Core types for prbslink frames and links

use crate::constants::{TransportKind, PROTOCOL_VERSION};
use bytes::Bytes;
use core::fmt;
use serde::{Deserialize, Serialize};

/// Logical offset into the infinite pseudo-random stream, in bytes
pub type SequencePosition = u64;

/// Identifies one independently monitored transport path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LinkId {
    /// Transport encapsulation
    pub transport: TransportKind,

    /// Lane index within the transport
    pub lane: u8,
}

impl LinkId {
    /// Create a link id
    pub const fn new(transport: TransportKind, lane: u8) -> Self {
        Self { transport, lane }
    }

    /// Lane `lane` of the Ethernet transport
    pub const fn ethernet(lane: u8) -> Self {
        Self::new(TransportKind::Ethernet, lane)
    }

    /// Lane `lane` of the point-to-point transport
    pub const fn point_to_point(lane: u8) -> Self {
        Self::new(TransportKind::PointToPoint, lane)
    }
}

impl fmt::Display for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.transport.short_name(), self.lane)
    }
}

/// Frame header containing sequence metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameHeader {
    /// Protocol version
    pub version: u8,

    /// Link the frame was generated for
    pub link: LinkId,

    /// Monotonically increasing frame identifier
    pub frame_id: u64,

    /// Stream position of the first payload byte
    pub sequence_start: SequencePosition,

    /// Length of the payload in bytes
    pub payload_len: u32,
}

impl FrameHeader {
    /// Create a new frame header
    pub fn new(link: LinkId, frame_id: u64, sequence_start: SequencePosition, payload_len: u32) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            link,
            frame_id,
            sequence_start,
            payload_len,
        }
    }

    /// Stream position one past the last payload byte
    pub fn sequence_end(&self) -> SequencePosition {
        self.sequence_start.saturating_add(self.payload_len as u64)
    }
}

/// A frame owned by whichever pipeline stage is processing it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Frame header
    pub header: FrameHeader,

    /// PRBS payload
    pub payload: Bytes,
}

impl Frame {
    /// Create a new frame
    pub fn new(header: FrameHeader, payload: Bytes) -> Self {
        Self { header, payload }
    }

    /// Get frame ID
    pub fn frame_id(&self) -> u64 {
        self.header.frame_id
    }

    /// Get the stream position of the first payload byte
    pub fn sequence_start(&self) -> SequencePosition {
        self.header.sequence_start
    }

    /// Payload length as carried
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// True when the frame carries no payload
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}
