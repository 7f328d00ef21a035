//! Constants and limits for the prbslink frame format

use serde::{Deserialize, Serialize};

/// Frame marker - 4 bytes for synchronization
pub const FRAME_MARKER: &[u8; 4] = b"PRBS";

/// Current protocol version
pub const PROTOCOL_VERSION: u8 = 1;

/// Fixed header size:
/// 4 (marker) + 1 (version) + 1 (transport) + 1 (lane) + 1 (reserved)
/// + 8 (frame_id) + 8 (sequence_start) + 4 (payload_len) + 4 (header crc) = 32 bytes
pub const HEADER_SIZE: usize = 32;

/// Number of header bytes covered by the header CRC32C
pub const HEADER_CRC_COVERAGE: usize = HEADER_SIZE - 4;

/// Hard ceiling on any configured payload length (1 MiB)
pub const MAX_PAYLOAD_LIMIT: usize = 1024 * 1024;

/// Default payload length of generated frames
pub const DEFAULT_PAYLOAD_LEN: usize = 1024;

/// Default maximum accepted payload length
pub const DEFAULT_MAX_PAYLOAD_LEN: usize = 8192;

/// Default number of consecutive gaps tolerated before resynchronizing
pub const DEFAULT_GAP_THRESHOLD: u32 = 4;

/// Default number of resynchronization attempts before declaring a fault
pub const DEFAULT_RESYNC_ATTEMPT_LIMIT: u32 = 16;

/// Default cap on byte mismatches listed in a single validation report
pub const DEFAULT_BIT_ERROR_REPORT_CAP: usize = 64;

/// Default PRBS seed
pub const DEFAULT_SEED: u64 = 0xACE1_2468;

/// Width of the checker word used for word-error accounting
pub const CHECK_WORD_BYTES: usize = 4;

/// Transport encapsulation a link runs over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    /// Reliable UDP-like transport over Gigabit Ethernet
    Ethernet,
    /// Dedicated point-to-point link protocol
    PointToPoint,
}

impl TransportKind {
    /// Wire tag carried in the frame header
    pub const fn tag(&self) -> u8 {
        match self {
            TransportKind::Ethernet => 0,
            TransportKind::PointToPoint => 1,
        }
    }

    /// Parse a wire tag
    pub const fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(TransportKind::Ethernet),
            1 => Some(TransportKind::PointToPoint),
            _ => None,
        }
    }

    /// Frame alignment required by the transport, in bytes
    ///
    /// The point-to-point protocol moves 64-bit words, so frames are
    /// zero-padded to a multiple of 8.
    pub const fn alignment(&self) -> usize {
        match self {
            TransportKind::Ethernet => 1,
            TransportKind::PointToPoint => 8,
        }
    }

    /// Short name used in logs and link ids
    pub const fn short_name(&self) -> &'static str {
        match self {
            TransportKind::Ethernet => "eth",
            TransportKind::PointToPoint => "p2p",
        }
    }
}

/// Round `len` up to a multiple of `alignment`
pub const fn align_up(len: usize, alignment: usize) -> usize {
    if alignment <= 1 {
        len
    } else {
        len.div_ceil(alignment) * alignment
    }
}
