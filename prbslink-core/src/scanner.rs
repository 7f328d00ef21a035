//! Frame reassembly for byte-stream transports
//!
//! A byte-stream delivery may end mid-frame or carry several frames at
//! once. The reassembler buffers input, hunts for the frame marker and
//! emits one complete encoded frame at a time.

use crate::codec::FrameCodec;
use crate::constants::{FRAME_MARKER, HEADER_SIZE};
use crate::error::DecodeError;
use bytes::{Buf, Bytes, BytesMut};

#[cfg(feature = "logging")]
use tracing::{debug, warn};

/// Reassembly counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanStats {
    /// Total bytes pushed
    pub bytes_scanned: u64,

    /// Bytes dropped while hunting for a marker
    pub bytes_skipped: u64,

    /// Complete frames emitted
    pub frames_found: u64,

    /// Markers whose header failed validation
    pub header_failures: u64,
}

/// Incremental marker-hunting frame splitter with a bounded buffer
#[derive(Debug)]
pub struct StreamReassembler {
    codec: FrameCodec,
    buffer: BytesMut,
    capacity: usize,
    stats: ScanStats,
}

impl StreamReassembler {
    /// Create a reassembler that buffers at most two maximum-size frames
    pub fn new(codec: FrameCodec) -> Self {
        let capacity = codec.max_frame_len() * 2;
        Self {
            codec,
            buffer: BytesMut::with_capacity(capacity),
            capacity,
            stats: ScanStats::default(),
        }
    }

    /// Counters since creation or the last reset
    pub fn stats(&self) -> ScanStats {
        self.stats
    }

    /// Bytes currently buffered
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Drop buffered bytes and counters
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.stats = ScanStats::default();
    }

    /// Append a delivery and return every frame it completed
    ///
    /// Each returned slice holds exactly one encoded frame and can be
    /// passed straight to the decoder. Header failures are returned in
    /// the order they were met so the caller can account them.
    pub fn push(&mut self, data: &[u8]) -> Vec<Result<Bytes, DecodeError>> {
        self.stats.bytes_scanned = self.stats.bytes_scanned.saturating_add(data.len() as u64);
        self.buffer.extend_from_slice(data);

        let mut out = Vec::new();
        loop {
            if !self.align_to_marker() {
                break;
            }
            if self.buffer.len() < HEADER_SIZE {
                break;
            }

            match self.codec.peek(&self.buffer) {
                Ok((_, total)) => {
                    if self.buffer.len() < total {
                        break;
                    }
                    let frame = self.buffer.split_to(total).freeze();
                    self.stats.frames_found += 1;
                    out.push(Ok(frame));
                }
                Err(e) => {
                    #[cfg(feature = "logging")]
                    warn!("Discarding marker with invalid header: {}", e);

                    self.stats.header_failures += 1;
                    self.skip(FRAME_MARKER.len());
                    out.push(Err(e));
                }
            }
        }

        self.enforce_capacity();
        out
    }

    /// Drop bytes up to the next marker; false when more input is needed
    fn align_to_marker(&mut self) -> bool {
        match memchr::memmem::find(&self.buffer, FRAME_MARKER) {
            Some(0) => true,
            Some(pos) => {
                #[cfg(feature = "logging")]
                debug!("Skipping {} bytes before marker", pos);
                self.skip(pos);
                true
            }
            None => {
                // Keep a possible partial marker at the tail
                let keep = (FRAME_MARKER.len() - 1).min(self.buffer.len());
                let drop = self.buffer.len() - keep;
                self.skip(drop);
                false
            }
        }
    }

    fn skip(&mut self, n: usize) {
        self.buffer.advance(n);
        self.stats.bytes_skipped = self.stats.bytes_skipped.saturating_add(n as u64);
    }

    fn enforce_capacity(&mut self) {
        if self.buffer.len() > self.capacity {
            let excess = self.buffer.len() - self.capacity;
            self.skip(excess);
        }
    }
}
