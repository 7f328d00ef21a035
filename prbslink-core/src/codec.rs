//! Transport-agnostic frame codec
//!
//! Both transports share this codec; they differ only in the alignment
//! carried by [`TransportKind`].

use crate::constants::{align_up, TransportKind, HEADER_SIZE, MAX_PAYLOAD_LIMIT};
use crate::decoder::{decode_frame, decode_header};
use crate::encoder::encode_frame_struct;
use crate::error::{ConfigError, DecodeError};
use crate::types::{Frame, FrameHeader};
use bytes::Bytes;

/// Encoder/decoder pair bound to a payload ceiling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameCodec {
    max_payload_len: usize,
}

impl FrameCodec {
    /// Create a codec accepting payloads up to `max_payload_len` bytes
    pub fn new(max_payload_len: usize) -> Result<Self, ConfigError> {
        if max_payload_len == 0 || max_payload_len > MAX_PAYLOAD_LIMIT {
            return Err(ConfigError::InvalidLength {
                length: max_payload_len,
                max: MAX_PAYLOAD_LIMIT,
            });
        }
        Ok(Self { max_payload_len })
    }

    /// Largest payload accepted on decode
    pub fn max_payload_len(&self) -> usize {
        self.max_payload_len
    }

    /// Largest encoded frame this codec will accept
    pub fn max_frame_len(&self) -> usize {
        HEADER_SIZE + align_up(self.max_payload_len, 8)
    }

    /// Encoded size of a frame with `payload_len` bytes on `transport`
    pub fn encoded_len(payload_len: usize, transport: TransportKind) -> usize {
        HEADER_SIZE + align_up(payload_len, transport.alignment())
    }

    /// Encode a frame for its own link's transport
    pub fn encode(&self, frame: &Frame) -> Result<Bytes, ConfigError> {
        if frame.payload.len() > self.max_payload_len {
            return Err(ConfigError::InvalidLength {
                length: frame.payload.len(),
                max: self.max_payload_len,
            });
        }
        encode_frame_struct(frame, frame.header.link.transport.alignment())
    }

    /// Decode exactly one frame
    pub fn decode(&self, buf: Bytes) -> Result<Frame, DecodeError> {
        decode_frame(buf, self.max_payload_len)
    }

    /// Validate a header and report the full encoded size it declares
    pub fn peek(&self, data: &[u8]) -> Result<(FrameHeader, usize), DecodeError> {
        decode_header(data, self.max_payload_len)
    }
}
