//! Frame decoding (strict mode)

use crate::constants::{
    align_up, TransportKind, FRAME_MARKER, HEADER_CRC_COVERAGE, HEADER_SIZE, PROTOCOL_VERSION,
};
use crate::error::DecodeError;
use crate::types::{Frame, FrameHeader, LinkId};
use bytes::Bytes;

/// Parse and validate a header, returning it with the total encoded frame size
///
/// Checks, in order: enough bytes for a header, marker, version, header
/// checksum, transport tag, then the declared payload length (non-zero and
/// at most `max_payload_len`). Nothing is allocated from the declared length.
pub fn decode_header(data: &[u8], max_payload_len: usize) -> Result<(FrameHeader, usize), DecodeError> {
    if data.len() < HEADER_SIZE {
        return Err(DecodeError::TruncatedHeader {
            expected: HEADER_SIZE,
            actual: data.len(),
        });
    }

    if &data[0..4] != FRAME_MARKER {
        let mut bad = [0u8; 4];
        bad.copy_from_slice(&data[0..4]);
        return Err(DecodeError::BadMarker(bad));
    }

    let version = data[4];
    if version != PROTOCOL_VERSION {
        return Err(DecodeError::UnsupportedVersion(version));
    }

    let expected_crc = read_u32(&data[28..32]);
    let actual_crc = crc32c::crc32c(&data[..HEADER_CRC_COVERAGE]);
    if expected_crc != actual_crc {
        return Err(DecodeError::HeaderChecksum {
            expected: expected_crc,
            actual: actual_crc,
        });
    }

    let transport = TransportKind::from_tag(data[5]).ok_or(DecodeError::UnknownTransport(data[5]))?;
    let lane = data[6];
    let frame_id = read_u64(&data[8..16]);
    let sequence_start = read_u64(&data[16..24]);
    let payload_len = read_u32(&data[24..28]);

    // Clamp before the length is used for anything
    if payload_len == 0 {
        return Err(DecodeError::EmptyPayload);
    }
    if payload_len as usize > max_payload_len {
        return Err(DecodeError::PayloadTooLarge {
            declared: payload_len as usize,
            max: max_payload_len,
        });
    }

    let header = FrameHeader {
        version,
        link: LinkId::new(transport, lane),
        frame_id,
        sequence_start,
        payload_len,
    };
    let total = HEADER_SIZE + align_up(payload_len as usize, transport.alignment());

    Ok((header, total))
}

/// Decode a frame from a byte buffer without copying the payload
///
/// The input must contain exactly one complete frame (header, payload and
/// alignment padding), and the padding must be zero. The returned `Frame`
/// slices its payload from `buf`.
pub fn decode_frame(buf: Bytes, max_payload_len: usize) -> Result<Frame, DecodeError> {
    let (header, total) = decode_header(&buf, max_payload_len)?;

    if buf.len() != total {
        return Err(DecodeError::LengthMismatch {
            declared: total - HEADER_SIZE,
            observed: buf.len() - HEADER_SIZE,
        });
    }

    let payload_end = HEADER_SIZE + header.payload_len as usize;
    let bits: u32 = buf[payload_end..].iter().map(|b| b.count_ones()).sum();
    if bits != 0 {
        return Err(DecodeError::NonZeroPadding { bits });
    }
    let payload = buf.slice(HEADER_SIZE..payload_end);

    Ok(Frame::new(header, payload))
}

/// Decode a frame from a byte slice, copying it into an owned buffer
pub fn decode_frame_from_bytes(data: &[u8], max_payload_len: usize) -> Result<Frame, DecodeError> {
    // Validate the header on the borrowed slice first so garbage is never copied
    decode_header(data, max_payload_len)?;
    decode_frame(Bytes::copy_from_slice(data), max_payload_len)
}

fn read_u32(b: &[u8]) -> u32 {
    u32::from_be_bytes([b[0], b[1], b[2], b[3]])
}

fn read_u64(b: &[u8]) -> u64 {
    u64::from_be_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]])
}
