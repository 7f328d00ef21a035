//! Frame encoding

use crate::constants::{align_up, FRAME_MARKER, HEADER_CRC_COVERAGE, HEADER_SIZE, MAX_PAYLOAD_LIMIT};
use crate::error::ConfigError;
use crate::generator::SequenceGenerator;
use crate::types::{Frame, FrameHeader, LinkId, SequencePosition};
use bytes::{BufMut, Bytes, BytesMut};

/// Encode a frame into bytes
///
/// The frame is encoded with the following layout:
/// 1. Marker (4 bytes): "PRBS"
/// 2. Header:
///    - Version (1 byte)
///    - Transport tag (1 byte)
///    - Lane (1 byte)
///    - Reserved (1 byte, zero)
///    - Frame ID (8 bytes, big-endian)
///    - Sequence start (8 bytes, big-endian)
///    - Payload length (4 bytes, big-endian)
///    - CRC32C over everything above (4 bytes, big-endian)
/// 3. Payload (variable length)
/// 4. Zero padding up to `alignment`
pub fn encode_frame(header: &FrameHeader, payload: &[u8], alignment: usize) -> Result<Bytes, ConfigError> {
    if payload.len() != header.payload_len as usize {
        return Err(ConfigError::InvalidArgument(format!(
            "Payload length mismatch: header says {}, actual {}",
            header.payload_len,
            payload.len()
        )));
    }
    if payload.is_empty() || payload.len() > MAX_PAYLOAD_LIMIT {
        return Err(ConfigError::InvalidLength {
            length: payload.len(),
            max: MAX_PAYLOAD_LIMIT,
        });
    }

    Ok(write_frame(header, payload, alignment))
}

/// Serialize a header and payload whose lengths are already known to agree
fn write_frame(header: &FrameHeader, payload: &[u8], alignment: usize) -> Bytes {
    let body_len = align_up(payload.len(), alignment);
    let mut buf = BytesMut::with_capacity(HEADER_SIZE + body_len);

    buf.put_slice(FRAME_MARKER);
    buf.put_u8(header.version);
    buf.put_u8(header.link.transport.tag());
    buf.put_u8(header.link.lane);
    buf.put_u8(0);
    buf.put_u64(header.frame_id);
    buf.put_u64(header.sequence_start);
    buf.put_u32(header.payload_len);

    let crc = crc32c::crc32c(&buf[..HEADER_CRC_COVERAGE]);
    buf.put_u32(crc);

    buf.put_slice(payload);
    buf.put_bytes(0, body_len - payload.len());

    buf.freeze()
}

/// Encode a complete Frame struct
pub fn encode_frame_struct(frame: &Frame, alignment: usize) -> Result<Bytes, ConfigError> {
    encode_frame(&frame.header, &frame.payload, alignment)
}

/// Fill a frame described by `header` with its PRBS window
pub fn prbs_frame(generator: &SequenceGenerator, header: FrameHeader) -> Frame {
    let mut payload = BytesMut::zeroed(header.payload_len as usize);
    for (byte, value) in payload.iter_mut().zip(generator.stream(header.sequence_start)) {
        *byte = value;
    }
    Frame::new(header, payload.freeze())
}

/// Encode the PRBS frame described by `header` for its link's transport
pub fn encode_prbs_frame(generator: &SequenceGenerator, header: &FrameHeader) -> Bytes {
    let frame = prbs_frame(generator, *header);
    write_frame(&frame.header, &frame.payload, header.link.transport.alignment())
}

/// Produces the outgoing PRBS frame stream of one link
///
/// Frame ids increase by one per frame and every frame continues the
/// sequence exactly where the previous one ended.
#[derive(Debug, Clone)]
pub struct TxSequencer {
    link: LinkId,
    generator: SequenceGenerator,
    payload_len: usize,
    next_frame_id: u64,
    next_position: SequencePosition,
}

impl TxSequencer {
    /// Create a sequencer starting at frame 0, position 0
    pub fn new(link: LinkId, generator: SequenceGenerator, payload_len: usize) -> Result<Self, ConfigError> {
        if payload_len == 0 || payload_len > generator.max_len() {
            return Err(ConfigError::InvalidLength {
                length: payload_len,
                max: generator.max_len(),
            });
        }
        Ok(Self {
            link,
            generator,
            payload_len,
            next_frame_id: 0,
            next_position: 0,
        })
    }

    /// Id the next frame will carry
    pub fn next_frame_id(&self) -> u64 {
        self.next_frame_id
    }

    /// Position the next frame will start at
    pub fn next_position(&self) -> SequencePosition {
        self.next_position
    }

    /// Reserve the header of the next frame and advance
    pub fn claim(&mut self) -> FrameHeader {
        let header = FrameHeader::new(
            self.link,
            self.next_frame_id,
            self.next_position,
            self.payload_len as u32,
        );

        self.next_frame_id = self.next_frame_id.wrapping_add(1);
        self.next_position = self.next_position.saturating_add(self.payload_len as u64);

        header
    }

    /// Build the next frame struct and advance
    pub fn next_frame(&mut self) -> Frame {
        let header = self.claim();
        prbs_frame(&self.generator, header)
    }

    /// Build and encode the next frame for the link's transport
    pub fn next_encoded(&mut self) -> Bytes {
        let header = self.claim();
        encode_prbs_frame(&self.generator, &header)
    }

    /// Rewind to frame 0, position 0
    pub fn reset(&mut self) {
        self.next_frame_id = 0;
        self.next_position = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{TransportKind, PROTOCOL_VERSION};
    use crate::generator::PrbsPolynomial;

    fn generator() -> SequenceGenerator {
        SequenceGenerator::new(PrbsPolynomial::Prbs31, 0xACE1, 4096).unwrap()
    }

    #[test]
    fn test_encode_simple_frame() {
        let payload = b"0123456789";
        let header = FrameHeader::new(LinkId::ethernet(0), 1, 100, payload.len() as u32);

        let encoded = encode_frame(&header, payload, 1).unwrap();

        assert_eq!(&encoded[0..4], b"PRBS");
        assert_eq!(encoded[4], PROTOCOL_VERSION);
        assert_eq!(encoded[5], TransportKind::Ethernet.tag());
        assert_eq!(&encoded[8..16], &1u64.to_be_bytes());
        assert_eq!(&encoded[16..24], &100u64.to_be_bytes());
        assert_eq!(encoded.len(), HEADER_SIZE + payload.len());
    }

    #[test]
    fn test_encode_pads_to_alignment() {
        let payload = [0xAAu8; 13];
        let header = FrameHeader::new(LinkId::point_to_point(0), 7, 0, 13);

        let encoded = encode_frame(&header, &payload, 8).unwrap();

        assert_eq!(encoded.len(), HEADER_SIZE + 16);
        assert_eq!(&encoded[HEADER_SIZE + 13..], &[0, 0, 0]);
    }

    #[test]
    fn test_encode_rejects_length_mismatch() {
        let header = FrameHeader::new(LinkId::ethernet(0), 1, 0, 99);
        assert!(encode_frame(&header, b"short", 1).is_err());
    }

    #[test]
    fn test_encode_rejects_empty_payload() {
        let header = FrameHeader::new(LinkId::ethernet(0), 1, 0, 0);
        assert_eq!(
            encode_frame(&header, b"", 1),
            Err(ConfigError::InvalidLength {
                length: 0,
                max: MAX_PAYLOAD_LIMIT
            })
        );
    }

    #[test]
    fn test_sequencer_is_contiguous() {
        let mut tx = TxSequencer::new(LinkId::ethernet(0), generator(), 64).unwrap();

        let a = tx.next_frame();
        let b = tx.next_frame();

        assert_eq!(a.frame_id(), 0);
        assert_eq!(b.frame_id(), 1);
        assert_eq!(b.sequence_start(), a.header.sequence_end());
        assert_eq!(a.payload.as_ref(), generator().generate(0, 64).unwrap().as_slice());
        assert_eq!(b.payload.as_ref(), generator().generate(64, 64).unwrap().as_slice());
    }

    #[test]
    fn test_sequencer_reset() {
        let mut tx = TxSequencer::new(LinkId::ethernet(0), generator(), 16).unwrap();
        tx.next_frame();
        tx.next_frame();
        tx.reset();
        assert_eq!(tx.next_frame_id(), 0);
        assert_eq!(tx.next_position(), 0);
    }
}
