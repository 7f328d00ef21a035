//! Fuzzing entry points for prbslink-core
//!
//! To use with cargo-fuzz:
//! 1. Install cargo-fuzz: cargo install cargo-fuzz
//! 2. Run fuzzer: cargo fuzz run fuzz_submit_rx

use bytes::Bytes;
use prbslink_core::{
    codec::FrameCodec, decoder::decode_frame_from_bytes, scanner::StreamReassembler, DecodeError, LinkId,
    LinkMonitor, MonitorConfig,
};

/// Largest payload the fuzz targets accept
const FUZZ_MAX_PAYLOAD: usize = 4096;

pub fn fuzz_decode(data: &[u8]) {
    // Try to decode - should never panic
    let _ = decode_frame_from_bytes(data, FUZZ_MAX_PAYLOAD);
}

pub fn fuzz_reassemble(data: &[u8]) {
    let Ok(codec) = FrameCodec::new(FUZZ_MAX_PAYLOAD) else {
        return;
    };
    let mut reassembler = StreamReassembler::new(codec);

    // First byte picks the chunk size so split points are explored too
    let chunk = data.first().map_or(1, |b| *b as usize + 1);
    for piece in data.chunks(chunk) {
        for frame in reassembler.push(piece).into_iter().flatten() {
            // Headers were checked during reassembly; only the padding is left to fail
            match decode_frame_from_bytes(&frame, FUZZ_MAX_PAYLOAD) {
                Ok(_) | Err(DecodeError::NonZeroPadding { .. }) => {}
                Err(e) => panic!("reassembled frame failed to decode: {e}"),
            }
        }
    }
}

pub fn fuzz_submit_rx(data: &[u8]) {
    let config = MonitorConfig {
        payload_len: 64,
        max_payload_len: FUZZ_MAX_PAYLOAD,
        gap_threshold: 1,
        resync_attempt_limit: 2,
        ..Default::default()
    };
    let Ok(mut monitor) = LinkMonitor::new(LinkId::ethernet(0), &config) else {
        return;
    };

    // Interleave real frames with fuzz input so every tracker state is reachable
    for piece in data.chunks(96) {
        let frame = monitor.next_tx_frame();
        monitor.submit_rx(frame);
        monitor.submit_rx(Bytes::copy_from_slice(piece));
        monitor.submit_rx_stream(piece);
    }

    let c = monitor.snapshot().counters;
    assert_eq!(c.frames_ok + c.frames_with_errors + c.length_mismatches, c.frames_received);
}
