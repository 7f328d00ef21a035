//! Property-based tests using proptest

use bytes::Bytes;
use prbslink_core::{
    codec::FrameCodec,
    decoder::decode_frame_from_bytes,
    generator::{PrbsPolynomial, SequenceGenerator},
    scanner::StreamReassembler,
    Frame, FrameHeader, LinkId, LinkMonitor, MonitorConfig, PayloadValidator, TransportKind,
    ValidationResult,
};
use proptest::prelude::*;

fn polynomial() -> impl Strategy<Value = PrbsPolynomial> {
    prop_oneof![
        Just(PrbsPolynomial::Prbs7),
        Just(PrbsPolynomial::Prbs15),
        Just(PrbsPolynomial::Prbs23),
        Just(PrbsPolynomial::Prbs31),
    ]
}

fn transport() -> impl Strategy<Value = TransportKind> {
    prop_oneof![Just(TransportKind::Ethernet), Just(TransportKind::PointToPoint)]
}

proptest! {
    #[test]
    fn prop_round_trip_encode_decode(
        transport in transport(),
        lane in any::<u8>(),
        frame_id in any::<u64>(),
        sequence_start in any::<u64>(),
        payload in prop::collection::vec(any::<u8>(), 1..1024),
    ) {
        let codec = FrameCodec::new(1024).unwrap();
        let header = FrameHeader::new(LinkId::new(transport, lane), frame_id, sequence_start, payload.len() as u32);
        let frame = Frame::new(header, Bytes::from(payload));

        let encoded = codec.encode(&frame).unwrap();
        prop_assert_eq!(encoded.len(), FrameCodec::encoded_len(frame.len(), transport));
        prop_assert_eq!(encoded.len() % transport.alignment(), 0);

        let decoded = codec.decode(encoded).unwrap();
        prop_assert_eq!(decoded, frame);
    }

    #[test]
    fn prop_windows_compose(
        poly in polynomial(),
        seed in 1u64..u64::MAX,
        position in any::<u64>().prop_map(|p| p % (u64::MAX - 4096)),
        len in 2usize..512,
        split in 1usize..511,
    ) {
        prop_assume!(poly.seed_state(seed).is_ok());
        let split = split.min(len - 1);
        let generator = SequenceGenerator::new(poly, seed, 4096).unwrap();

        let whole = generator.generate(position, len).unwrap();
        let head = generator.generate(position, split).unwrap();
        let tail = generator.generate(position + split as u64, len - split).unwrap();

        prop_assert_eq!(&whole[..split], &head[..]);
        prop_assert_eq!(&whole[split..], &tail[..]);
    }

    #[test]
    fn prop_generate_is_deterministic(
        seed in 1u64..u64::MAX,
        position in any::<u64>(),
        len in 1usize..256,
    ) {
        let a = SequenceGenerator::new(PrbsPolynomial::Prbs31, seed | 1, 1024).unwrap();
        let b = SequenceGenerator::new(PrbsPolynomial::Prbs31, seed | 1, 1024).unwrap();
        prop_assert_eq!(a.generate(position, len).unwrap(), b.generate(position, len).unwrap());
    }

    #[test]
    fn prop_single_flip_is_located(
        start in 0u64..1_000_000,
        len in 1usize..512,
        offset in 0usize..512,
        bit in 0u8..8,
    ) {
        let offset = offset % len;
        let generator = SequenceGenerator::new(PrbsPolynomial::Prbs31, 0xBEEF, 1024).unwrap();
        let mut payload = generator.generate(start, len).unwrap();
        payload[offset] ^= 1 << bit;

        let header = FrameHeader::new(LinkId::ethernet(0), 0, start, len as u32);
        let frame = Frame::new(header, Bytes::from(payload));
        let result = PayloadValidator::new(generator, 8).validate(&frame);

        match result {
            ValidationResult::BitErrors(report) => {
                prop_assert_eq!(report.bit_errors, 1);
                prop_assert_eq!(report.word_errors, 1);
                prop_assert_eq!(report.mismatches.len(), 1);
                prop_assert_eq!(report.mismatches[0].offset, offset);
            }
            other => prop_assert!(false, "expected bit errors, got {:?}", other),
        }
    }

    #[test]
    fn prop_decode_never_panics(
        data in prop::collection::vec(any::<u8>(), 0..4096)
    ) {
        // Should never panic, even on random data
        let _ = decode_frame_from_bytes(&data, 1024);
    }

    #[test]
    fn prop_reassembly_is_chunking_independent(
        frames in 1usize..20,
        chunk in 1usize..200,
    ) {
        let config = MonitorConfig { payload_len: 37, max_payload_len: 256, ..Default::default() };
        let mut tx = LinkMonitor::new(LinkId::point_to_point(0), &config).unwrap();
        let stream: Vec<u8> = (0..frames).flat_map(|_| tx.next_tx_frame().to_vec()).collect();

        let mut reassembler = StreamReassembler::new(FrameCodec::new(256).unwrap());
        let mut found = 0;
        for piece in stream.chunks(chunk) {
            for frame in reassembler.push(piece) {
                prop_assert!(frame.is_ok());
                found += 1;
            }
        }
        prop_assert_eq!(found, frames);
    }

    #[test]
    fn prop_random_deliveries_never_panic(
        deliveries in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..128), 0..32)
    ) {
        let config = MonitorConfig { payload_len: 32, max_payload_len: 128, ..Default::default() };
        let mut monitor = LinkMonitor::new(LinkId::ethernet(0), &config).unwrap();
        let count = deliveries.len() as u64;
        for d in deliveries {
            monitor.submit_rx(Bytes::from(d));
        }
        let counters = monitor.snapshot().counters;
        prop_assert_eq!(counters.frames_received + counters.malformed_frames, count);
    }

    #[test]
    fn prop_losses_match_drops(
        drop_mask in prop::collection::vec(any::<bool>(), 1..64)
    ) {
        // Drops are isolated so each gap is charged exactly one frame
        let config = MonitorConfig { payload_len: 16, max_payload_len: 64, gap_threshold: 64, ..Default::default() };
        let mut monitor = LinkMonitor::new(LinkId::ethernet(0), &config).unwrap();
        let mut dropped = 0u64;
        let mut last_kept = true;

        let first = monitor.next_tx_frame();
        monitor.submit_rx(first);
        for skip in drop_mask {
            let frame = monitor.next_tx_frame();
            if skip && last_kept {
                dropped += 1;
                last_kept = false;
                continue;
            }
            last_kept = true;
            monitor.submit_rx(frame);
        }
        let last = monitor.next_tx_frame();
        monitor.submit_rx(last);

        let counters = monitor.snapshot().counters;
        prop_assert_eq!(counters.frames_lost, dropped);
        prop_assert_eq!(counters.sequence_units_lost, dropped * 16);
        prop_assert_eq!(counters.bytes_validated, counters.frames_received * 16);
    }
}
