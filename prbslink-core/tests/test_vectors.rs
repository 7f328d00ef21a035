//! Known-answer vectors for the PRBS patterns and the frame header layout
//!
//! Any change here breaks interoperability with captures and with
//! checkers built from earlier releases.

use prbslink_core::{
    constants::DEFAULT_SEED,
    encoder::encode_frame,
    generator::{self, PrbsPolynomial, SequenceGenerator},
    types::{FrameHeader, LinkId},
};

fn window(polynomial: PrbsPolynomial, seed: u64, position: u64, len: usize) -> String {
    let generator = SequenceGenerator::new(polynomial, seed, 4096).unwrap();
    hex::encode(generator.generate(position, len).unwrap())
}

#[test]
fn test_prbs7_seed_one() {
    assert_eq!(window(PrbsPolynomial::Prbs7, 1, 0, 8), "03faa6774b1bdad9");
    // 127 bytes is a whole number of 127-bit periods
    assert_eq!(window(PrbsPolynomial::Prbs7, 1, 127, 8), "03faa6774b1bdad9");
}

#[test]
fn test_prbs15_and_prbs23() {
    assert_eq!(window(PrbsPolynomial::Prbs15, 0xACE1, 0, 8), "6e8369fb62a48671");
    assert_eq!(window(PrbsPolynomial::Prbs23, 0xACE1, 0, 8), "015358c482a4ac66");
}

#[test]
fn test_prbs31_default_seed() {
    assert_eq!(
        window(PrbsPolynomial::Prbs31, DEFAULT_SEED, 0, 16),
        "53b4d280b14197feb403471ebff9b91e"
    );
    assert_eq!(window(PrbsPolynomial::Prbs31, DEFAULT_SEED, 1000, 8), "7ea4ef263a08c69f");
}

#[test]
fn test_free_function_is_prbs31() {
    let bytes = generator::generate(DEFAULT_SEED, 1000, 8).unwrap();
    assert_eq!(hex::encode(bytes), "7ea4ef263a08c69f");
}

#[test]
fn test_ethernet_frame_layout() {
    let header = FrameHeader::new(LinkId::ethernet(0), 7, 7000, 8);
    let payload = generator::generate(DEFAULT_SEED, 7000, 8).unwrap();
    let encoded = encode_frame(&header, &payload, 1).unwrap();

    assert_eq!(
        hex::encode(&encoded[..32]),
        "505242530100000000000000000000070000000000001b58000000080c879b3f"
    );
    assert_eq!(hex::encode(&encoded[32..]), "98f32fa581dde32e");
}

#[test]
fn test_point_to_point_frame_padding() {
    let header = FrameHeader::new(LinkId::point_to_point(2), 1, 5, 5);
    let payload = generator::generate(DEFAULT_SEED, 5, 5).unwrap();
    let encoded = encode_frame(&header, &payload, 8).unwrap();

    assert_eq!(encoded.len(), 32 + 8);
    assert_eq!(encoded[5], 1, "transport tag");
    assert_eq!(encoded[6], 2, "lane");
    assert_eq!(&encoded[37..], &[0, 0, 0]);
}
