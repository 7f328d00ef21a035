use std::fs;
use tempfile::tempdir;

use prbslink_cli::commands::generate;
use prbslink_core::{PrbsPolynomial, SequenceGenerator};

#[test]
fn test_generate_writes_raw_bytes() {
    let dir = tempdir().unwrap();
    let out = dir.path().join("window.bin");

    let bytes = generate::execute(42, 1000, 256, PrbsPolynomial::Prbs23, Some(out.to_str().unwrap())).unwrap();

    let written = fs::read(&out).unwrap();
    assert_eq!(written, bytes);
    let expected = SequenceGenerator::new(PrbsPolynomial::Prbs23, 42, 256)
        .unwrap()
        .generate(1000, 256)
        .unwrap();
    assert_eq!(written, expected);
}

#[test]
fn test_generate_hex_dump() {
    let bytes = generate::execute(1, 0, 8, PrbsPolynomial::Prbs7, None).unwrap();
    assert_eq!(hex::encode(bytes), "03faa6774b1bdad9");
}

#[test]
fn test_generate_rejects_zero_seed() {
    let err = generate::execute(0, 0, 16, PrbsPolynomial::Prbs31, None).unwrap_err();
    assert!(err.to_string().contains("Invalid generator parameters"));
}

#[test]
fn test_generate_rejects_zero_length() {
    assert!(generate::execute(7, 0, 0, PrbsPolynomial::Prbs31, None).is_err());
}
