use anyhow::{Context, Result};
use prbslink_core::{constants::MAX_PAYLOAD_LIMIT, PrbsPolynomial, SequenceGenerator};
use std::fs;
use tracing::info;

/// Produce a PRBS window; hex-dump it, or write raw bytes to `output`
pub fn execute(
    seed: u64,
    position: u64,
    length: usize,
    polynomial: PrbsPolynomial,
    output: Option<&str>,
) -> Result<Vec<u8>> {
    let generator = SequenceGenerator::new(polynomial, seed, MAX_PAYLOAD_LIMIT)
        .context("Invalid generator parameters")?;
    let bytes = generator
        .generate(position, length)
        .with_context(|| format!("Cannot generate {} bytes", length))?;

    match output {
        Some(path) => {
            fs::write(path, &bytes)
                .with_context(|| format!("Failed to write output file: {}", path))?;
            info!("Wrote {} bytes of {:?} to {}", bytes.len(), polynomial, path);
        }
        None => {
            for (i, line) in bytes.chunks(16).enumerate() {
                println!("{:016x}  {}", position.wrapping_add((i * 16) as u64), hex::encode(line));
            }
        }
    }

    Ok(bytes)
}
