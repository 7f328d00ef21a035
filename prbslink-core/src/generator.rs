//! Pseudo-random byte sequence generation
//!
//! The stream is the output of a Galois LFSR over GF(2) with one of the
//! ITU-T O.150 primitive polynomials. Byte `p` of the stream holds output
//! bits `8p..8p+7`, most significant bit first.
//!
//! A Galois register after `n` steps equals `seed · x^n mod P(x)`, so any
//! window can be produced by jumping the register with a modular power
//! (O(log n)) and then stepping only across the window itself.

use crate::constants::MAX_PAYLOAD_LIMIT;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// Primitive polynomial selecting the PRBS pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrbsPolynomial {
    /// x^7 + x^6 + 1
    Prbs7,
    /// x^15 + x^14 + 1
    Prbs15,
    /// x^23 + x^18 + 1
    Prbs23,
    /// x^31 + x^28 + 1
    #[default]
    Prbs31,
}

impl PrbsPolynomial {
    /// Register length in bits
    pub const fn degree(&self) -> u32 {
        match self {
            PrbsPolynomial::Prbs7 => 7,
            PrbsPolynomial::Prbs15 => 15,
            PrbsPolynomial::Prbs23 => 23,
            PrbsPolynomial::Prbs31 => 31,
        }
    }

    /// Full polynomial including the x^degree term
    const fn full(&self) -> u32 {
        match self {
            PrbsPolynomial::Prbs7 => (1 << 7) | (1 << 6) | 1,
            PrbsPolynomial::Prbs15 => (1 << 15) | (1 << 14) | 1,
            PrbsPolynomial::Prbs23 => (1 << 23) | (1 << 18) | 1,
            PrbsPolynomial::Prbs31 => (1 << 31) | (1 << 28) | 1,
        }
    }

    /// Register mask
    pub const fn mask(&self) -> u32 {
        ((1u64 << self.degree()) - 1) as u32
    }

    /// Sequence period in bits
    pub const fn period(&self) -> u64 {
        (1u64 << self.degree()) - 1
    }

    /// Multiply a register by x modulo the polynomial
    #[inline]
    const fn times_x(&self, state: u32) -> u32 {
        let shifted = (state as u64) << 1;
        if shifted & (1u64 << self.degree()) != 0 {
            (shifted ^ self.full() as u64) as u32
        } else {
            shifted as u32
        }
    }

    /// Multiply two registers modulo the polynomial
    fn mul_mod(&self, a: u32, b: u32) -> u32 {
        let mut acc = 0u32;
        for bit in (0..self.degree()).rev() {
            acc = self.times_x(acc);
            if (b >> bit) & 1 == 1 {
                acc ^= a;
            }
        }
        acc
    }

    /// Compute x^n modulo the polynomial
    fn pow_x(&self, mut n: u64) -> u32 {
        let mut result = 1u32;
        let mut base = self.times_x(1);
        while n > 0 {
            if n & 1 == 1 {
                result = self.mul_mod(result, base);
            }
            base = self.mul_mod(base, base);
            n >>= 1;
        }
        result
    }

    /// Reduce a seed to a register value, rejecting the locked all-zero state
    pub fn seed_state(&self, seed: u64) -> Result<u32, ConfigError> {
        let state = (seed & self.mask() as u64) as u32;
        if state == 0 {
            return Err(ConfigError::ZeroSeed(seed));
        }
        Ok(state)
    }
}

/// Deterministic, randomly addressable PRBS generator
///
/// Holds only the seed register; every call is a pure function of
/// `(seed, position, length)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceGenerator {
    polynomial: PrbsPolynomial,
    seed: u64,
    seed_state: u32,
    max_len: usize,
}

impl SequenceGenerator {
    /// Create a generator; fails on a seed that locks the register or a zero maximum
    pub fn new(polynomial: PrbsPolynomial, seed: u64, max_len: usize) -> Result<Self, ConfigError> {
        if max_len == 0 || max_len > MAX_PAYLOAD_LIMIT {
            return Err(ConfigError::InvalidLength {
                length: max_len,
                max: MAX_PAYLOAD_LIMIT,
            });
        }
        let seed_state = polynomial.seed_state(seed)?;
        Ok(Self {
            polynomial,
            seed,
            seed_state,
            max_len,
        })
    }

    /// The polynomial in use
    pub fn polynomial(&self) -> PrbsPolynomial {
        self.polynomial
    }

    /// The seed this generator was built from
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Largest window a single call may produce
    pub fn max_len(&self) -> usize {
        self.max_len
    }

    /// Register state at the first bit of byte `position`
    pub fn state_at(&self, position: u64) -> u32 {
        let period = self.polynomial.period();
        // x has order `period`, so the exponent can be reduced before the 8x scale
        let steps = ((position % period) * 8) % period;
        self.polynomial
            .mul_mod(self.seed_state, self.polynomial.pow_x(steps))
    }

    /// Generate `length` bytes starting at byte `position`
    pub fn generate(&self, position: u64, length: usize) -> Result<Vec<u8>, ConfigError> {
        self.check_len(length)?;
        let mut out = vec![0u8; length];
        self.fill_unchecked(position, &mut out);
        Ok(out)
    }

    /// Fill `out` with the window starting at byte `position`
    pub fn fill(&self, position: u64, out: &mut [u8]) -> Result<(), ConfigError> {
        self.check_len(out.len())?;
        self.fill_unchecked(position, out);
        Ok(())
    }

    /// Unbounded byte iterator starting at `position`
    pub fn stream(&self, position: u64) -> PrbsStream {
        PrbsStream {
            polynomial: self.polynomial,
            state: self.state_at(position),
        }
    }

    fn check_len(&self, length: usize) -> Result<(), ConfigError> {
        if length == 0 || length > self.max_len {
            return Err(ConfigError::InvalidLength {
                length,
                max: self.max_len,
            });
        }
        Ok(())
    }

    fn fill_unchecked(&self, position: u64, out: &mut [u8]) {
        let mut stream = self.stream(position);
        for byte in out.iter_mut() {
            *byte = stream.next_byte();
        }
    }
}

/// Streaming view over the PRBS bytes
#[derive(Debug, Clone)]
pub struct PrbsStream {
    polynomial: PrbsPolynomial,
    state: u32,
}

impl PrbsStream {
    /// Produce the next byte, MSB first
    #[inline]
    pub fn next_byte(&mut self) -> u8 {
        let top = self.polynomial.degree() - 1;
        let mut byte = 0u8;
        for _ in 0..8 {
            byte = (byte << 1) | ((self.state >> top) & 1) as u8;
            self.state = self.polynomial.times_x(self.state);
        }
        byte
    }
}

impl Iterator for PrbsStream {
    type Item = u8;

    fn next(&mut self) -> Option<u8> {
        Some(self.next_byte())
    }
}

/// Generate a PRBS-31 window bounded by [`MAX_PAYLOAD_LIMIT`]
pub fn generate(seed: u64, position: u64, length: usize) -> Result<Vec<u8>, ConfigError> {
    SequenceGenerator::new(PrbsPolynomial::Prbs31, seed, MAX_PAYLOAD_LIMIT)?.generate(position, length)
}
