//! Simulated impaired loopback used by the soak command
//!
//! Stands in for real hardware. Impairments apply to whole frames at
//! configurable rates.

use bytes::Bytes;
use prbslink_core::{constants::HEADER_SIZE, Transport, TransportError};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Per-frame impairment probabilities
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Impairments {
    /// Probability a frame is silently dropped
    pub drop_rate: f64,
    /// Probability a frame has one payload bit flipped
    pub flip_rate: f64,
    /// Probability a frame is held back and delivered after its successor
    pub reorder_rate: f64,
    /// After this many frames the link dies: every other frame is lost and
    /// the rest arrive with inverted payloads
    pub fail_after: Option<u64>,
}

impl Impairments {
    /// Reject probabilities outside `[0, 1]`
    pub fn validate(&self) -> anyhow::Result<()> {
        for (name, rate) in [
            ("drop-rate", self.drop_rate),
            ("flip-rate", self.flip_rate),
            ("reorder-rate", self.reorder_rate),
        ] {
            if !(0.0..=1.0).contains(&rate) {
                anyhow::bail!("{} must be between 0 and 1, got {}", name, rate);
            }
        }
        Ok(())
    }
}

/// Counts of what the loopback did to the traffic
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImpairmentStats {
    /// Frames dropped
    pub dropped: u64,
    /// Frames with a flipped bit
    pub flipped: u64,
    /// Frames delivered out of order
    pub reordered: u64,
    /// Frames delivered with an inverted payload after the link died
    pub inverted: u64,
}

/// Transport that loops frames back through a lossy channel
#[derive(Debug)]
pub struct ImpairedLoopback {
    impairments: Impairments,
    rng: StdRng,
    delivered: VecDeque<Bytes>,
    held: Option<Bytes>,
    sent: u64,
    stats: ImpairmentStats,
}

impl ImpairedLoopback {
    /// Deterministic loopback for a given `seed`
    pub fn new(impairments: Impairments, seed: u64) -> Self {
        Self {
            impairments,
            rng: StdRng::seed_from_u64(seed),
            delivered: VecDeque::new(),
            held: None,
            sent: 0,
            stats: ImpairmentStats::default(),
        }
    }

    /// What was done to the traffic so far
    pub fn stats(&self) -> ImpairmentStats {
        self.stats
    }

    /// Take every frame that reached the far end, in arrival order
    pub fn drain(&mut self) -> Vec<Bytes> {
        self.delivered.drain(..).collect()
    }

    /// Release a held-back frame, if any
    pub fn flush(&mut self) {
        if let Some(frame) = self.held.take() {
            self.delivered.push_back(frame);
        }
    }

    fn flip_payload_bit(&mut self, frame: Bytes) -> Bytes {
        let payload_len = payload_len(&frame);
        if payload_len == 0 {
            return frame;
        }
        let mut raw = frame.to_vec();
        let offset = HEADER_SIZE + self.rng.gen_range(0..payload_len);
        raw[offset] ^= 1 << self.rng.gen_range(0..8u8);
        self.stats.flipped += 1;
        Bytes::from(raw)
    }

    fn invert_payload(&mut self, frame: Bytes) -> Bytes {
        let end = HEADER_SIZE + payload_len(&frame);
        let mut raw = frame.to_vec();
        for byte in &mut raw[HEADER_SIZE.min(end)..end] {
            *byte = !*byte;
        }
        self.stats.inverted += 1;
        Bytes::from(raw)
    }
}

impl Transport for ImpairedLoopback {
    fn send(&mut self, frame: Bytes) -> Result<(), TransportError> {
        self.sent += 1;
        let frame = match self.impairments.fail_after {
            Some(limit) if self.sent > limit => {
                if (self.sent - limit) % 2 == 0 {
                    self.stats.dropped += 1;
                    return Ok(());
                }
                self.invert_payload(frame)
            }
            _ => frame,
        };

        if self.rng.gen_bool(self.impairments.drop_rate) {
            self.stats.dropped += 1;
            return Ok(());
        }

        let frame = if self.rng.gen_bool(self.impairments.flip_rate) {
            self.flip_payload_bit(frame)
        } else {
            frame
        };

        if let Some(held) = self.held.take() {
            self.delivered.push_back(frame);
            self.delivered.push_back(held);
        } else if self.rng.gen_bool(self.impairments.reorder_rate) {
            self.stats.reordered += 1;
            self.held = Some(frame);
        } else {
            self.delivered.push_back(frame);
        }
        Ok(())
    }
}

/// Payload length declared in an encoded frame, bounded by its actual size
fn payload_len(frame: &[u8]) -> usize {
    if frame.len() < HEADER_SIZE {
        return 0;
    }
    let declared = u32::from_be_bytes([frame[24], frame[25], frame[26], frame[27]]) as usize;
    declared.min(frame.len() - HEADER_SIZE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use prbslink_core::{LinkId, LinkMonitor, MonitorConfig};

    fn frames(n: usize) -> Vec<Bytes> {
        let config = MonitorConfig {
            payload_len: 64,
            ..Default::default()
        };
        let mut monitor = LinkMonitor::new(LinkId::ethernet(0), &config).unwrap();
        (0..n).map(|_| monitor.next_tx_frame()).collect()
    }

    #[test]
    fn test_clean_loopback_is_transparent() {
        let mut lb = ImpairedLoopback::new(Impairments::default(), 1);
        let sent = frames(10);
        for f in &sent {
            lb.send(f.clone()).unwrap();
        }
        assert_eq!(lb.drain(), sent);
        assert_eq!(lb.stats(), ImpairmentStats::default());
    }

    #[test]
    fn test_drop_everything() {
        let impairments = Impairments {
            drop_rate: 1.0,
            ..Default::default()
        };
        let mut lb = ImpairedLoopback::new(impairments, 1);
        for f in frames(5) {
            lb.send(f).unwrap();
        }
        assert!(lb.drain().is_empty());
        assert_eq!(lb.stats().dropped, 5);
    }

    #[test]
    fn test_flip_touches_one_payload_bit() {
        let impairments = Impairments {
            flip_rate: 1.0,
            ..Default::default()
        };
        let mut lb = ImpairedLoopback::new(impairments, 7);
        let sent = frames(1);
        lb.send(sent[0].clone()).unwrap();
        let got = lb.drain();

        let flipped: u32 = sent[0]
            .iter()
            .zip(got[0].iter())
            .map(|(a, b)| (a ^ b).count_ones())
            .sum();
        assert_eq!(flipped, 1);
        assert_eq!(&sent[0][..HEADER_SIZE], &got[0][..HEADER_SIZE]);
    }

    #[test]
    fn test_reorder_swaps_neighbours() {
        let impairments = Impairments {
            reorder_rate: 1.0,
            ..Default::default()
        };
        let mut lb = ImpairedLoopback::new(impairments, 3);
        let sent = frames(2);
        lb.send(sent[0].clone()).unwrap();
        lb.send(sent[1].clone()).unwrap();

        assert_eq!(lb.drain(), vec![sent[1].clone(), sent[0].clone()]);
    }

    #[test]
    fn test_fail_after_kills_the_link() {
        let impairments = Impairments {
            fail_after: Some(2),
            ..Default::default()
        };
        let mut lb = ImpairedLoopback::new(impairments, 1);
        let sent = frames(6);
        for f in &sent {
            lb.send(f.clone()).unwrap();
        }
        let got = lb.drain();

        assert_eq!(got.len(), 4);
        assert_eq!(got[..2], sent[..2]);
        for (got, sent) in got[2..].iter().zip([&sent[2], &sent[4]]) {
            assert_eq!(got[..HEADER_SIZE], sent[..HEADER_SIZE]);
            assert_eq!(got[HEADER_SIZE], !sent[HEADER_SIZE]);
        }
        assert_eq!(lb.stats().inverted, 2);
        assert_eq!(lb.stats().dropped, 2);
    }

    #[test]
    fn test_validate_rejects_bad_rates() {
        let impairments = Impairments {
            drop_rate: 1.5,
            ..Default::default()
        };
        assert!(impairments.validate().is_err());
    }
}
