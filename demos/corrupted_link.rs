//! Corrupted link example
//!
//! Flips bits, drops frames and finally feeds pure noise into a monitor
//! to show the accounting and the fault notification.

use bytes::Bytes;
use prbslink_core::{constants::HEADER_SIZE, LinkId, LinkMonitor, MonitorConfig, ValidationResult};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Prbslink Corrupted Link Example\n");

    let config = MonitorConfig {
        payload_len: 128,
        gap_threshold: 2,
        resync_attempt_limit: 4,
        ..Default::default()
    };
    let mut monitor = LinkMonitor::new(LinkId::ethernet(0), &config)?;
    let faults = monitor.subscribe_faults();

    for i in 0..50u32 {
        let frame = monitor.next_tx_frame();
        match i {
            7 | 8 => println!("Frame {}: dropped", i),
            12 => {
                let mut raw = frame.to_vec();
                raw[HEADER_SIZE + 5] ^= 0b0001_0001;
                monitor.submit_rx(Bytes::from(raw));
                if let Some(ValidationResult::BitErrors(report)) = monitor.last_result() {
                    for m in &report.mismatches {
                        println!(
                            "Frame {}: byte {} expected {:#04x} got {:#04x} ({} bits)",
                            i,
                            m.offset,
                            m.expected,
                            m.actual,
                            m.flipped_bits()
                        );
                    }
                }
            }
            _ => monitor.submit_rx(frame),
        }
    }

    let view = monitor.snapshot();
    println!("\nAfter 50 frames:");
    println!("  lost:       {}", view.counters.frames_lost);
    println!("  bit errors: {}", view.counters.bit_errors_total);
    println!("  loss rate:  {:.2}%", view.frame_loss_rate * 100.0);

    // Force a resynchronization with a jump, then feed noise until the link faults
    for _ in 0..10 {
        monitor.next_tx_frame();
    }
    for _ in 0..3 {
        let frame = monitor.next_tx_frame();
        monitor.submit_rx(frame);
        for _ in 0..3 {
            monitor.next_tx_frame();
        }
    }
    for _ in 0..10 {
        let mut raw = monitor.next_tx_frame().to_vec();
        for byte in &mut raw[HEADER_SIZE..] {
            *byte = !*byte;
        }
        monitor.submit_rx(Bytes::from(raw));
    }

    println!("\nTracker state: {:?}", monitor.tracker_state());
    for event in faults.try_iter() {
        println!("Fault on {}: {}", event.link, event.reason);
    }

    Ok(())
}
