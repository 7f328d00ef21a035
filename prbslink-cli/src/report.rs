//! Report rows written by the soak and check commands

use chrono::{SecondsFormat, Utc};
use colored::*;
use prbslink_core::{FaultEvent, LinkStatisticsView};
use serde::{Deserialize, Serialize};

/// One sampled line of the JSON-lines soak log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleRow {
    /// Wall-clock time the sample was taken (RFC 3339, UTC)
    pub timestamp: String,
    /// Milliseconds since the link session started
    pub elapsed_ms: u64,
    /// Link the sample belongs to, e.g. `eth/0`
    pub link: String,
    /// Tracker state name
    pub state: String,
    /// Frames received
    pub frame_count: u64,
    /// Checker words with flipped bits
    pub word_errors: u64,
    /// Deliveries that failed to decode
    pub malformed_frames: u64,
    /// Frames lost
    pub frames_lost: u64,
    /// Transport errors
    pub link_errors: u64,
    /// Flipped bits
    pub bit_errors: u64,
    /// Flipped bits per validated bit
    pub bit_error_rate: f64,
}

impl From<&LinkStatisticsView> for SampleRow {
    fn from(view: &LinkStatisticsView) -> Self {
        let c = &view.counters;
        Self {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            elapsed_ms: view.elapsed.as_millis() as u64,
            link: view.link.to_string(),
            state: view.tracker.name().to_string(),
            frame_count: c.frames_received,
            word_errors: c.word_errors,
            malformed_frames: c.malformed_frames,
            frames_lost: c.frames_lost,
            link_errors: c.link_errors,
            bit_errors: c.bit_errors_total,
            bit_error_rate: view.bit_error_rate,
        }
    }
}

/// Final outcome of a soak run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoakReport {
    /// Final snapshot of every link
    pub links: Vec<LinkStatisticsView>,
    /// Fault notifications in arrival order
    pub faults: Vec<FaultEvent>,
    /// Rows written to the sample log
    pub samples: u64,
}

/// Print one link's snapshot
pub fn print_link(view: &LinkStatisticsView) {
    let c = &view.counters;
    println!("\n=== Link {} ===", view.link);
    println!("State:              {}", state_label(view));
    println!("Frames sent:        {}", c.frames_sent);
    println!("Frames received:    {}", c.frames_received);
    println!("Frames ok:          {}", c.frames_ok.to_string().green());
    print_count("Frames with errors", c.frames_with_errors);
    print_count("Frames lost", c.frames_lost);
    print_count("Frames reordered", c.frames_reordered);
    print_count("Malformed frames", c.malformed_frames);
    print_count("Length mismatches", c.length_mismatches);
    print_count("Bit errors", c.bit_errors_total);
    print_count("Word errors", c.word_errors);
    print_count("Link errors", c.link_errors);
    print_count("Resync events", c.resync_events);
    println!("Bytes validated:    {}", c.bytes_validated);
    println!("Bit error rate:     {:.3e}", view.bit_error_rate);
    println!("Frame loss rate:    {:.4}%", view.frame_loss_rate * 100.0);
    println!("Throughput:         {:.2} Mbit/s", view.throughput_bps / 1e6);
}

fn print_count(label: &str, value: u64) {
    let padded = format!("{}:", label);
    if value > 0 {
        println!("{:<20}{}", padded, value.to_string().red());
    } else {
        println!("{:<20}{}", padded, value);
    }
}

fn state_label(view: &LinkStatisticsView) -> ColoredString {
    let name = view.tracker.name();
    match name {
        "synchronized" => name.green(),
        "faulted" => name.red().bold(),
        _ => name.yellow(),
    }
}
