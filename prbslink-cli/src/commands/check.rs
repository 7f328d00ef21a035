use anyhow::{Context, Result};
use colored::*;
use prbslink_core::{LinkId, LinkMonitor, LinkStatisticsView, MonitorConfig, TransportKind};
use std::fs;
use std::io::{self, Read};
use tracing::{info, warn};

/// Bytes fed to the monitor per call, mimicking a read loop
const READ_CHUNK: usize = 64 * 1024;

/// Run a captured byte stream through a monitor and report the outcome
pub fn execute(
    input: &str,
    config: &MonitorConfig,
    transport: TransportKind,
    lane: u8,
    output: Option<&str>,
) -> Result<LinkStatisticsView> {
    info!("Checking capture: {}", input);

    // Read input file or stdin
    let data = if input == "-" {
        let mut buf = Vec::new();
        io::stdin().read_to_end(&mut buf)?;
        buf
    } else {
        fs::read(input).with_context(|| format!("Failed to read input file: {}", input))?
    };

    info!("File size: {} bytes", data.len());

    let link = LinkId::new(transport, lane);
    let mut monitor = LinkMonitor::new(link, config).context("Invalid monitor configuration")?;
    for chunk in data.chunks(READ_CHUNK) {
        monitor.submit_rx_stream(chunk);
    }

    let view = monitor.snapshot();
    let scan = monitor.scan_stats();

    println!("\n=== Capture ===");
    println!("Bytes scanned:      {} bytes", scan.bytes_scanned);
    println!("Bytes skipped:      {} bytes", scan.bytes_skipped);
    println!("Frames found:       {}", scan.frames_found);
    crate::report::print_link(&view);

    println!("\n=== Summary ===");
    if view.counters.frames_received == 0 {
        println!("{} No frames for link {} found", "✗".red(), link);
    } else if view.is_faulted() {
        println!("{} Link {} faulted", "✗".red(), link);
    } else if view.counters.bit_errors_total == 0 && view.counters.frames_lost == 0 {
        println!("{} Capture is clean", "✓".green());
    } else {
        println!("{} Capture has errors or losses", "!".yellow());
    }

    if scan.bytes_skipped > 0 {
        warn!("{} bytes did not belong to any frame", scan.bytes_skipped);
    }

    if let Some(path) = output {
        let json = serde_json::to_string_pretty(&view).context("Failed to serialize report")?;
        fs::write(path, json).with_context(|| format!("Failed to write report: {}", path))?;
        info!("Report written to: {}", path);
    }

    Ok(view)
}
