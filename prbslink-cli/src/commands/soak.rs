use crate::loopback::{ImpairedLoopback, ImpairmentStats, Impairments};
use crate::report::{print_link, SampleRow, SoakReport};
use anyhow::{Context, Result};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use prbslink_core::{
    FaultEvent, LinkEndpoint, LinkId, LinkMonitor, LinkStatisticsView, MonitorConfig, MonitorHandle,
    RxSink,
};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Receiver;
use std::thread;
use std::time::Duration;
use tracing::{info, warn};

/// Everything a soak run needs
#[derive(Debug, Clone)]
pub struct SoakOptions {
    /// Frames generated per link
    pub frames: u64,
    /// Frames generated between deliveries
    pub batch: usize,
    /// Monitor configuration shared by both links
    pub config: MonitorConfig,
    /// Loopback impairments
    pub impairments: Impairments,
    /// Seed for the impairment generator
    pub rng_seed: u64,
    /// JSON-lines sample log
    pub log: Option<String>,
    /// Final JSON report
    pub report: Option<String>,
    /// Time between reporter samples
    pub sample_interval: Duration,
    /// Hide the progress bar
    pub quiet: bool,
}

impl Default for SoakOptions {
    fn default() -> Self {
        Self {
            frames: 10_000,
            batch: 64,
            config: MonitorConfig::default(),
            impairments: Impairments::default(),
            rng_seed: 1,
            log: None,
            report: None,
            sample_interval: Duration::from_millis(100),
            quiet: false,
        }
    }
}

/// Links exercised by a soak run
const LINKS: [LinkId; 2] = [LinkId::ethernet(0), LinkId::point_to_point(0)];

/// Run both links through the impaired loopback and report the outcome
pub fn execute(opts: &SoakOptions) -> Result<SoakReport> {
    opts.impairments.validate()?;
    anyhow::ensure!(opts.batch > 0, "batch must be at least 1");

    info!(
        "Soaking {} frames per link (drop {}, flip {}, reorder {})",
        opts.frames, opts.impairments.drop_rate, opts.impairments.flip_rate, opts.impairments.reorder_rate
    );

    let mut monitors = Vec::new();
    let mut fault_rx = Vec::new();
    for link in LINKS {
        let mut monitor = LinkMonitor::new(link, &opts.config).context("Invalid monitor configuration")?;
        fault_rx.push(monitor.subscribe_faults());
        monitors.push(monitor);
    }
    let handles: Vec<MonitorHandle> = monitors.iter().map(LinkMonitor::handle).collect();

    let progress = if opts.quiet {
        ProgressBar::hidden()
    } else {
        let bar = ProgressBar::new(opts.frames * LINKS.len() as u64);
        bar.set_style(
            ProgressStyle::with_template("{spinner} [{elapsed_precise}] {bar:40} {pos}/{len} frames")?
                .progress_chars("=>-"),
        );
        bar
    };

    let log = match &opts.log {
        Some(path) => Some(BufWriter::new(
            File::create(path).with_context(|| format!("Failed to create log file: {}", path))?,
        )),
        None => None,
    };

    let done = AtomicBool::new(false);
    let (links, samples) = thread::scope(|s| -> Result<_> {
        let reporter = s.spawn(|| sample_loop(&handles, log, opts.sample_interval, &done));

        let workers: Vec<_> = monitors
            .into_iter()
            .enumerate()
            .map(|(i, monitor)| {
                let progress = progress.clone();
                let seed = opts.rng_seed.wrapping_add(i as u64);
                s.spawn(move || drive_link(monitor, opts, seed, &progress))
            })
            .collect();

        let results: Vec<_> = workers.into_iter().map(|w| w.join()).collect();
        // The reporter must be stopped before any early return or the scope never ends
        done.store(true, Ordering::SeqCst);
        let samples = reporter
            .join()
            .map_err(|_| anyhow::anyhow!("reporter panicked"))??;

        let mut links = Vec::new();
        for result in results {
            let (view, impaired) = result.map_err(|_| anyhow::anyhow!("link worker panicked"))?;
            info!(
                "Link {} loopback dropped {}, flipped {}, reordered {}",
                view.link, impaired.dropped, impaired.flipped, impaired.reordered
            );
            links.push(view);
        }
        Ok((links, samples))
    })?;
    progress.finish_and_clear();

    let faults = collect_faults(&fault_rx);
    for fault in &faults {
        warn!("Link {} went down: {}", fault.link, fault.reason);
    }

    let report = SoakReport {
        links,
        faults,
        samples,
    };
    print_summary(&report);

    if let Some(path) = &opts.report {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
        fs::write(path, json).with_context(|| format!("Failed to write report: {}", path))?;
        info!("Report written to: {}", path);
    }

    Ok(report)
}

/// Generate, impair and check one link until its frame budget is spent
fn drive_link(
    monitor: LinkMonitor,
    opts: &SoakOptions,
    seed: u64,
    progress: &ProgressBar,
) -> (LinkStatisticsView, ImpairmentStats) {
    let mut endpoint = LinkEndpoint::new(monitor);
    let mut wire = ImpairedLoopback::new(opts.impairments, seed);

    let mut remaining = opts.frames;
    while remaining > 0 {
        let burst = remaining.min(opts.batch as u64) as usize;
        let sent = endpoint.pump_tx(&mut wire, burst);
        for frame in wire.drain() {
            endpoint.deliver(frame);
        }
        progress.inc(burst as u64);
        remaining -= burst as u64;
        if sent < burst {
            break;
        }
    }

    wire.flush();
    for frame in wire.drain() {
        endpoint.deliver(frame);
    }

    (endpoint.monitor().snapshot(), wire.stats())
}

/// Sample every link until `done`, then once more; returns rows written
fn sample_loop(
    handles: &[MonitorHandle],
    mut log: Option<BufWriter<File>>,
    interval: Duration,
    done: &AtomicBool,
) -> Result<u64> {
    let mut rows = 0u64;
    loop {
        let finished = done.load(Ordering::SeqCst);
        if let Some(out) = log.as_mut() {
            for handle in handles {
                let row = SampleRow::from(&handle.snapshot());
                serde_json::to_writer(&mut *out, &row).context("Failed to write sample")?;
                writeln!(out)?;
                rows += 1;
            }
        }
        if finished {
            break;
        }
        thread::sleep(interval);
    }

    if let Some(mut out) = log {
        out.flush().context("Failed to flush sample log")?;
    }
    Ok(rows)
}

fn collect_faults(receivers: &[Receiver<FaultEvent>]) -> Vec<FaultEvent> {
    receivers.iter().flat_map(|rx| rx.try_iter()).collect()
}

fn print_summary(report: &SoakReport) {
    for view in &report.links {
        print_link(view);
    }

    println!("\n=== Summary ===");
    if report.faults.is_empty() {
        println!("{} No link faults", "✓".green());
    } else {
        for fault in &report.faults {
            println!("{} Link {} faulted: {}", "✗".red(), fault.link, fault.reason);
        }
    }
    if report.samples > 0 {
        println!("Samples logged:     {}", report.samples);
    }
}
