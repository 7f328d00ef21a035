use anyhow::Result;
use clap::{Parser, Subcommand};
use prbslink_cli::{commands, loopback::Impairments, PolynomialArg, TransportArg};
use std::time::Duration;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "prbslink")]
#[command(about = "Prbslink - PRBS link generator, checker and soak tester", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print or write a window of the PRBS stream
    Generate {
        /// Generator seed
        #[arg(long, default_value_t = prbslink_core::constants::DEFAULT_SEED)]
        seed: u64,

        /// Byte offset into the stream
        #[arg(long, default_value = "0")]
        position: u64,

        /// Number of bytes
        #[arg(long, default_value = "64")]
        length: usize,

        /// PRBS pattern
        #[arg(long, value_enum, default_value = "prbs31")]
        polynomial: PolynomialArg,

        /// Write raw bytes here instead of a hex dump
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Run both links through a simulated impaired loopback
    Soak {
        /// Frames per link
        #[arg(long, default_value = "10000")]
        frames: u64,

        /// Monitor configuration (JSON)
        #[arg(short, long)]
        config: Option<String>,

        /// Probability of dropping a frame
        #[arg(long, default_value = "0")]
        drop_rate: f64,

        /// Probability of flipping one payload bit
        #[arg(long, default_value = "0")]
        flip_rate: f64,

        /// Probability of delivering a frame after its successor
        #[arg(long, default_value = "0")]
        reorder_rate: f64,

        /// Kill each link after this many frames (alternate frames lost, the rest inverted)
        #[arg(long)]
        fail_after: Option<u64>,

        /// Seed for the impairment generator
        #[arg(long, default_value = "1")]
        rng_seed: u64,

        /// Frames generated between deliveries
        #[arg(long, default_value = "64")]
        batch: usize,

        /// JSON-lines sample log
        #[arg(long)]
        log: Option<String>,

        /// Milliseconds between samples
        #[arg(long, default_value = "100")]
        sample_ms: u64,

        /// Final JSON report
        #[arg(long)]
        report: Option<String>,

        /// Hide the progress bar
        #[arg(short, long)]
        quiet: bool,
    },

    /// Check a captured byte stream
    Check {
        /// Capture file ("-" for stdin)
        #[arg(short, long)]
        input: String,

        /// Monitor configuration (JSON)
        #[arg(short, long)]
        config: Option<String>,

        /// Transport the capture was taken on
        #[arg(long, value_enum, default_value = "p2p")]
        transport: TransportArg,

        /// Lane the capture was taken on
        #[arg(long, default_value = "0")]
        lane: u8,

        /// JSON report
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Write the default monitor configuration
    Config {
        /// Output JSON file
        #[arg(short, long)]
        output: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    // Execute command
    match cli.command {
        Commands::Generate {
            seed,
            position,
            length,
            polynomial,
            output,
        } => commands::generate::execute(seed, position, length, polynomial.into(), output.as_deref())
            .map(|_| ()),

        Commands::Soak {
            frames,
            config,
            drop_rate,
            flip_rate,
            reorder_rate,
            fail_after,
            rng_seed,
            batch,
            log,
            sample_ms,
            report,
            quiet,
        } => {
            let opts = commands::soak::SoakOptions {
                frames,
                batch,
                config: commands::config::load(config.as_deref())?,
                impairments: Impairments {
                    drop_rate,
                    flip_rate,
                    reorder_rate,
                    fail_after,
                },
                rng_seed,
                log,
                report,
                sample_interval: Duration::from_millis(sample_ms),
                quiet,
            };
            commands::soak::execute(&opts).map(|_| ())
        }

        Commands::Check {
            input,
            config,
            transport,
            lane,
            output,
        } => {
            let config = commands::config::load(config.as_deref())?;
            commands::check::execute(&input, &config, transport.into(), lane, output.as_deref()).map(|_| ())
        }

        Commands::Config { output } => commands::config::execute(&output),
    }
}
