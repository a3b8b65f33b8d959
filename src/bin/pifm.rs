//! FM Transmitter Application
//!
//! Reads 20000 samples/s 16-bit little-endian mono PCM from stdin and
//! transmits it as FM on GPIO4 (pin 7).

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pifm::{
    config::TransmitterConfig,
    hal::ClockController,
    shutdown::ShutdownCoordinator,
    station,
};

const AFTER_HELP: &str = "\
The proper stream can be generated with sox, for example:

    sox music.wav -c1 -r20000 -b16 -L -esigned - | sudo pifm 100.5

Transmission ends when the source is exhausted or the process is killed.

The FM signal is emitted from GPIO4, which is pin 7 on the 40-pin connector.";

#[derive(Parser, Debug)]
#[command(
    name = "pifm",
    about = "Generate an FM signal with Raspberry Pi at the specified frequency (in MHz), \
             modulated with the single-channel 20000 samples/second 16-bit little-endian \
             signed PCM stream presented on stdin.",
    after_help = AFTER_HELP
)]
struct Cli {
    /// Carrier frequency in MHz
    #[arg(value_name = "XXX.X")]
    frequency: f64,

    /// Maximum FM deviation in kHz [default: 75]
    #[arg(short = 'd', value_name = "KHZ", allow_negative_numbers = true)]
    deviation: Option<f64>,

    /// Exit after this many seconds (or when input is exhausted, whichever comes first)
    #[arg(short = 't', value_name = "SECS", value_parser = parse_unsigned)]
    timeout: Option<u64>,

    /// Settings file (TOML)
    #[arg(short = 'c', long = "config", value_name = "PATH")]
    config: Option<PathBuf>,

    /// Peripheral base address: 0x20000000 on BCM2835, 0x3f000000 on BCM2836/7
    #[arg(long, value_name = "ADDR", value_parser = parse_unsigned)]
    iobase: Option<u64>,
}

impl Cli {
    /// Merge command-line values over the settings file
    fn into_config(self) -> pifm::Result<TransmitterConfig> {
        let mut config = match &self.config {
            Some(path) => TransmitterConfig::load(path)?,
            None => TransmitterConfig::load_default()?,
        };

        config.frequency_mhz = self.frequency as f32;
        if let Some(deviation) = self.deviation {
            config.deviation_khz = deviation;
        }
        if let Some(timeout) = self.timeout {
            config.timeout_secs = timeout;
        }
        if let Some(base) = self.iobase {
            config.peripheral_base = base;
        }
        Ok(config)
    }
}

/// Decimal, or hex with a 0x prefix
fn parse_unsigned(text: &str) -> std::result::Result<u64, String> {
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => text.parse(),
    };
    parsed.map_err(|e| e.to_string())
}

/// Print the error and usage text, then exit with status 1
fn usage(error: impl std::fmt::Display) -> ! {
    eprintln!("{}\n", error);
    eprintln!("{}", Cli::command().render_long_help());
    std::process::exit(1);
}

fn main() {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run() {
        tracing::error!("{:#}", e);
    }

    // Exit status is 1 on every path, normal completion included
    std::process::exit(1);
}

fn run() -> Result<()> {
    let cli = Cli::try_parse().unwrap_or_else(|e| usage(e));
    let config = cli.into_config().unwrap_or_else(|e| usage(e));
    if let Err(e) = config.validate() {
        usage(e);
    }

    let bus = open_peripherals(config.peripheral_base)?;

    // Dropped last: halts and joins the transmitter on every return path
    let coordinator = ShutdownCoordinator::new();
    coordinator
        .install_signal_handlers()
        .context("Can't install signal handlers")?;

    let summary = station::run(
        &config,
        ClockController::new(bus),
        std::io::stdin().lock(),
        &coordinator,
    )?;

    tracing::info!(
        "Input {:?} after {} samples",
        summary.input.outcome,
        summary.input.samples_read
    );
    if let Some(report) = &summary.transmit {
        if !report.realtime {
            tracing::debug!("Transmitter ran without real-time priority");
        }
    }
    Ok(())
}

#[cfg(unix)]
fn open_peripherals(base: u64) -> Result<pifm::hal::MmioBus> {
    Ok(pifm::hal::MmioBus::open(base)?)
}

#[cfg(not(unix))]
fn open_peripherals(_base: u64) -> Result<pifm::hal::SimBus> {
    Err(pifm::error::HardwareError::Unsupported.into())
}
