//! Transmitter configuration
//!
//! Settings come from three layers, later ones winning: built-in defaults,
//! an optional TOML file, and the command line.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants::*;
use crate::error::{Error, Result};
use crate::modulation::Modulator;

/// Name of the settings file inside the user config directory
pub const CONFIG_FILE_NAME: &str = "pifm.toml";

/// Complete transmitter configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransmitterConfig {
    /// Carrier frequency in MHz
    pub frequency_mhz: f32,

    /// Peak deviation in kHz
    pub deviation_khz: f64,

    /// Stop after this many seconds (0 = run until input ends)
    pub timeout_secs: u64,

    /// Input sample rate; also sets the queue depth (one second)
    pub sample_rate: u32,

    /// GPCLK0 source clock in MHz
    pub source_clock_mhz: f64,

    /// Physical address of the peripheral window
    pub peripheral_base: u64,

    /// SCHED_FIFO priority for the transmitter thread (0 = don't ask)
    pub rt_priority: i32,
}

impl Default for TransmitterConfig {
    fn default() -> Self {
        Self {
            frequency_mhz: 0.0,
            deviation_khz: DEFAULT_DEVIATION_KHZ,
            timeout_secs: 0,
            sample_rate: SAMPLES_PER_SECOND,
            source_clock_mhz: GPCLK0_SOURCE_MHZ,
            peripheral_base: DEFAULT_PERIPHERAL_BASE,
            rt_priority: DEFAULT_RT_PRIORITY,
        }
    }
}

impl TransmitterConfig {
    /// Default configuration at the given carrier
    pub fn with_frequency(frequency_mhz: f32) -> Self {
        Self {
            frequency_mhz,
            ..Self::default()
        }
    }

    /// Parse a TOML document
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::Config(e.to_string()))
    }

    /// Load settings from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml(&text)
    }

    /// Load the per-user settings file if there is one, defaults otherwise
    pub fn load_default() -> Result<Self> {
        match default_config_path() {
            Some(path) if path.is_file() => {
                tracing::debug!("Loading settings from {}", path.display());
                Self::load(&path)
            }
            _ => Ok(Self::default()),
        }
    }

    /// Serialize back to TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }

    /// Deviation in MHz, the unit the modulator works in
    pub fn deviation_mhz(&self) -> f32 {
        (self.deviation_khz / 1000.0) as f32
    }

    /// Wall-clock limit, if any
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }

    /// Microseconds between divisor writes
    pub fn sample_period_us(&self) -> u64 {
        1_000_000 / self.sample_rate as u64
    }

    /// Queue depth: one second of samples
    pub fn queue_capacity(&self) -> usize {
        self.sample_rate as usize
    }

    /// Check that the configuration can drive the transmitter
    pub fn validate(&self) -> Result<()> {
        if !(self.frequency_mhz > 0.0) {
            return Err(Error::Config(format!(
                "frequency must be positive, got {}",
                self.frequency_mhz
            )));
        }
        if !(self.deviation_mhz() > 0.0) {
            return Err(Error::Config(format!(
                "deviation must be positive, got {} kHz",
                self.deviation_khz
            )));
        }
        if self.sample_rate == 0 || self.sample_rate > 1_000_000 {
            return Err(Error::Config(format!(
                "sample rate must be between 1 and 1000000, got {}",
                self.sample_rate
            )));
        }
        if !(self.source_clock_mhz > 0.0) {
            return Err(Error::Config(format!(
                "source clock must be positive, got {}",
                self.source_clock_mhz
            )));
        }

        let modulator = Modulator::from_config(self);
        if !modulator.is_within_range() {
            let (low, high) = modulator.divisor_range();
            tracing::warn!(
                "{} MHz ± {} kHz leaves the divisor range, divisors will saturate ({}..={})",
                self.frequency_mhz,
                self.deviation_khz,
                low,
                high
            );
        }
        Ok(())
    }
}

/// Location of the per-user settings file
pub fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "pifm")
        .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}
