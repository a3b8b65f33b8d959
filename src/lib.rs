//! # pifm
//!
//! FM transmission from a Raspberry Pi by reprogramming the GPCLK0 divisor
//! once per audio sample.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                           MAIN THREAD                                │
//! │  ┌─────────────┐   ┌──────────────────────┐   ┌─────────────────┐   │
//! │  │   stdin     │──▶│ InputReader          │──▶│  SampleQueue    │   │
//! │  │ (s16le PCM) │   │ (audio::reader)      │   │ (audio::buffer) │   │
//! │  └─────────────┘   │  sample → divisor    │   │  1s of divisors │   │
//! │                    └──────────────────────┘   └────────┬────────┘   │
//! └────────────────────────────────────────────────────────┼────────────┘
//!                                                          │
//! ┌────────────────────────────────────────────────────────┼────────────┐
//! │                     TRANSMITTER THREAD (SCHED_FIFO)    ▼            │
//! │  ┌──────────────────────────────────────────────────────────────┐   │
//! │  │ Transmitter (transmitter)                                    │   │
//! │  │   spin until SYSCLK ≥ deadline → write GPCLK0_DIV → +50µs    │   │
//! │  └──────────────────────────────┬───────────────────────────────┘   │
//! └─────────────────────────────────┼───────────────────────────────────┘
//!                                   ▼
//!        ┌──────────────────────────────────────────────────────┐
//!        │ ClockController (hal::clock) over /dev/mem (hal::mmio)│
//!        │   GPFSEL0 · GPCLK0_MODE · GPCLK0_DIV · SYSCLK        │
//!        └──────────────────────────┬───────────────────────────┘
//!                                   ▼
//!                            GPIO4 (pin 7)
//! ```
//!
//! A [`shutdown::ShutdownCoordinator`] owns the halt flag and the
//! transmitter's join handle; signals, the input timeout and teardown all
//! converge on it.

pub mod audio;
pub mod config;
pub mod error;
pub mod hal;
pub mod modulation;
pub mod platform;
pub mod shutdown;
pub mod station;
pub mod transmitter;

pub use error::{Error, Result};

/// Application-wide constants
pub mod constants {
    /// Bytes in one input sample (16-bit little-endian signed)
    pub const BYTES_PER_SAMPLE: usize = 2;

    /// Nominal input sample rate
    pub const SAMPLES_PER_SECOND: u32 = 20000;

    /// Microseconds between divisor updates at the nominal rate
    pub const USECS_PER_SAMPLE: u64 = 1_000_000 / SAMPLES_PER_SECOND as u64;

    /// Sample queue capacity (one second of samples)
    pub const QUEUE_CAPACITY: usize = SAMPLES_PER_SECOND as usize;

    /// GPCLK0 source clock (PLLD) in MHz
    pub const GPCLK0_SOURCE_MHZ: f64 = 500.0;

    /// Divisor fixed-point scale (12 fractional bits)
    pub const DIVISOR_SCALE: f64 = 4096.0;

    /// Largest divisor the peripheral accepts (24 bits)
    pub const DIVISOR_MAX: u32 = 0x00FF_FFFF;

    /// Default FM deviation in kHz
    pub const DEFAULT_DEVIATION_KHZ: f64 = 75.0;

    /// SCHED_FIFO priority requested for the transmitter thread
    pub const DEFAULT_RT_PRIORITY: i32 = 90;

    /// Peripheral base on BCM2835 (Pi 1, Zero)
    pub const PERIPHERAL_BASE_BCM2835: u64 = 0x2000_0000;

    /// Peripheral base on BCM2836/BCM2837 (Pi 2, Pi 3)
    pub const PERIPHERAL_BASE_BCM2837: u64 = 0x3F00_0000;

    /// Default peripheral base
    pub const DEFAULT_PERIPHERAL_BASE: u64 = PERIPHERAL_BASE_BCM2837;
}
