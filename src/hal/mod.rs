//! Hardware access for the GPCLK0 transmitter
//!
//! Layers, bottom up:
//! - [`RegisterBus`]: 32-bit register reads and writes at byte offsets into
//!   the peripheral window. [`mmio::MmioBus`] maps `/dev/mem`;
//!   [`sim::SimBus`] is an in-memory stand-in for tests.
//! - [`clock::ClockController`]: the GPCLK0/GPFSEL0/system-timer register
//!   protocol expressed over any bus.
//! - [`ClockOutput`]: the three operations the transmitter needs.

pub mod clock;
#[cfg(unix)]
pub mod mmio;
pub mod registers;
pub mod sim;

pub use clock::ClockController;
#[cfg(unix)]
pub use mmio::MmioBus;
pub use sim::SimBus;

/// Volatile access to a window of 32-bit peripheral registers
pub trait RegisterBus: Send + Sync {
    /// Read the register at `offset` bytes from the window base
    fn read32(&self, offset: usize) -> u32;

    /// Write the register at `offset` bytes from the window base
    fn write32(&self, offset: usize, value: u32);
}

/// Clock output as seen by the transmitter
pub trait ClockOutput: Send {
    /// Current value of the free-running microsecond counter
    fn read_counter(&self) -> u64;

    /// Program the output divisor
    fn write_divisor(&self, divisor: u32);

    /// Route the clock to the output pin, or release the pin
    fn set_clock_enabled(&self, enabled: bool);
}
