//! GPCLK0 register protocol
//!
//! Every operation is a fixed sequence of separate register accesses. The
//! order matters: writing enable and source bits before the kill/enable
//! pair can glitch the output.

use super::registers::*;
use super::{ClockOutput, RegisterBus};

/// GPCLK0 on GPIO4, driven through a register bus
pub struct ClockController<B: RegisterBus> {
    bus: B,
}

impl<B: RegisterBus> ClockController<B> {
    pub fn new(bus: B) -> Self {
        Self { bus }
    }

    /// Route GPCLK0 to GPIO4 and start the clock with MASH 1 from PLLD
    pub fn enable(&self) {
        let fsel = self.bus.read32(GPFSEL0);
        self.bus.write32(GPFSEL0, fsel_clock_output(fsel));
        for word in ENABLE_SEQUENCE {
            self.bus.write32(CM_GP0CTL, word);
        }
    }

    /// Stop the clock and return GPIO4 to an input
    pub fn disable(&self) {
        self.bus.write32(CM_GP0CTL, DISABLE_WORD);
        let fsel = self.bus.read32(GPFSEL0);
        self.bus.write32(GPFSEL0, fsel_input(fsel));
    }

    /// Program the divisor; the output runs at `source * 4096 / divisor`
    pub fn set_divisor(&self, divisor: u32) {
        self.bus.write32(CM_GP0DIV, divisor_word(divisor));
    }

    /// Read the 64-bit system timer as two 32-bit halves, retrying if the
    /// low word carried into the high word between reads
    pub fn read_counter(&self) -> u64 {
        loop {
            let hi = self.bus.read32(SYST_CHI);
            let lo = self.bus.read32(SYST_CLO);
            if self.bus.read32(SYST_CHI) == hi {
                return ((hi as u64) << 32) | lo as u64;
            }
        }
    }

    /// True while GPIO4 is routed to the clock
    pub fn is_pin_routed(&self) -> bool {
        gpio4_function(self.bus.read32(GPFSEL0)) == FSEL_ALT0
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }
}

impl<B: RegisterBus> ClockOutput for ClockController<B> {
    fn read_counter(&self) -> u64 {
        ClockController::read_counter(self)
    }

    fn write_divisor(&self, divisor: u32) {
        self.set_divisor(divisor);
    }

    fn set_clock_enabled(&self, enabled: bool) {
        if enabled {
            self.enable();
        } else {
            self.disable();
        }
    }
}
