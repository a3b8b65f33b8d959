//! Sample to GPCLK0 divisor conversion
//!
//! The output frequency of GPCLK0 is `source * 4096 / divisor`, so each
//! audio sample maps to the divisor whose frequency is the carrier shifted
//! by the sample's share of the deviation.
//!
//! The arithmetic keeps the historical widths so existing recordings
//! produce bit-identical divisor streams: carrier, deviation and the
//! instantaneous frequency are `f32`, the quotient is `f64`, and the result
//! is truncated toward zero.

use crate::config::TransmitterConfig;
use crate::constants::{DIVISOR_MAX, DIVISOR_SCALE, GPCLK0_SOURCE_MHZ};

/// Full-scale magnitude of a 16-bit sample
const FULL_SCALE: f64 = 32768.0;

/// Converts PCM samples to clock divisors
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Modulator {
    carrier_mhz: f32,
    deviation_mhz: f32,
    source_mhz: f64,
}

impl Modulator {
    pub fn new(carrier_mhz: f32, deviation_mhz: f32, source_mhz: f64) -> Self {
        Self {
            carrier_mhz,
            deviation_mhz,
            source_mhz,
        }
    }

    /// Modulator for GPCLK0 fed from PLLD
    pub fn gpclk0(carrier_mhz: f32, deviation_mhz: f32) -> Self {
        Self::new(carrier_mhz, deviation_mhz, GPCLK0_SOURCE_MHZ)
    }

    pub fn from_config(config: &TransmitterConfig) -> Self {
        Self::new(
            config.frequency_mhz,
            config.deviation_mhz(),
            config.source_clock_mhz,
        )
    }

    /// Instantaneous output frequency for a sample, in MHz
    pub fn frequency(&self, sample: i16) -> f32 {
        (self.carrier_mhz as f64 + (sample as f64 / FULL_SCALE) * self.deviation_mhz as f64) as f32
    }

    /// Divisor for a sample.
    ///
    /// Results outside the 24-bit divisor field saturate: a non-positive
    /// instantaneous frequency maps to [`DIVISOR_MAX`] (the lowest frequency
    /// the clock can produce), as does anything below it.
    pub fn divisor(&self, sample: i16) -> u32 {
        Self::divisor_for(self.source_mhz, self.frequency(sample))
    }

    fn divisor_for(source_mhz: f64, frequency_mhz: f32) -> u32 {
        if !(frequency_mhz > 0.0) {
            return DIVISOR_MAX;
        }
        // `as` truncates toward zero and saturates at u32::MAX
        let divisor = ((source_mhz / frequency_mhz as f64) * DIVISOR_SCALE) as u32;
        divisor.min(DIVISOR_MAX)
    }

    /// Divisors at full negative and full positive swing
    pub fn divisor_range(&self) -> (u32, u32) {
        (self.divisor(i16::MAX), self.divisor(i16::MIN))
    }

    /// True when every sample maps to a divisor without saturation
    pub fn is_within_range(&self) -> bool {
        let lowest = self.frequency(i16::MIN);
        if !(lowest > 0.0) {
            return false;
        }
        let raw = (self.source_mhz / lowest as f64) * DIVISOR_SCALE;
        raw <= DIVISOR_MAX as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn broadcast() -> Modulator {
        Modulator::gpclk0(100.5, 0.075)
    }

    #[test]
    fn test_reference_divisors() {
        let m = broadcast();
        assert_eq!(m.divisor(0), 20378);
        assert_eq!(m.divisor(i16::MIN), 20393);
    }

    #[test]
    fn test_truncates_instead_of_rounding() {
        // 500 / 100.425 * 4096 = 20393.33..., 500 / 100.5 * 4096 = 20378.10...
        let m = broadcast();
        let exact = GPCLK0_SOURCE_MHZ / m.frequency(i16::MIN) as f64 * DIVISOR_SCALE;
        assert!(exact.fract() > 0.0);
        assert_eq!(m.divisor(i16::MIN) as f64, exact.trunc());
    }

    #[test]
    fn test_divisor_decreases_with_amplitude() {
        let m = broadcast();
        let (low, high) = m.divisor_range();
        assert!(low < m.divisor(0));
        assert!(m.divisor(0) < high);
        assert!(m.divisor(-1000) > m.divisor(1000));
        assert!(m.is_within_range());
    }

    #[test]
    fn test_conversion_is_deterministic() {
        let a = broadcast();
        let b = broadcast();
        for s in [i16::MIN, -12345, -1, 0, 1, 4321, i16::MAX] {
            assert_eq!(a.divisor(s), b.divisor(s));
        }
    }

    #[test]
    fn test_non_positive_frequency_saturates() {
        // Deviation larger than the carrier drives the frequency negative
        let m = Modulator::gpclk0(1.0, 2.0);
        assert!(m.frequency(i16::MIN) < 0.0);
        assert_eq!(m.divisor(i16::MIN), DIVISOR_MAX);
        assert!(!m.is_within_range());

        // Exactly zero
        let m = Modulator::gpclk0(1.0, 1.0);
        assert_eq!(m.frequency(i16::MIN), 0.0);
        assert_eq!(m.divisor(i16::MIN), DIVISOR_MAX);
    }

    #[test]
    fn test_near_zero_frequency_saturates() {
        // 500 * 4096 / 0xFFFFFF is about 0.122 MHz; anything lower overflows 24 bits
        let m = Modulator::gpclk0(0.05, 0.01);
        assert_eq!(m.divisor(0), DIVISOR_MAX);
        assert!(!m.is_within_range());
    }

    #[test]
    fn test_divisor_never_exceeds_field() {
        let m = Modulator::gpclk0(0.2, 0.19);
        for s in (i16::MIN..=i16::MAX).step_by(97) {
            assert!(m.divisor(s) <= DIVISOR_MAX);
        }
    }
}
