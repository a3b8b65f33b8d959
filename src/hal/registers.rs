//! BCM283x register map for GPCLK0 on GPIO4
//!
//! Offsets are relative to the peripheral base. Clock manager registers
//! ignore writes unless the top byte carries [`CM_PASSWORD`].

use crate::constants::DIVISOR_MAX;

/// Length of the mapped peripheral window
pub const WINDOW_LEN: usize = 0x002F_FFFF;

/// System timer counter, low word
pub const SYST_CLO: usize = 0x0000_3004;
/// System timer counter, high word
pub const SYST_CHI: usize = 0x0000_3008;

/// GPCLK0 control
pub const CM_GP0CTL: usize = 0x0010_1070;
/// GPCLK0 divisor
pub const CM_GP0DIV: usize = 0x0010_1074;

/// GPIO function select for GPIO0..GPIO9
pub const GPFSEL0: usize = 0x0020_0000;

/// Clock manager write-enable tag
pub const CM_PASSWORD: u32 = 0x5a << 24;
/// Reset (kill) the clock generator
pub const CM_KILL: u32 = 1 << 5;
/// Enable the clock generator
pub const CM_ENAB: u32 = 1 << 4;
/// MASH noise shaping, first order
pub const CM_MASH1: u32 = 1 << 9;
/// Clock source 6: PLLD (500 MHz)
pub const CM_SRC_PLLD: u32 = 6;

/// GPIO4's 3-bit field within GPFSEL0
pub const GPIO4_FSEL_SHIFT: u32 = 12;
pub const FSEL_MASK: u32 = 0b111;
/// Alternate function 0 routes GPCLK0 to GPIO4
pub const FSEL_ALT0: u32 = 0b100;
pub const FSEL_INPUT: u32 = 0b000;

/// GPFSEL0 with GPIO4 switched to GPCLK0, other pins untouched
pub fn fsel_clock_output(gpfsel0: u32) -> u32 {
    (gpfsel0 & !(FSEL_MASK << GPIO4_FSEL_SHIFT)) | (FSEL_ALT0 << GPIO4_FSEL_SHIFT)
}

/// GPFSEL0 with GPIO4 switched back to an input, other pins untouched
pub fn fsel_input(gpfsel0: u32) -> u32 {
    (gpfsel0 & !(FSEL_MASK << GPIO4_FSEL_SHIFT)) | (FSEL_INPUT << GPIO4_FSEL_SHIFT)
}

/// GPIO4's current function
pub fn gpio4_function(gpfsel0: u32) -> u32 {
    (gpfsel0 >> GPIO4_FSEL_SHIFT) & FSEL_MASK
}

/// Control words written by the enable sequence, in order
pub const ENABLE_SEQUENCE: [u32; 3] = [
    CM_PASSWORD | CM_KILL,
    CM_PASSWORD | CM_ENAB,
    CM_PASSWORD | CM_MASH1 | CM_ENAB | CM_SRC_PLLD,
];

/// Control word that stops the clock
pub const DISABLE_WORD: u32 = CM_PASSWORD;

/// Divisor register word; bits above the 24-bit field are dropped so the
/// tag survives
pub fn divisor_word(divisor: u32) -> u32 {
    CM_PASSWORD | (divisor & DIVISOR_MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_words() {
        assert_eq!(ENABLE_SEQUENCE[0], 0x5a00_0020);
        assert_eq!(ENABLE_SEQUENCE[1], 0x5a00_0010);
        assert_eq!(ENABLE_SEQUENCE[2], 0x5a00_0216);
        assert_eq!(DISABLE_WORD, 0x5a00_0000);
    }

    #[test]
    fn test_divisor_word() {
        assert_eq!(divisor_word(20378), 0x5a00_4f9a);
        assert_eq!(divisor_word(0x00FF_FFFF), 0x5aff_ffff);
        assert_eq!(divisor_word(0x0100_0001), 0x5a00_0001);
    }

    #[test]
    fn test_fsel_preserves_other_pins() {
        let others = 0x0924_9249 & !(FSEL_MASK << GPIO4_FSEL_SHIFT);
        let enabled = fsel_clock_output(others);
        assert_eq!(gpio4_function(enabled), FSEL_ALT0);
        assert_eq!(enabled & !(FSEL_MASK << GPIO4_FSEL_SHIFT), others);

        let disabled = fsel_input(enabled);
        assert_eq!(gpio4_function(disabled), FSEL_INPUT);
        assert_eq!(disabled, others);
    }

    #[test]
    fn test_fsel_is_idempotent() {
        let word = 0x0000_1249;
        assert_eq!(fsel_clock_output(fsel_clock_output(word)), fsel_clock_output(word));
        assert_eq!(fsel_input(fsel_input(word)), fsel_input(word));
    }
}
