//! Error types for the FM transmitter

use thiserror::Error;

/// Main error type for the application
#[derive(Error, Debug)]
pub enum Error {
    #[error("Hardware error: {0}")]
    Hardware(#[from] HardwareError),

    #[error("Input error: {0}")]
    Input(#[from] InputError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Couldn't start transmitter thread: {0}")]
    Thread(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Peripheral access errors
#[derive(Error, Debug)]
pub enum HardwareError {
    #[error("Can't open {path}: {source}")]
    Open {
        path: String,
        source: std::io::Error,
    },

    #[error("Can't mmap IOBASE {base:08X}: {source}")]
    Map {
        base: u64,
        source: std::io::Error,
    },

    #[error("Peripheral base {0:#x} is not page aligned")]
    UnalignedBase(u64),

    #[error("Register access is not supported on this platform")]
    Unsupported,
}

/// Sample stream errors
#[derive(Error, Debug)]
pub enum InputError {
    #[error("stdin read failed: short sample ({got} of {expected} bytes)")]
    ShortRead { got: usize, expected: usize },

    #[error("stdin read failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for the application
pub type Result<T> = std::result::Result<T, Error>;
