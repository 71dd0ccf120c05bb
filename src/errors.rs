use std::io;
use thiserror::Error;

/// Errors surfaced by bus handles and the bus registry
#[derive(Error, Debug)]
pub enum BusError {
    #[error("Failed to open I2C bus {bus} at '{path}': {source}")]
    Open {
        bus: u8,
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("I2C bus {bus}: failed to select slave address {address:#04x}: {source}")]
    AddressSet {
        bus: u8,
        address: u8,
        #[source]
        source: io::Error,
    },

    #[error("I2C bus {bus}: unexpected number ({actual}) of bytes {op} at {address:#04x}, expected {expected}")]
    ShortTransfer {
        bus: u8,
        address: u8,
        op: TransferOp,
        expected: usize,
        actual: usize,
    },

    #[error("I2C bus {bus}: combined transfer to {address:#04x} failed: {source}")]
    Transfer {
        bus: u8,
        address: u8,
        #[source]
        source: io::Error,
    },

    #[error("I2C bus {bus}: raw I/O with {address:#04x} failed: {source}")]
    Io {
        bus: u8,
        address: u8,
        #[source]
        source: io::Error,
    },

    #[error("Failed to close I2C bus {bus}: {source}")]
    Close {
        bus: u8,
        #[source]
        source: io::Error,
    },

    #[error("I2C bus {bus} has been closed")]
    Closed { bus: u8 },

    #[error("Invalid 7-bit slave address {0:#04x}")]
    InvalidAddress(u8),

    #[error("I2C message of {len} bytes exceeds the kernel limit of {max}", max = u16::MAX)]
    MessageTooLong { len: usize },

    #[error("I2C read of zero bytes requested")]
    EmptyTransfer,

    #[error("I2C not supported on this platform: {0}")]
    Unsupported(String),
}

/// Direction of a raw transfer, used in short-transfer reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferOp {
    Read,
    Write,
}

impl std::fmt::Display for TransferOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransferOp::Read => f.write_str("read"),
            TransferOp::Write => f.write_str("written"),
        }
    }
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration from '{path}': {source}")]
    LoadError {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("Invalid configuration format: {0}")]
    FormatError(#[from] toml::de::Error),

    #[error("Invalid configuration value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Result type aliases for convenience
pub type BusResult<T> = Result<T, BusError>;
pub type ConfigResult<T> = Result<T, ConfigError>;
