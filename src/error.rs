//! Error types for the eeprom-access crate.

/// The error type for EEPROM endpoint operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The bank index does not exist, or the requested address range falls
    /// outside the bank.
    ///
    /// `size` is `None` when the bank index itself is invalid.
    #[error(
        "out of bounds: bank {bank}, address {address:#x}, length {length} (bank size {})",
        display_size(.size)
    )]
    OutOfBounds {
        /// The requested bank index.
        bank: usize,
        /// The requested start address.
        address: usize,
        /// The requested length in bytes (1 for single-byte access).
        length: usize,
        /// The size of the resolved bank, if the bank exists.
        size: Option<usize>,
    },

    /// An operation was issued before `connect()` succeeded.
    #[error("endpoint is not connected")]
    NotConnected,

    /// A device did not acknowledge a transaction.
    ///
    /// `address` is `true` when the device address itself went
    /// unacknowledged (no device answering), and `false` for a data byte.
    #[error("I2C NACK: device {device:#04x} did not acknowledge {}", nack_stage(.address))]
    Nack {
        /// The 7-bit device address the transaction targeted.
        device: u8,
        /// Whether the address phase was refused.
        address: bool,
    },

    /// The bus could not be opened or a byte transaction failed.
    #[error("bus transport error: {0}")]
    Transport(String),

    /// The audit log store could not be opened or written.
    #[error("log store error: {0}")]
    LogStore(#[source] std::io::Error),

    /// A range write was given fewer payload bytes than the requested length.
    #[error("payload too short: expected {expected} bytes, got {actual}")]
    ShortPayload {
        /// The requested write length.
        expected: usize,
        /// The number of bytes actually supplied.
        actual: usize,
    },

    /// Invalid argument(s) were provided.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// A hex string could not be decoded.
    #[error("invalid hex: {0}")]
    InvalidHex(String),
}

impl Error {
    /// Returns `true` for errors raised by the bus transport, NACKs included.
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport(_) | Error::Nack { .. })
    }
}

fn display_size(size: &Option<usize>) -> String {
    match size {
        Some(s) => s.to_string(),
        None => "n/a".to_string(),
    }
}

fn nack_stage(address: &bool) -> &'static str {
    if *address {
        "its address"
    } else {
        "a data byte"
    }
}

/// A specialized `Result` type for EEPROM endpoint operations.
pub type Result<T> = std::result::Result<T, Error>;
