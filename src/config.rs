//! Endpoint configuration.
//!
//! The bank table is passed to [`Endpoint::new`](crate::Endpoint::new)
//! explicitly, so several endpoints (for example one per mock transport in
//! tests) can coexist without shared state.

use std::path::PathBuf;
use std::time::Duration;

use crate::bank::BankDescriptor;
use crate::error::{Error, Result};

/// Bus the production board wires the EEPROM to.
pub const DEFAULT_BUS_ID: u32 = 1;

/// Audit log location on the production board.
pub const DEFAULT_LOG_PATH: &str = "/mnt/data/eeprom.log";

/// Minimum time the EEPROM needs to complete an internal write cycle.
pub const MIN_WRITE_CYCLE: Duration = Duration::from_millis(4);

/// Reserved data bank.
pub const BANK0: BankDescriptor = BankDescriptor::new(0x50, 256);

/// General purpose bank.
pub const BANK1: BankDescriptor = BankDescriptor::new(0x51, 256);

/// Configuration for an [`Endpoint`](crate::Endpoint).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointConfig {
    /// Identifier of the bus to open (`N` in `/dev/i2c-N`).
    pub bus_id: u32,
    /// Banks, indexed by position.
    pub banks: Vec<BankDescriptor>,
    /// File the audit log is appended to.
    pub log_path: PathBuf,
    /// Pause after every single-byte write.
    pub write_cycle: Duration,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            bus_id: DEFAULT_BUS_ID,
            banks: vec![BANK0, BANK1],
            log_path: PathBuf::from(DEFAULT_LOG_PATH),
            write_cycle: MIN_WRITE_CYCLE,
        }
    }
}

impl EndpointConfig {
    /// Set the bus identifier.
    pub fn with_bus_id(mut self, bus_id: u32) -> Self {
        self.bus_id = bus_id;
        self
    }

    /// Replace the bank table.
    pub fn with_banks(mut self, banks: Vec<BankDescriptor>) -> Self {
        self.banks = banks;
        self
    }

    /// Set the audit log path.
    pub fn with_log_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_path = path.into();
        self
    }

    /// Set the post-write pause. Values below [`MIN_WRITE_CYCLE`] are
    /// rejected by [`validate`](Self::validate).
    pub fn with_write_cycle(mut self, write_cycle: Duration) -> Self {
        self.write_cycle = write_cycle;
        self
    }

    /// Check the configuration for internal consistency.
    pub fn validate(&self) -> Result<()> {
        if self.banks.is_empty() {
            return Err(Error::InvalidArgument("at least one bank is required"));
        }
        for bank in &self.banks {
            if bank.size() == 0 {
                return Err(Error::InvalidArgument("bank size must be at least 1"));
            }
            if bank.device_address() > 0x7F {
                return Err(Error::InvalidArgument(
                    "I2C address must be 7-bit (0x00-0x7F)",
                ));
            }
        }
        if self.write_cycle < MIN_WRITE_CYCLE {
            return Err(Error::InvalidArgument(
                "write cycle must be at least 4 ms",
            ));
        }
        Ok(())
    }
}
