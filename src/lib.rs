//! Bounds-checked, audited byte access to banked I2C EEPROMs.
//!
//! An [`Endpoint`] owns a bus transport and a fixed table of EEPROM banks.
//! Every access is validated against the bank it targets before any bus
//! traffic happens, multi-byte writes respect the part's write-cycle time,
//! and every completed range operation is recorded in an append-only audit
//! log.
//!
//! # Quick Start
//!
//! ```no_run
//! use eeprom_access::linux::LinuxBus;
//! use eeprom_access::{Endpoint, EndpointConfig};
//!
//! // Bus 1, banks 0x50 and 0x51, log in /mnt/data/eeprom.log
//! let mut ep = Endpoint::new(EndpointConfig::default(), LinuxBus::new())?;
//! ep.connect()?;
//! ep.write_bytes(1, 0x10, b"hello", 5)?;
//! let back = ep.read_bytes(1, 0x10, 5)?;
//! ep.write_log_entries()?;
//! # Ok::<(), eeprom_access::Error>(())
//! ```
//!
//! # Features
//!
//! - **Banks**: statically declared [`BankDescriptor`]s addressed by index.
//! - **Transports**: anything implementing [`bus::BusTransport`]; a
//!   dry-run recorder and an in-memory simulator are always available.
//! - **`embedded-hal`**: drive any `embedded_hal::i2c::I2c` bus
//!   ([`hal::HalBus`]).
//! - **`linux`**: `/dev/i2c-N` via SMBus ([`linux::LinuxBus`]).
//! - **`cli`**: the `eeprom-access` command-line tool.
//! - **Audit log**: one stable, human-readable line per range operation
//!   ([`audit`]).

pub mod audit;
pub mod bank;
pub mod bus;
pub mod config;
pub mod endpoint;
pub mod error;
#[cfg(feature = "embedded-hal")]
pub mod hal;
pub mod hex;
#[cfg(feature = "linux")]
pub mod linux;

// ---- Convenience re-exports ----

pub use audit::{Action, AuditEntry, AuditLog};
pub use bank::BankDescriptor;
pub use bus::{BusTransport, DryRunBus, MemoryBus};
pub use config::EndpointConfig;
pub use endpoint::Endpoint;
pub use error::{Error, Result};
