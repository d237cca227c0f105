//! `embedded-hal` 1.0 bus adapter.
//!
//! [`HalBus`] lets the endpoint drive an EEPROM through any type that
//! implements `embedded_hal::i2c::I2c`. Enable the `embedded-hal` feature in
//! your `Cargo.toml` (it is on by default).
//!
//! # Transaction mapping
//!
//! | Transport call | I2C traffic |
//! |----------------|-------------|
//! | `probe` | START, address+W, STOP (empty write) |
//! | `read_register_byte` | write `[offset]`, repeated START, read 1 byte |
//! | `write_register_byte` | write `[offset, value]` |
//!
//! Offsets above `0xFF` are rejected: this adapter speaks the single-byte
//! word address used by 24C01/24C02-class parts.

use embedded_hal::i2c::{Error as _, ErrorKind, I2c, NoAcknowledgeSource};

use crate::bus::{register_u8, BusTransport};
use crate::error::{Error, Result};

// ---- Error conversion ----

/// Embedded-hal error kind mapping for endpoint errors.
impl embedded_hal::i2c::Error for Error {
    fn kind(&self) -> ErrorKind {
        match self {
            Error::Nack { address: true, .. } => {
                ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address)
            }
            Error::Nack { address: false, .. } => {
                ErrorKind::NoAcknowledge(NoAcknowledgeSource::Data)
            }
            _ => ErrorKind::Other,
        }
    }
}

/// Convert a bus error kind for a transaction addressed to `device`.
///
/// A NACK of unknown source is reported as a data NACK.
fn bus_error(device: u8, kind: ErrorKind) -> Error {
    match kind {
        ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address) => Error::Nack {
            device,
            address: true,
        },
        ErrorKind::NoAcknowledge(_) => Error::Nack {
            device,
            address: false,
        },
        ErrorKind::ArbitrationLoss => Error::Transport("I2C arbitration lost".into()),
        ErrorKind::Bus => Error::Transport("I2C bus error".into()),
        ErrorKind::Overrun => Error::Transport("I2C overrun".into()),
        other => Error::Transport(format!("I2C error: {other:?}")),
    }
}

/// Wrapper that implements [`BusTransport`] for an `embedded_hal::i2c::I2c`
/// bus.
///
/// The wrapped bus is already open when handed over, so
/// [`open`](BusTransport::open) only records the bus identifier.
///
/// # Example
///
/// ```no_run
/// # fn demo<I: embedded_hal::i2c::I2c>(i2c: I) -> eeprom_access::Result<()> {
/// use eeprom_access::hal::HalBus;
/// use eeprom_access::{Endpoint, EndpointConfig};
///
/// let mut ep = Endpoint::new(EndpointConfig::default(), HalBus::new(i2c))?;
/// ep.connect()?;
/// let data = ep.read_bytes(1, 0, 16)?;
/// # Ok(())
/// # }
/// ```
pub struct HalBus<I2C> {
    i2c: I2C,
    bus_id: Option<u32>,
}

impl<I2C: I2c> HalBus<I2C> {
    /// Wrap an I2C bus.
    pub fn new(i2c: I2C) -> Self {
        Self { i2c, bus_id: None }
    }

    /// Get a reference to the underlying bus.
    pub fn inner(&self) -> &I2C {
        &self.i2c
    }

    /// Get a mutable reference to the underlying bus.
    pub fn inner_mut(&mut self) -> &mut I2C {
        &mut self.i2c
    }

    /// Decompose into the underlying bus.
    pub fn into_inner(self) -> I2C {
        self.i2c
    }

    /// The identifier recorded by `open`, if any.
    pub fn bus_id(&self) -> Option<u32> {
        self.bus_id
    }
}

impl<I2C: I2c> BusTransport for HalBus<I2C> {
    fn open(&mut self, bus_id: u32) -> Result<()> {
        self.bus_id = Some(bus_id);
        Ok(())
    }

    fn probe(&mut self, device: u8) -> Result<()> {
        self.i2c
            .write(device, &[])
            .map_err(|e| bus_error(device, e.kind()))
    }

    fn read_register_byte(&mut self, device: u8, offset: u16) -> Result<u8> {
        let reg = register_u8(offset)?;
        let mut buf = [0u8; 1];
        self.i2c
            .write_read(device, &[reg], &mut buf)
            .map_err(|e| bus_error(device, e.kind()))?;
        Ok(buf[0])
    }

    fn write_register_byte(&mut self, device: u8, offset: u16, value: u8) -> Result<()> {
        let reg = register_u8(offset)?;
        self.i2c
            .write(device, &[reg, value])
            .map_err(|e| bus_error(device, e.kind()))
    }
}
