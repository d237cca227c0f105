//! Bus transport capability.
//!
//! The endpoint talks to hardware only through [`BusTransport`], a narrow
//! set of single-byte register transactions. Backends:
//!
//! - [`DryRunBus`] - records intended operations, never touches hardware.
//! - [`MemoryBus`] - simulated EEPROM contents, for tests and simulation.
//! - [`HalBus`](crate::hal::HalBus) - any `embedded_hal::i2c::I2c` bus
//!   (feature `embedded-hal`).
//! - [`LinuxBus`](crate::linux::LinuxBus) - `/dev/i2c-N` via SMBus ioctls
//!   (feature `linux`).

use std::time::Duration;

use crate::error::Result;

mod dry_run;
mod memory;

pub use dry_run::DryRunBus;
pub use memory::MemoryBus;

/// A single bus-level operation, as recorded by the fake transports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusOp {
    /// The bus was opened.
    Open(u32),
    /// A zero-data presence probe at a device address.
    Probe(u8),
    /// A single register read.
    Read {
        /// Device address.
        device: u8,
        /// Register offset.
        offset: u16,
    },
    /// A single register write.
    Write {
        /// Device address.
        device: u8,
        /// Register offset.
        offset: u16,
        /// Byte written.
        value: u8,
    },
    /// A post-write pause.
    Wait(Duration),
}

/// Single-byte register access to devices on one bus.
///
/// All calls block until the transaction completes or fails.
pub trait BusTransport {
    /// Open the bus session for `bus_id`.
    fn open(&mut self, bus_id: u32) -> Result<()>;

    /// Issue a zero-data transaction to check that `device` acknowledges.
    fn probe(&mut self, device: u8) -> Result<()>;

    /// Read one byte from register `offset` of `device`.
    fn read_register_byte(&mut self, device: u8, offset: u16) -> Result<u8>;

    /// Write one byte to register `offset` of `device`.
    fn write_register_byte(&mut self, device: u8, offset: u16, value: u8) -> Result<()>;

    /// Block while the device completes an internal write cycle.
    ///
    /// The default sleeps the calling thread for the full duration.
    fn write_cycle_wait(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }

    /// Whether transactions issued here can change device memory.
    ///
    /// Only a transport returning `false` may be handed the byte a range
    /// write places one past the end of its bank.
    fn reaches_hardware(&self) -> bool {
        true
    }
}

impl<T: BusTransport + ?Sized> BusTransport for &mut T {
    fn open(&mut self, bus_id: u32) -> Result<()> {
        (**self).open(bus_id)
    }

    fn probe(&mut self, device: u8) -> Result<()> {
        (**self).probe(device)
    }

    fn read_register_byte(&mut self, device: u8, offset: u16) -> Result<u8> {
        (**self).read_register_byte(device, offset)
    }

    fn write_register_byte(&mut self, device: u8, offset: u16, value: u8) -> Result<()> {
        (**self).write_register_byte(device, offset, value)
    }

    fn write_cycle_wait(&mut self, duration: Duration) {
        (**self).write_cycle_wait(duration)
    }

    fn reaches_hardware(&self) -> bool {
        (**self).reaches_hardware()
    }
}

impl<T: BusTransport + ?Sized> BusTransport for Box<T> {
    fn open(&mut self, bus_id: u32) -> Result<()> {
        (**self).open(bus_id)
    }

    fn probe(&mut self, device: u8) -> Result<()> {
        (**self).probe(device)
    }

    fn read_register_byte(&mut self, device: u8, offset: u16) -> Result<u8> {
        (**self).read_register_byte(device, offset)
    }

    fn write_register_byte(&mut self, device: u8, offset: u16, value: u8) -> Result<()> {
        (**self).write_register_byte(device, offset, value)
    }

    fn write_cycle_wait(&mut self, duration: Duration) {
        (**self).write_cycle_wait(duration)
    }

    fn reaches_hardware(&self) -> bool {
        (**self).reaches_hardware()
    }
}

/// Convert a register offset for a backend with 8-bit word addressing.
#[cfg_attr(not(any(feature = "embedded-hal", feature = "linux")), allow(dead_code))]
pub(crate) fn register_u8(offset: u16) -> Result<u8> {
    u8::try_from(offset).map_err(|_| {
        crate::error::Error::Transport(format!(
            "offset {offset:#x} exceeds 8-bit register addressing"
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_u8_accepts_byte_range() {
        assert_eq!(register_u8(0).unwrap(), 0);
        assert_eq!(register_u8(0xFF).unwrap(), 0xFF);
    }

    #[test]
    fn register_u8_rejects_wide_offset() {
        let err = register_u8(0x100).unwrap_err();
        assert!(err.is_transport());
        assert!(err.to_string().contains("0x100"));
    }

    #[test]
    fn boxed_transport_forwards() {
        let mut bus: Box<dyn BusTransport> = Box::new(MemoryBus::new().with_device(0x50, 16));
        bus.open(1).unwrap();
        bus.probe(0x50).unwrap();
        bus.write_register_byte(0x50, 3, 0xAA).unwrap();
        assert_eq!(bus.read_register_byte(0x50, 3).unwrap(), 0xAA);
        assert!(bus.reaches_hardware());
        let dry: Box<dyn BusTransport> = Box::new(DryRunBus::new());
        assert!(!dry.reaches_hardware());
    }
}
