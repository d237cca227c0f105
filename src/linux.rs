//! Linux `/dev/i2c-N` transport using SMBus ioctls.
//!
//! Requires the `linux` feature (on by default).

use std::path::{Path, PathBuf};

use i2cdev::core::I2CDevice;
use i2cdev::linux::LinuxI2CDevice;

use crate::bus::{register_u8, BusTransport};
use crate::error::{Error, Result};

/// Path of the character device for bus `bus_id`.
pub fn bus_path(bus_id: u32) -> PathBuf {
    PathBuf::from(format!("/dev/i2c-{bus_id}"))
}

/// SMBus transport over the Linux i2c-dev interface.
///
/// The device node is checked on [`open`](BusTransport::open); the slave
/// address is bound lazily and rebound whenever a different device address
/// is used.
#[derive(Default)]
pub struct LinuxBus {
    path: Option<PathBuf>,
    dev: Option<LinuxI2CDevice>,
    slave: Option<u8>,
}

impl std::fmt::Debug for LinuxBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinuxBus")
            .field("path", &self.path)
            .field("slave", &self.slave)
            .finish_non_exhaustive()
    }
}

impl LinuxBus {
    /// Create an unopened transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// The device node in use, once opened.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn select(&mut self, device: u8) -> Result<&mut LinuxI2CDevice> {
        let path = self
            .path
            .as_ref()
            .ok_or_else(|| Error::Transport("bus not open".into()))?;

        if self.dev.is_none() {
            let dev = LinuxI2CDevice::new(path, u16::from(device))
                .map_err(|e| transport(device, e))?;
            self.dev = Some(dev);
            self.slave = Some(device);
        } else if self.slave != Some(device) {
            if let Some(dev) = self.dev.as_mut() {
                dev.set_slave_address(u16::from(device))
                    .map_err(|e| transport(device, e))?;
            }
            self.slave = Some(device);
        }

        self.dev
            .as_mut()
            .ok_or_else(|| Error::Transport("bus not open".into()))
    }
}

fn transport(device: u8, err: impl std::fmt::Display) -> Error {
    Error::Transport(format!("device {device:#04x}: {err}"))
}

impl BusTransport for LinuxBus {
    fn open(&mut self, bus_id: u32) -> Result<()> {
        let path = bus_path(bus_id);
        std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|e| Error::Transport(format!("cannot open {}: {e}", path.display())))?;
        log::debug!("opened {}", path.display());
        self.path = Some(path);
        self.dev = None;
        self.slave = None;
        Ok(())
    }

    fn probe(&mut self, device: u8) -> Result<()> {
        self.select(device)?
            .smbus_write_quick(false)
            .map_err(|e| {
                log::debug!("quick write to {device:#04x} failed: {e}");
                Error::Nack {
                    device,
                    address: true,
                }
            })
    }

    fn read_register_byte(&mut self, device: u8, offset: u16) -> Result<u8> {
        let reg = register_u8(offset)?;
        self.select(device)?
            .smbus_read_byte_data(reg)
            .map_err(|e| transport(device, e))
    }

    fn write_register_byte(&mut self, device: u8, offset: u16, value: u8) -> Result<()> {
        let reg = register_u8(offset)?;
        self.select(device)?
            .smbus_write_byte_data(reg, value)
            .map_err(|e| transport(device, e))
    }
}
