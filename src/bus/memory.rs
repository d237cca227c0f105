//! In-memory EEPROM simulation.

use std::collections::BTreeMap;
use std::time::Duration;

use super::{BusOp, BusTransport};
use crate::error::{Error, Result};

/// Value of an erased EEPROM cell.
const ERASED: u8 = 0xFF;

/// A transport backed by in-memory device contents.
///
/// Each registered device holds a fixed number of bytes, initially erased
/// (`0xFF`), that persist across reads and writes. Unknown device addresses
/// do not acknowledge. Write-cycle pauses are recorded but not slept.
///
/// Faults can be injected to exercise error paths:
///
/// ```
/// use eeprom_access::bus::{BusTransport, MemoryBus};
///
/// let mut bus = MemoryBus::new().with_device(0x50, 256).fail_after(2);
/// bus.open(1)?;
/// bus.write_register_byte(0x50, 0, 1)?;
/// bus.write_register_byte(0x50, 1, 2)?;
/// assert!(bus.write_register_byte(0x50, 2, 3).is_err());
/// # Ok::<(), eeprom_access::Error>(())
/// ```
#[derive(Debug, Default, Clone)]
pub struct MemoryBus {
    devices: BTreeMap<u8, Vec<u8>>,
    open_bus: Option<u32>,
    fail_open: bool,
    fail_after: Option<usize>,
    transactions: usize,
    ops: Vec<BusOp>,
}

impl MemoryBus {
    /// Create a bus with no devices.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach an erased device of `size` bytes at `device`.
    pub fn with_device(mut self, device: u8, size: usize) -> Self {
        self.devices.insert(device, vec![ERASED; size]);
        self
    }

    /// Make [`open`](BusTransport::open) fail.
    pub fn failing_open(mut self) -> Self {
        self.fail_open = true;
        self
    }

    /// Fail every byte transaction after the first `n` succeed.
    pub fn fail_after(mut self, n: usize) -> Self {
        self.fail_after = Some(n);
        self
    }

    /// Contents of a device, if attached.
    pub fn contents(&self, device: u8) -> Option<&[u8]> {
        self.devices.get(&device).map(Vec::as_slice)
    }

    /// Mutable contents of a device, for seeding test data.
    pub fn contents_mut(&mut self, device: u8) -> Option<&mut [u8]> {
        self.devices.get_mut(&device).map(Vec::as_mut_slice)
    }

    /// The bus identifier passed to `open`, if it succeeded.
    pub fn open_bus(&self) -> Option<u32> {
        self.open_bus
    }

    /// All operations recorded so far, in issue order.
    pub fn ops(&self) -> &[BusOp] {
        &self.ops
    }

    /// Number of register reads and writes issued.
    pub fn transactions(&self) -> usize {
        self.transactions
    }

    fn begin_transaction(&mut self) -> Result<()> {
        if self.open_bus.is_none() {
            return Err(Error::Transport("bus not open".into()));
        }
        if self.fail_after.is_some_and(|n| self.transactions >= n) {
            return Err(Error::Transport("injected transaction failure".into()));
        }
        self.transactions += 1;
        Ok(())
    }

    fn cell(&mut self, device: u8, offset: u16) -> Result<&mut u8> {
        let mem = self
            .devices
            .get_mut(&device)
            .ok_or(Error::Nack {
                device,
                address: true,
            })?;
        mem.get_mut(offset as usize).ok_or_else(|| {
            Error::Transport(format!(
                "offset {offset:#x} beyond device {device:#x} capacity"
            ))
        })
    }
}

impl BusTransport for MemoryBus {
    fn open(&mut self, bus_id: u32) -> Result<()> {
        self.ops.push(BusOp::Open(bus_id));
        if self.fail_open {
            return Err(Error::Transport(format!("cannot open bus {bus_id}")));
        }
        self.open_bus = Some(bus_id);
        Ok(())
    }

    fn probe(&mut self, device: u8) -> Result<()> {
        self.ops.push(BusOp::Probe(device));
        if self.open_bus.is_none() {
            return Err(Error::Transport("bus not open".into()));
        }
        if !self.devices.contains_key(&device) {
            return Err(Error::Nack {
                device,
                address: true,
            });
        }
        Ok(())
    }

    fn read_register_byte(&mut self, device: u8, offset: u16) -> Result<u8> {
        self.ops.push(BusOp::Read { device, offset });
        self.begin_transaction()?;
        Ok(*self.cell(device, offset)?)
    }

    fn write_register_byte(&mut self, device: u8, offset: u16, value: u8) -> Result<()> {
        self.ops.push(BusOp::Write {
            device,
            offset,
            value,
        });
        self.begin_transaction()?;
        *self.cell(device, offset)? = value;
        Ok(())
    }

    fn write_cycle_wait(&mut self, duration: Duration) {
        self.ops.push(BusOp::Wait(duration));
    }
}
