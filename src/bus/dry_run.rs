//! Transport used for test runs: nothing reaches the hardware.

use std::time::Duration;

use super::{BusOp, BusTransport};
use crate::error::Result;

/// A transport that accepts every operation and performs none of them.
///
/// Reads return `0x00`, writes are dropped, and write-cycle pauses return
/// immediately. Every intended operation is recorded so callers can report
/// what a real run would have done.
#[derive(Debug, Default, Clone)]
pub struct DryRunBus {
    ops: Vec<BusOp>,
}

impl DryRunBus {
    /// Create an empty dry-run transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// All operations recorded so far, in issue order.
    pub fn ops(&self) -> &[BusOp] {
        &self.ops
    }

    /// Number of register writes that would have been issued.
    pub fn intended_writes(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, BusOp::Write { .. }))
            .count()
    }

    /// Forget the recorded operations.
    pub fn clear(&mut self) {
        self.ops.clear();
    }
}

impl BusTransport for DryRunBus {
    fn open(&mut self, bus_id: u32) -> Result<()> {
        log::debug!("dry run: open bus {bus_id}");
        self.ops.push(BusOp::Open(bus_id));
        Ok(())
    }

    fn probe(&mut self, device: u8) -> Result<()> {
        self.ops.push(BusOp::Probe(device));
        Ok(())
    }

    fn read_register_byte(&mut self, device: u8, offset: u16) -> Result<u8> {
        self.ops.push(BusOp::Read { device, offset });
        Ok(0x00)
    }

    fn write_register_byte(&mut self, device: u8, offset: u16, value: u8) -> Result<()> {
        self.ops.push(BusOp::Write {
            device,
            offset,
            value,
        });
        Ok(())
    }

    fn write_cycle_wait(&mut self, _duration: Duration) {}

    fn reaches_hardware(&self) -> bool {
        false
    }
}
