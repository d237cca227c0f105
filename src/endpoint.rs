//! The EEPROM endpoint: bounds-checked byte and range access plus auditing.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::audit::{AuditEntry, AuditLog};
use crate::bank::BankDescriptor;
use crate::bus::BusTransport;
use crate::config::EndpointConfig;
use crate::error::{Error, Result};

/// A banked EEPROM reachable over one bus.
///
/// The endpoint owns its transport and its bank table. It starts out
/// unconnected; [`connect`](Self::connect) opens the bus and probes bank 0,
/// after which reads and writes are accepted.
///
/// Range operations ([`read_bytes`](Self::read_bytes),
/// [`write_bytes`](Self::write_bytes)) each append one [`AuditEntry`] to an
/// in-memory log, which [`write_log_entries`](Self::write_log_entries)
/// appends to the configured file.
///
/// ```
/// use eeprom_access::bus::MemoryBus;
/// use eeprom_access::{Endpoint, EndpointConfig};
///
/// let bus = MemoryBus::new().with_device(0x50, 256).with_device(0x51, 256);
/// let mut ep = Endpoint::new(EndpointConfig::default(), bus)?;
/// ep.connect()?;
/// ep.write_bytes(1, 10, &[0xDE, 0xAD, 0xBE, 0xEF], 4)?;
/// assert_eq!(ep.read_bytes(1, 10, 4)?, [0xDE, 0xAD, 0xBE, 0xEF]);
/// assert_eq!(ep.log_entries().len(), 2);
/// # Ok::<(), eeprom_access::Error>(())
/// ```
///
/// # Partial writes
///
/// A transport failure in the middle of [`write_bytes`](Self::write_bytes)
/// leaves the bytes before the failing offset written. The error is returned
/// as-is and no audit entry is recorded for the aborted range.
pub struct Endpoint<B> {
    bus_id: u32,
    banks: Vec<BankDescriptor>,
    log_path: PathBuf,
    write_cycle: Duration,
    transport: B,
    connected: bool,
    log: AuditLog,
}

impl<B> std::fmt::Debug for Endpoint<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Endpoint")
            .field("bus_id", &self.bus_id)
            .field("banks", &self.banks)
            .field("log_path", &self.log_path)
            .field("connected", &self.connected)
            .field("log_entries", &self.log.len())
            .finish_non_exhaustive()
    }
}

impl<B: BusTransport> Endpoint<B> {
    /// Create an unconnected endpoint.
    ///
    /// Fails with [`Error::InvalidArgument`] if the configuration does not
    /// validate.
    pub fn new(config: EndpointConfig, transport: B) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            bus_id: config.bus_id,
            banks: config.banks,
            log_path: config.log_path,
            write_cycle: config.write_cycle,
            transport,
            connected: false,
            log: AuditLog::new(),
        })
    }

    /// Open the bus and probe the device behind bank 0.
    ///
    /// Transport errors are returned unchanged; the endpoint stays
    /// unconnected in that case.
    pub fn connect(&mut self) -> Result<()> {
        log::debug!("connecting to I2C bus {}", self.bus_id);
        self.transport.open(self.bus_id)?;
        let probe_addr = self.banks[0].device_address();
        self.transport.probe(probe_addr)?;
        self.connected = true;
        log::info!(
            "connected to I2C bus {} (device {probe_addr:#04x} present)",
            self.bus_id
        );
        Ok(())
    }

    /// Read one byte at `address` of `bank`.
    ///
    /// Not audited on its own.
    pub fn read_byte(&mut self, bank: usize, address: usize) -> Result<u8> {
        self.ensure_connected()?;
        let desc = self.checked_byte(bank, address)?;
        log::trace!("reading bank {bank} addr {address}");
        self.transport
            .read_register_byte(desc.device_address(), offset(address)?)
    }

    /// Write `value` at `address` of `bank`.
    ///
    /// Not audited on its own, and does not wait for the write cycle.
    pub fn write_byte(&mut self, value: u8, bank: usize, address: usize) -> Result<()> {
        self.ensure_connected()?;
        let desc = self.checked_byte(bank, address)?;
        self.raw_write(desc, address, value)
    }

    /// Read `length` consecutive bytes starting at `start`.
    ///
    /// The whole range must lie inside the bank. On success one READ entry
    /// is appended to the audit log.
    pub fn read_bytes(&mut self, bank: usize, start: usize, length: usize) -> Result<Vec<u8>> {
        self.ensure_connected()?;
        let desc = self.resolve(bank, start, length)?;
        if !desc.contains_range(start, length) {
            return Err(out_of_bounds(bank, start, length, Some(desc.size())));
        }

        let mut buf = Vec::with_capacity(length);
        for address in start..start + length {
            buf.push(self.read_byte(bank, address)?);
        }

        self.add_log_entry(AuditEntry::read(
            self.bus_id,
            desc.device_address(),
            start,
            length,
        ));
        Ok(buf)
    }

    /// Write the first `length` bytes of `data` starting at `start`.
    ///
    /// The range check accepts a last byte landing exactly on the bank
    /// size. On a transport that [reaches hardware](BusTransport::reaches_hardware)
    /// every byte is also checked against the bank before it is sent, so
    /// such a range fails with [`Error::OutOfBounds`] for that single byte
    /// after the bytes before it were written. Dry runs accept it.
    ///
    /// After every byte the transport is told to wait for the configured
    /// write cycle before the next byte is issued. On success one WRITE
    /// entry carrying the payload is appended to the audit log.
    pub fn write_bytes(
        &mut self,
        bank: usize,
        start: usize,
        data: &[u8],
        length: usize,
    ) -> Result<()> {
        self.ensure_connected()?;
        let desc = self.resolve(bank, start, length)?;
        if !desc.accepts_write_range(start, length) {
            return Err(out_of_bounds(bank, start, length, Some(desc.size())));
        }
        if data.len() < length {
            return Err(Error::ShortPayload {
                expected: length,
                actual: data.len(),
            });
        }

        let payload = &data[..length];
        for (address, &value) in (start..).zip(payload) {
            if !desc.contains(address) && self.transport.reaches_hardware() {
                return Err(out_of_bounds(bank, address, 1, Some(desc.size())));
            }
            self.raw_write(desc, address, value)?;
            self.transport.write_cycle_wait(self.write_cycle);
        }

        self.add_log_entry(AuditEntry::write(
            self.bus_id,
            desc.device_address(),
            start,
            length,
            payload.to_vec(),
        ));
        Ok(())
    }

    /// Append an entry to the session log.
    pub fn add_log_entry(&mut self, entry: AuditEntry) {
        log::debug!("audit: {entry}");
        self.log.push(entry);
    }

    /// Discard all accumulated entries.
    pub fn clear_log_entries(&mut self) {
        self.log.clear();
    }

    /// Append entries not yet written to the configured log file.
    ///
    /// Returns the number of lines written.
    pub fn write_log_entries(&mut self) -> Result<usize> {
        self.log.append_to_file(&self.log_path)
    }

    /// Write entries not yet written to an arbitrary sink.
    pub fn write_log_entries_to<W: Write>(&mut self, out: &mut W) -> Result<usize> {
        self.log.write_to(out)
    }

    fn raw_write(&mut self, desc: BankDescriptor, address: usize, value: u8) -> Result<()> {
        log::trace!(
            "writing {value:#04x} to device {:#04x} addr {address}",
            desc.device_address()
        );
        self.transport
            .write_register_byte(desc.device_address(), offset(address)?, value)
    }

    fn ensure_connected(&self) -> Result<()> {
        if self.connected {
            Ok(())
        } else {
            Err(Error::NotConnected)
        }
    }

    fn resolve(&self, bank: usize, address: usize, length: usize) -> Result<BankDescriptor> {
        self.banks
            .get(bank)
            .copied()
            .ok_or_else(|| out_of_bounds(bank, address, length, None))
    }

    fn checked_byte(&self, bank: usize, address: usize) -> Result<BankDescriptor> {
        let desc = self.resolve(bank, address, 1)?;
        if !desc.contains(address) {
            return Err(out_of_bounds(bank, address, 1, Some(desc.size())));
        }
        Ok(desc)
    }
}

impl<B> Endpoint<B> {
    /// The bus identifier.
    pub fn bus_id(&self) -> u32 {
        self.bus_id
    }

    /// The bank table, indexed by bank number.
    pub fn banks(&self) -> &[BankDescriptor] {
        &self.banks
    }

    /// Look up a bank by index.
    pub fn bank(&self, index: usize) -> Option<&BankDescriptor> {
        self.banks.get(index)
    }

    /// Path the audit log is appended to.
    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    /// Whether [`connect`](Endpoint::connect) has succeeded.
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// All audit entries of this session, in order.
    pub fn log_entries(&self) -> &[AuditEntry] {
        self.log.entries()
    }

    /// The underlying transport.
    pub fn transport(&self) -> &B {
        &self.transport
    }

    /// Mutable access to the underlying transport.
    pub fn transport_mut(&mut self) -> &mut B {
        &mut self.transport
    }

    /// Consume the endpoint, returning the transport.
    pub fn into_transport(self) -> B {
        self.transport
    }
}

fn out_of_bounds(bank: usize, address: usize, length: usize, size: Option<usize>) -> Error {
    log::warn!("rejected access: bank {bank} addr {address} len {length}");
    Error::OutOfBounds {
        bank,
        address,
        length,
        size,
    }
}

fn offset(address: usize) -> Result<u16> {
    u16::try_from(address).map_err(|_| {
        Error::Transport(format!("address {address:#x} exceeds 16-bit offset range"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::Action;
    use crate::bus::{BusOp, DryRunBus, MemoryBus};
    use std::time::Instant;

    fn board_bus() -> MemoryBus {
        MemoryBus::new().with_device(0x50, 256).with_device(0x51, 256)
    }

    fn connected(bus: MemoryBus) -> Endpoint<MemoryBus> {
        let mut ep = Endpoint::new(EndpointConfig::default(), bus).unwrap();
        ep.connect().unwrap();
        ep
    }

    fn dry_run() -> Endpoint<DryRunBus> {
        let mut ep = Endpoint::new(EndpointConfig::default(), DryRunBus::new()).unwrap();
        ep.connect().unwrap();
        ep
    }

    fn byte_ops(ops: &[BusOp]) -> usize {
        ops.iter()
            .filter(|op| matches!(op, BusOp::Read { .. } | BusOp::Write { .. }))
            .count()
    }

    #[test]
    fn connect_opens_bus_and_probes_bank0() {
        let ep = connected(board_bus());
        assert!(ep.is_connected());
        assert_eq!(
            ep.transport().ops(),
            &[BusOp::Open(1), BusOp::Probe(0x50)]
        );
    }

    #[test]
    fn connect_fails_when_bus_cannot_open() {
        let bus = board_bus().failing_open();
        let mut ep = Endpoint::new(EndpointConfig::default(), bus).unwrap();
        assert!(ep.connect().unwrap_err().is_transport());
        assert!(!ep.is_connected());
    }

    #[test]
    fn connect_fails_when_probe_nacks() {
        let bus = MemoryBus::new().with_device(0x51, 256);
        let mut ep = Endpoint::new(EndpointConfig::default(), bus).unwrap();
        assert!(matches!(ep.connect(), Err(Error::Nack { device: 0x50, address: true })));
        assert!(!ep.is_connected());
    }

    #[test]
    fn operations_require_connection() {
        let mut ep = Endpoint::new(EndpointConfig::default(), board_bus()).unwrap();
        assert!(matches!(ep.read_byte(0, 0), Err(Error::NotConnected)));
        assert!(matches!(ep.write_byte(1, 0, 0), Err(Error::NotConnected)));
        assert!(matches!(ep.read_bytes(0, 0, 1), Err(Error::NotConnected)));
        assert!(matches!(
            ep.write_bytes(0, 0, &[1], 1),
            Err(Error::NotConnected)
        ));
        assert!(ep.transport().ops().is_empty());
        assert!(ep.log_entries().is_empty());
    }

    #[test]
    fn byte_access_out_of_bounds_makes_no_transport_call() {
        let mut ep = connected(board_bus());
        let before = ep.transport().ops().len();

        match ep.read_byte(0, 256) {
            Err(Error::OutOfBounds {
                bank: 0,
                address: 256,
                length: 1,
                size: Some(256),
            }) => {}
            other => panic!("expected OutOfBounds, got {:?}", other),
        }
        assert!(matches!(
            ep.write_byte(0xAA, 1, 300),
            Err(Error::OutOfBounds { .. })
        ));
        assert!(matches!(
            ep.read_byte(2, 0),
            Err(Error::OutOfBounds { size: None, .. })
        ));
        assert_eq!(ep.transport().ops().len(), before);
    }

    #[test]
    fn byte_access_is_not_audited() {
        let mut ep = connected(board_bus());
        ep.write_byte(0x11, 1, 0).unwrap();
        assert_eq!(ep.read_byte(1, 0).unwrap(), 0x11);
        assert!(ep.log_entries().is_empty());
    }

    #[test]
    fn scenario_a_write_then_read_back() {
        let mut ep = connected(board_bus());
        ep.write_bytes(1, 10, &[0xDE, 0xAD, 0xBE, 0xEF], 4).unwrap();

        let entry = &ep.log_entries()[0];
        assert_eq!(entry.action, Action::Write);
        assert_eq!(entry.device_address, 0x51);
        assert_eq!(entry.offset, 10);
        assert_eq!(entry.length, 4);
        assert!(entry.to_string().contains("Offset: 0xa Length: 4 Content: deadbeef"));

        assert_eq!(ep.read_bytes(1, 10, 4).unwrap(), [0xDE, 0xAD, 0xBE, 0xEF]);
        assert_eq!(ep.log_entries().len(), 2);
        assert_eq!(ep.log_entries()[1].action, Action::Read);
        assert_eq!(ep.log_entries()[1].content, None);
    }

    #[test]
    fn scenario_b_read_past_end_rejected() {
        let mut ep = connected(board_bus());
        let before = ep.transport().ops().len();
        assert!(matches!(
            ep.read_bytes(0, 250, 10),
            Err(Error::OutOfBounds {
                bank: 0,
                address: 250,
                length: 10,
                size: Some(256)
            })
        ));
        assert_eq!(ep.transport().ops().len(), before);
        assert!(ep.log_entries().is_empty());
    }

    #[test]
    fn scenario_c_full_bank_write() {
        let mut ep = connected(board_bus());
        let data: Vec<u8> = (0..=255).collect();
        ep.write_bytes(0, 0, &data, 256).unwrap();
        assert_eq!(ep.transport().contents(0x50).unwrap(), data.as_slice());
        assert_eq!(ep.log_entries().len(), 1);
    }

    #[test]
    fn read_range_boundaries() {
        let mut ep = connected(board_bus());
        assert_eq!(ep.read_bytes(1, 246, 10).unwrap().len(), 10);
        assert!(matches!(
            ep.read_bytes(1, 247, 10),
            Err(Error::OutOfBounds { .. })
        ));
        assert!(matches!(
            ep.read_bytes(1, 0, 0),
            Err(Error::OutOfBounds { .. })
        ));
    }

    #[test]
    fn write_range_one_past_end_accepted_in_dry_run() {
        let mut ep = dry_run();
        let data = [0x5A; 10];
        ep.write_bytes(1, 247, &data, 10).unwrap();
        assert_eq!(ep.transport().intended_writes(), 10);
        assert_eq!(ep.log_entries().len(), 1);

        assert!(matches!(
            ep.write_bytes(1, 248, &data, 10),
            Err(Error::OutOfBounds { .. })
        ));
    }

    #[test]
    fn write_range_one_past_end_stops_at_bank_edge_on_device() {
        // The chip behind bank 1 is larger than the bank declares.
        let bus = MemoryBus::new().with_device(0x50, 256).with_device(0x51, 512);
        let mut ep = connected(bus);
        let data = [0x5A; 10];

        match ep.write_bytes(1, 247, &data, 10) {
            Err(Error::OutOfBounds {
                bank: 1,
                address: 256,
                length: 1,
                size: Some(256),
            }) => {}
            other => panic!("expected OutOfBounds at 256, got {:?}", other),
        }
        assert!(!ep
            .transport()
            .ops()
            .iter()
            .any(|op| matches!(op, BusOp::Write { offset: 256, .. })));
        let cells = ep.transport().contents(0x51).unwrap();
        assert_eq!(&cells[247..256], &[0x5A; 9]);
        assert_eq!(cells[256], 0xFF);
        assert!(ep.log_entries().is_empty());
    }

    #[test]
    fn write_waits_after_every_byte() {
        let mut ep = connected(board_bus());
        ep.write_bytes(1, 0, &[1, 2, 3], 3).unwrap();

        let ops: Vec<BusOp> = ep.transport().ops()[2..].to_vec();
        let wait = BusOp::Wait(Duration::from_millis(4));
        assert_eq!(
            ops,
            [
                BusOp::Write { device: 0x51, offset: 0, value: 1 },
                wait,
                BusOp::Write { device: 0x51, offset: 1, value: 2 },
                wait,
                BusOp::Write { device: 0x51, offset: 2, value: 3 },
                wait,
            ]
        );
    }

    #[test]
    fn write_uses_configured_cycle() {
        let config = EndpointConfig::default().with_write_cycle(Duration::from_millis(10));
        let mut ep = Endpoint::new(config, board_bus()).unwrap();
        ep.connect().unwrap();
        ep.write_bytes(1, 0, &[1], 1).unwrap();
        assert_eq!(
            ep.transport().ops().last(),
            Some(&BusOp::Wait(Duration::from_millis(10)))
        );
    }

    /// Transport that keeps the default, sleeping write-cycle wait.
    struct SleepingBus(MemoryBus);

    impl BusTransport for SleepingBus {
        fn open(&mut self, bus_id: u32) -> Result<()> {
            self.0.open(bus_id)
        }

        fn probe(&mut self, device: u8) -> Result<()> {
            self.0.probe(device)
        }

        fn read_register_byte(&mut self, device: u8, offset: u16) -> Result<u8> {
            self.0.read_register_byte(device, offset)
        }

        fn write_register_byte(&mut self, device: u8, offset: u16, value: u8) -> Result<()> {
            self.0.write_register_byte(device, offset, value)
        }
    }

    #[test]
    fn default_write_cycle_blocks_for_minimum_delay() {
        let mut ep = Endpoint::new(EndpointConfig::default(), SleepingBus(board_bus())).unwrap();
        ep.connect().unwrap();
        let start = Instant::now();
        ep.write_bytes(1, 0, &[0; 5], 5).unwrap();
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn short_payload_rejected_before_any_write() {
        let mut ep = connected(board_bus());
        let before = ep.transport().ops().len();
        assert!(matches!(
            ep.write_bytes(1, 0, &[1, 2], 3),
            Err(Error::ShortPayload {
                expected: 3,
                actual: 2
            })
        ));
        assert_eq!(ep.transport().ops().len(), before);
    }

    #[test]
    fn write_truncates_payload_to_length() {
        let mut ep = connected(board_bus());
        ep.write_bytes(1, 0, &[1, 2, 3, 4], 2).unwrap();
        assert_eq!(&ep.transport().contents(0x51).unwrap()[..3], &[1, 2, 0xFF]);
        assert_eq!(ep.log_entries()[0].content.as_deref(), Some(&[1u8, 2][..]));
    }

    #[test]
    fn transport_failure_mid_write_leaves_prefix() {
        // open + probe are not counted; allow two byte transactions.
        let mut ep = connected(board_bus().fail_after(2));
        let err = ep.write_bytes(1, 0, &[9, 8, 7, 6], 4).unwrap_err();
        assert!(err.is_transport());
        assert_eq!(&ep.transport().contents(0x51).unwrap()[..4], &[9, 8, 0xFF, 0xFF]);
        assert!(ep.log_entries().is_empty());
    }

    #[test]
    fn dry_run_read_returns_zeros_and_logs() {
        let mut ep = dry_run();
        assert_eq!(ep.read_bytes(0, 0, 8).unwrap(), vec![0; 8]);
        assert_eq!(ep.log_entries().len(), 1);
        assert_eq!(ep.log_entries()[0].length, 8);
    }

    #[test]
    fn dry_run_write_logs_full_payload() {
        let mut ep = dry_run();
        ep.write_bytes(1, 4, &[0xCA, 0xFE], 2).unwrap();
        assert_eq!(
            ep.log_entries()[0].content.as_deref(),
            Some(&[0xCA, 0xFE][..])
        );
        assert!(ep.transport().ops().iter().all(|op| !matches!(op, BusOp::Wait(_))));
    }

    #[test]
    fn reads_issue_one_transaction_per_byte_in_order() {
        let mut ep = connected(board_bus());
        ep.read_bytes(0, 5, 3).unwrap();
        let reads: Vec<u16> = ep
            .transport()
            .ops()
            .iter()
            .filter_map(|op| match op {
                BusOp::Read { offset, .. } => Some(*offset),
                _ => None,
            })
            .collect();
        assert_eq!(reads, [5, 6, 7]);
        assert_eq!(byte_ops(ep.transport().ops()), 3);
    }

    #[test]
    fn clear_log_entries_empties_the_session() {
        let mut ep = connected(board_bus());
        ep.read_bytes(0, 0, 1).unwrap();
        ep.clear_log_entries();
        assert!(ep.log_entries().is_empty());
        let mut out = Vec::new();
        assert_eq!(ep.write_log_entries_to(&mut out).unwrap(), 0);
        assert!(out.is_empty());
    }

    #[test]
    fn rejects_invalid_config() {
        let config = EndpointConfig::default().with_banks(Vec::new());
        assert!(matches!(
            Endpoint::new(config, board_bus()),
            Err(Error::InvalidArgument(_))
        ));
    }
}
