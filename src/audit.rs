//! Audit trail of EEPROM range operations.
//!
//! Every completed [`read_bytes`](crate::Endpoint::read_bytes) or
//! [`write_bytes`](crate::Endpoint::write_bytes) appends one
//! [`AuditEntry`] to the endpoint's [`AuditLog`]. The log is written to a
//! plain-text file on demand, one line per entry:
//!
//! ```text
//! 2024-03-01_12:00:00 READ - Bus: 1 Addr: 0x51 Offset: 0xa Length: 4
//! 2024-03-01_12:00:01 WRITE - Bus: 1 Addr: 0x51 Offset: 0xa Length: 4 Content: deadbeef
//! ```
//!
//! The line shape is consumed by existing log parsers and must stay stable.

use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Local};

use crate::error::{Error, Result};
use crate::hex;

/// Timestamp format used in log lines.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H:%M:%S";

/// Kind of range operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// A range read.
    Read,
    /// A range write.
    Write,
}

impl Action {
    /// The token used in log lines.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Action::Read => "READ",
            Action::Write => "WRITE",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One completed range operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEntry {
    /// Read or write.
    pub action: Action,
    /// Wall-clock time the entry was created.
    pub timestamp: DateTime<Local>,
    /// Bus the transaction went over.
    pub bus_id: u32,
    /// Device address of the bank.
    pub device_address: u8,
    /// Start offset within the bank.
    pub offset: usize,
    /// Number of bytes.
    pub length: usize,
    /// Payload, present for writes only.
    pub content: Option<Vec<u8>>,
}

impl AuditEntry {
    /// Entry for a range read. Read payloads are never recorded.
    pub fn read(bus_id: u32, device_address: u8, offset: usize, length: usize) -> Self {
        Self {
            action: Action::Read,
            timestamp: Local::now(),
            bus_id,
            device_address,
            offset,
            length,
            content: None,
        }
    }

    /// Entry for a range write carrying the full payload.
    pub fn write(
        bus_id: u32,
        device_address: u8,
        offset: usize,
        length: usize,
        content: Vec<u8>,
    ) -> Self {
        Self {
            action: Action::Write,
            timestamp: Local::now(),
            bus_id,
            device_address,
            offset,
            length,
            content: Some(content),
        }
    }

    /// Override the capture time.
    pub fn at(mut self, timestamp: DateTime<Local>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// Renders the log line, without a trailing newline.
impl fmt::Display for AuditEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} - Bus: {} Addr: {:#x} Offset: {:#x} Length: {}",
            self.timestamp.format(TIMESTAMP_FORMAT),
            self.action,
            self.bus_id,
            self.device_address,
            self.offset,
            self.length
        )?;
        if let (Action::Write, Some(content)) = (self.action, &self.content) {
            write!(f, " Content: {}", hex::encode(content))?;
        }
        Ok(())
    }
}

/// Append-only accumulator of audit entries with a flush watermark.
///
/// Entries are kept in insertion order. Writing the log emits only the
/// entries appended since the previous successful write, so flushing more
/// than once per session never duplicates lines.
#[derive(Debug, Default, Clone)]
pub struct AuditLog {
    entries: Vec<AuditEntry>,
    flushed: usize,
}

impl AuditLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry.
    pub fn push(&mut self, entry: AuditEntry) {
        self.entries.push(entry);
    }

    /// All entries of the session, in insertion order.
    pub fn entries(&self) -> &[AuditEntry] {
        &self.entries
    }

    /// Entries not yet written to a store.
    pub fn pending(&self) -> &[AuditEntry] {
        &self.entries[self.flushed..]
    }

    /// Number of accumulated entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no entries have been accumulated.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop all entries and reset the watermark.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.flushed = 0;
    }

    /// Write pending entries to `out`, one line each.
    ///
    /// Each line is rendered in full and handed to `out` with a single
    /// `write_all`. The watermark advances after every line that was
    /// accepted, so a failure part way through leaves only the remaining
    /// entries pending. Returns the number of lines written.
    pub fn write_to<W: Write>(&mut self, out: &mut W) -> Result<usize> {
        let mut count = 0;
        while let Some(entry) = self.entries.get(self.flushed) {
            let line = format!("{entry}\n");
            out.write_all(line.as_bytes()).map_err(Error::LogStore)?;
            self.flushed += 1;
            count += 1;
        }
        out.flush().map_err(Error::LogStore)?;
        Ok(count)
    }

    /// Append pending entries to the file at `path`, creating it if needed.
    ///
    /// The file is opened and closed within this call. Lines go to the file
    /// unbuffered so that nothing is written after an error is reported.
    pub fn append_to_file(&mut self, path: &Path) -> Result<usize> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(Error::LogStore)?;
        let count = self.write_to(&mut file)?;
        log::debug!("appended {count} audit entries to {}", path.display());
        Ok(count)
    }
}
