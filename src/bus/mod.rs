//! Bus-level building blocks: the kernel-interface seam, the Linux
//! `i2c-dev` implementation of it, and the serialized bus handle.

pub mod handle;
pub mod i2cdev;

use crate::errors::BusResult;
use std::io;
use std::time::Duration;

pub use handle::I2cBus;
pub use i2cdev::DevOpener;
#[cfg(target_os = "linux")]
pub use i2cdev::LinuxI2cDevice;

/// Number of a physical bus controller, e.g. `1` for `/dev/i2c-1`
pub type BusNumber = u8;

/// Highest valid 7-bit slave address
pub const MAX_SLAVE_ADDRESS: u8 = 0x7F;

/// Default settling time between sequential raw byte writes
pub const DEFAULT_INTER_BYTE_DELAY: Duration = Duration::from_millis(20);

/// One segment of an atomic multi-message transfer.
///
/// A transfer carrying several messages is executed by the kernel as a
/// single bus transaction with repeated starts between segments.
#[derive(Debug)]
pub enum Message<'a> {
    /// Send `data` to the slave at `address`
    Write { address: u8, data: &'a [u8] },
    /// Fill `buffer` with bytes read from the slave at `address`
    Read { address: u8, buffer: &'a mut [u8] },
}

impl<'a> Message<'a> {
    pub fn write(address: u8, data: &'a [u8]) -> Self {
        Message::Write { address, data }
    }

    pub fn read(address: u8, buffer: &'a mut [u8]) -> Self {
        Message::Read { address, buffer }
    }

    pub fn address(&self) -> u8 {
        match self {
            Message::Write { address, .. } | Message::Read { address, .. } => *address,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Message::Write { data, .. } => data.len(),
            Message::Read { buffer, .. } => buffer.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_read(&self) -> bool {
        matches!(self, Message::Read { .. })
    }
}

/// Kernel operations offered by one open bus descriptor.
///
/// [`I2cBus`] drives a `BusDevice` while holding its per-bus lock, so
/// implementations never see two operations interleave.
pub trait BusDevice: Send {
    /// Select the slave that subsequent raw reads and writes talk to
    fn set_slave_address(&mut self, address: u8) -> io::Result<()>;

    /// Raw read from the selected slave, returning the byte count moved
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Raw write to the selected slave, returning the byte count moved
    fn write(&mut self, buf: &[u8]) -> io::Result<usize>;

    /// Execute all `messages` as one indivisible bus transaction
    fn transfer(&mut self, messages: &mut [Message<'_>]) -> io::Result<()>;

    /// Release the descriptor, reporting any error from the kernel
    fn close(self) -> io::Result<()>
    where
        Self: Sized;
}

/// Opens the device behind a bus number
pub trait BusOpener: Send + Sync {
    type Device: BusDevice;

    fn open(&self, bus: BusNumber) -> BusResult<Self::Device>;
}

/// Per-handle tuning shared by every bus a registry creates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusOptions {
    /// Pause between the individually framed writes of `write_bytes`
    pub inter_byte_delay: Duration,
}

impl Default for BusOptions {
    fn default() -> Self {
        Self {
            inter_byte_delay: DEFAULT_INTER_BYTE_DELAY,
        }
    }
}

impl BusOptions {
    pub fn with_inter_byte_delay(mut self, delay: Duration) -> Self {
        self.inter_byte_delay = delay;
        self
    }
}
