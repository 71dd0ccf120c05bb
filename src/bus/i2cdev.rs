//! Linux `i2c-dev` character-device access.
//!
//! The userspace interface is described in the kernel's
//! `Documentation/i2c/dev-interface`: a bus is opened as `/dev/i2c-N`,
//! `I2C_SLAVE` selects the slave used by plain `read(2)`/`write(2)`, and
//! `I2C_RDWR` submits a list of `struct i2c_msg` as one combined transfer.
//!
//! The ioctls themselves stay private to this module, so callers go through
//! [`I2cBus`](crate::bus::I2cBus) and its lock:
//!
//! ```compile_fail
//! let set_slave = sbc_i2c::bus::i2cdev::ioctl::i2c_set_slave;
//! ```
//!
//! ```compile_fail
//! let set_slave = sbc_i2c::bus::i2cdev::i2c_set_slave;
//! ```

use crate::bus::{BusDevice, BusNumber, BusOpener, Message};
use crate::errors::{BusError, BusResult};
#[cfg(target_os = "linux")]
use std::fs::{File, OpenOptions};
use std::io;
#[cfg(target_os = "linux")]
use std::io::{Read, Write};
#[cfg(target_os = "linux")]
use std::os::unix::fs::OpenOptionsExt;
#[cfg(target_os = "linux")]
use std::os::unix::io::{AsRawFd, IntoRawFd};
#[cfg(target_os = "linux")]
use tracing::debug;

/// Default device path, `{bus}` is replaced with the bus number
pub const DEFAULT_PATH_TEMPLATE: &str = "/dev/i2c-{bus}";

#[cfg(target_os = "linux")]
const I2C_SLAVE: u16 = 0x0703;
#[cfg(target_os = "linux")]
const I2C_RDWR: u16 = 0x0707;
#[cfg(target_os = "linux")]
const I2C_M_RD: u16 = 0x0001;

/// `struct i2c_msg` from `<linux/i2c.h>`
#[cfg(target_os = "linux")]
#[repr(C)]
#[derive(Debug)]
struct I2cMsg {
    addr: u16,
    flags: u16,
    len: u16,
    buf: *mut u8,
}

/// `struct i2c_rdwr_ioctl_data` from `<linux/i2c-dev.h>`
#[cfg(target_os = "linux")]
#[repr(C)]
#[derive(Debug)]
struct I2cRdwrIoctlData {
    msgs: *mut I2cMsg,
    nmsgs: u32,
}

/// Raw ioctl wrappers; only the `BusDevice` impl below may call them.
#[cfg(target_os = "linux")]
mod ioctl {
    use super::{I2cRdwrIoctlData, I2C_RDWR, I2C_SLAVE};

    nix::ioctl_write_int_bad!(i2c_set_slave, I2C_SLAVE);
    nix::ioctl_write_ptr_bad!(i2c_rdwr, I2C_RDWR, I2cRdwrIoctlData);
}

#[cfg(target_os = "linux")]
impl I2cMsg {
    /// Describe `message` in kernel layout. The returned value points into
    /// the message's buffer and must not outlive the borrow of `message`.
    fn from_message(message: &mut Message<'_>) -> io::Result<Self> {
        let len = u16::try_from(message.len()).map_err(|_| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("i2c message of {} bytes is too long", message.len()),
            )
        })?;
        let addr = u16::from(message.address());

        Ok(match message {
            Message::Write { data, .. } => I2cMsg {
                addr,
                flags: 0,
                len,
                // The kernel only reads from write segments.
                buf: data.as_ptr().cast_mut(),
            },
            Message::Read { buffer, .. } => I2cMsg {
                addr,
                flags: I2C_M_RD,
                len,
                buf: buffer.as_mut_ptr(),
            },
        })
    }
}

/// An open `/dev/i2c-N` descriptor
#[cfg(target_os = "linux")]
#[derive(Debug)]
pub struct LinuxI2cDevice {
    file: File,
    path: String,
}

#[cfg(target_os = "linux")]
impl LinuxI2cDevice {
    pub fn open(path: &str, exclusive: bool) -> io::Result<Self> {
        let mut options = OpenOptions::new();
        options.read(true).write(true);
        if exclusive {
            options.custom_flags(libc::O_EXCL);
        }
        let file = options.open(path)?;
        Ok(Self {
            file,
            path: path.to_string(),
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

#[cfg(target_os = "linux")]
impl BusDevice for LinuxI2cDevice {
    fn set_slave_address(&mut self, address: u8) -> io::Result<()> {
        // SAFETY: I2C_SLAVE takes the address by value; the descriptor is
        // owned by `self` and open for the duration of the call.
        unsafe { ioctl::i2c_set_slave(self.file.as_raw_fd(), libc::c_int::from(address)) }?;
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn transfer(&mut self, messages: &mut [Message<'_>]) -> io::Result<()> {
        let mut raw = messages
            .iter_mut()
            .map(I2cMsg::from_message)
            .collect::<io::Result<Vec<_>>>()?;
        let nmsgs = u32::try_from(raw.len())
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "too many i2c messages"))?;
        let request = I2cRdwrIoctlData {
            msgs: raw.as_mut_ptr(),
            nmsgs,
        };

        debug!("[{}] I2C_RDWR with {} message(s)", self.path, nmsgs);

        // SAFETY: every `buf` in `raw` points into a buffer borrowed through
        // `messages`, which stays exclusively borrowed until this function
        // returns, and `raw` itself is neither moved nor resized while the
        // kernel holds `request.msgs`. Lengths were range-checked above.
        unsafe { ioctl::i2c_rdwr(self.file.as_raw_fd(), &request) }?;
        Ok(())
    }

    fn close(self) -> io::Result<()> {
        nix::unistd::close(self.file.into_raw_fd())?;
        Ok(())
    }
}

/// Opens `i2c-dev` character devices from a path template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DevOpener {
    path_template: String,
    exclusive: bool,
}

impl Default for DevOpener {
    fn default() -> Self {
        Self::new(DEFAULT_PATH_TEMPLATE, true)
    }
}

impl DevOpener {
    pub fn new(path_template: &str, exclusive: bool) -> Self {
        Self {
            path_template: path_template.to_string(),
            exclusive,
        }
    }

    pub fn path_for(&self, bus: BusNumber) -> String {
        self.path_template.replace("{bus}", &bus.to_string())
    }
}

#[cfg(target_os = "linux")]
impl BusOpener for DevOpener {
    type Device = LinuxI2cDevice;

    fn open(&self, bus: BusNumber) -> BusResult<LinuxI2cDevice> {
        let path = self.path_for(bus);
        let device = LinuxI2cDevice::open(&path, self.exclusive)
            .map_err(|source| BusError::Open { bus, path, source })?;
        debug!("[i2c-{}] opened {}", bus, device.path());
        Ok(device)
    }
}

/// Stand-in device type on platforms without `i2c-dev`; it cannot be built
#[cfg(not(target_os = "linux"))]
#[derive(Debug)]
pub enum UnsupportedDevice {}

#[cfg(not(target_os = "linux"))]
impl BusDevice for UnsupportedDevice {
    fn set_slave_address(&mut self, _address: u8) -> io::Result<()> {
        match *self {}
    }

    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        match *self {}
    }

    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        match *self {}
    }

    fn transfer(&mut self, _messages: &mut [Message<'_>]) -> io::Result<()> {
        match *self {}
    }

    fn close(self) -> io::Result<()> {
        match self {}
    }
}

#[cfg(not(target_os = "linux"))]
impl BusOpener for DevOpener {
    type Device = UnsupportedDevice;

    fn open(&self, bus: BusNumber) -> BusResult<UnsupportedDevice> {
        Err(BusError::Unsupported(format!(
            "cannot open {}: I2C is only supported on Linux",
            self.path_for(bus)
        )))
    }
}
