use crate::bus::{BusDevice, BusNumber, BusOptions, Message, MAX_SLAVE_ADDRESS};
use crate::errors::{BusError, BusResult, TransferOp};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread;
use tracing::{debug, info};

/// Descriptor and address cache, only touched under the handle's lock
struct BusState<D> {
    device: Option<D>,
    address: Option<u8>,
}

impl<D: BusDevice> BusState<D> {
    /// Point the kernel at `address` unless it is already selected.
    ///
    /// The cache is updated only after the kernel accepted the address.
    fn set_address(&mut self, bus: BusNumber, address: u8) -> BusResult<&mut D> {
        let device = self.device.as_mut().ok_or(BusError::Closed { bus })?;

        if self.address != Some(address) {
            debug!("[i2c-{}] selecting slave {:#04x}", bus, address);
            device
                .set_slave_address(address)
                .map_err(|source| BusError::AddressSet { bus, address, source })?;
            self.address = Some(address);
        }

        Ok(device)
    }
}

/// One open bus controller.
///
/// Every operation holds the handle's lock from address selection through
/// the end of the data phase, so concurrent callers never interleave on the
/// same bus. Different handles share nothing and run in parallel.
pub struct I2cBus<D: BusDevice> {
    number: BusNumber,
    options: BusOptions,
    state: Mutex<BusState<D>>,
}

impl<D: BusDevice> std::fmt::Debug for I2cBus<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("I2cBus")
            .field("number", &self.number)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl<D: BusDevice> I2cBus<D> {
    /// Wrap an already open device. The address cache starts unset.
    pub fn new(number: BusNumber, device: D, options: BusOptions) -> Self {
        Self {
            number,
            options,
            state: Mutex::new(BusState {
                device: Some(device),
                address: None,
            }),
        }
    }

    pub fn number(&self) -> BusNumber {
        self.number
    }

    pub fn options(&self) -> &BusOptions {
        &self.options
    }

    /// Slave address the kernel currently has selected, if known
    pub fn cached_address(&self) -> Option<u8> {
        self.lock().address
    }

    pub fn is_closed(&self) -> bool {
        self.lock().device.is_none()
    }

    // A panic inside a transaction cannot leave the cache ahead of the
    // kernel, so a poisoned lock is still safe to use.
    fn lock(&self) -> MutexGuard<'_, BusState<D>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `op` against the device with `address` selected, holding the
    /// bus lock for the whole call.
    fn with_device<T>(
        &self,
        address: u8,
        op: impl FnOnce(&mut D) -> BusResult<T>,
    ) -> BusResult<T> {
        if address > MAX_SLAVE_ADDRESS {
            return Err(BusError::InvalidAddress(address));
        }

        let mut state = self.lock();
        let device = state.set_address(self.number, address)?;
        op(device)
    }

    fn short_or_io(
        &self,
        address: u8,
        op: TransferOp,
        result: std::io::Result<usize>,
    ) -> BusResult<()> {
        match result {
            Ok(1) => Ok(()),
            Ok(actual) => Err(BusError::ShortTransfer {
                bus: self.number,
                address,
                op,
                expected: 1,
                actual,
            }),
            Err(source) => Err(BusError::Io {
                bus: self.number,
                address,
                source,
            }),
        }
    }

    /// Read one byte from the slave without register framing
    pub fn read_byte(&self, address: u8) -> BusResult<u8> {
        self.with_device(address, |device| {
            let mut buf = [0u8; 1];
            let result = device.read(&mut buf);
            self.short_or_io(address, TransferOp::Read, result)?;
            Ok(buf[0])
        })
    }

    /// Write one byte to the slave without register framing
    pub fn write_byte(&self, address: u8, value: u8) -> BusResult<()> {
        self.with_device(address, |device| {
            let result = device.write(&[value]);
            self.short_or_io(address, TransferOp::Write, result)
        })
    }

    /// Write `values` one byte at a time, pausing for the configured
    /// inter-byte delay between writes. Stops at the first failure.
    pub fn write_bytes(&self, address: u8, values: &[u8]) -> BusResult<()> {
        let delay = self.options.inter_byte_delay;
        self.with_device(address, |device| {
            for (i, value) in values.iter().enumerate() {
                if i > 0 && !delay.is_zero() {
                    thread::sleep(delay);
                }
                let result = device.write(std::slice::from_ref(value));
                self.short_or_io(address, TransferOp::Write, result)?;
            }
            Ok(())
        })
    }

    fn transfer(&self, address: u8, messages: &mut [Message<'_>]) -> BusResult<()> {
        for message in messages.iter() {
            if message.len() > usize::from(u16::MAX) {
                return Err(BusError::MessageTooLong { len: message.len() });
            }
        }

        self.with_device(address, |device| {
            device.transfer(messages).map_err(|source| BusError::Transfer {
                bus: self.number,
                address,
                source,
            })
        })
    }

    /// Select `reg` and read `buf.len()` bytes from it in one combined
    /// transfer. On failure the contents of `buf` are unspecified.
    pub fn read_from_register(&self, address: u8, reg: u8, buf: &mut [u8]) -> BusResult<()> {
        if buf.is_empty() {
            return Err(BusError::EmptyTransfer);
        }

        let select = [reg];
        let mut messages = [Message::write(address, &select), Message::read(address, buf)];
        self.transfer(address, &mut messages)
    }

    pub fn read_byte_from_register(&self, address: u8, reg: u8) -> BusResult<u8> {
        let mut buf = [0u8; 1];
        self.read_from_register(address, reg, &mut buf)?;
        Ok(buf[0])
    }

    /// Read a big-endian word: the first byte received is the high byte
    pub fn read_word_from_register(&self, address: u8, reg: u8) -> BusResult<u16> {
        let mut buf = [0u8; 2];
        self.read_from_register(address, reg, &mut buf)?;
        Ok(u16::from_be_bytes(buf))
    }

    fn write_register_payload(&self, address: u8, payload: &[u8]) -> BusResult<()> {
        let mut messages = [Message::write(address, payload)];
        self.transfer(address, &mut messages)
    }

    /// Write `value` to `reg` as a single message prefixed with the
    /// register number
    pub fn write_to_register(&self, address: u8, reg: u8, value: &[u8]) -> BusResult<()> {
        let mut payload = Vec::with_capacity(value.len() + 1);
        payload.push(reg);
        payload.extend_from_slice(value);
        self.write_register_payload(address, &payload)
    }

    pub fn write_byte_to_register(&self, address: u8, reg: u8, value: u8) -> BusResult<()> {
        self.write_register_payload(address, &[reg, value])
    }

    /// Write a word big-endian, high byte first
    pub fn write_word_to_register(&self, address: u8, reg: u8, value: u16) -> BusResult<()> {
        let [high, low] = value.to_be_bytes();
        self.write_register_payload(address, &[reg, high, low])
    }

    /// Close the descriptor. Later operations fail with `BusError::Closed`;
    /// closing an already closed handle is a no-op.
    pub fn close(&self) -> BusResult<()> {
        let mut state = self.lock();
        state.address = None;
        match state.device.take() {
            Some(device) => {
                info!("[i2c-{}] closing bus", self.number);
                device.close().map_err(|source| BusError::Close {
                    bus: self.number,
                    source,
                })
            }
            None => Ok(()),
        }
    }
}
