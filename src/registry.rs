use crate::bus::{BusDevice, BusNumber, BusOpener, BusOptions, DevOpener, I2cBus};
use crate::config::BusSettings;
use crate::errors::{BusError, BusResult};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

/// Shared handle to one bus owned by a registry
pub type BusRef<O> = Arc<I2cBus<<O as BusOpener>::Device>>;

/// Owns every open bus of the process, at most one handle per bus number.
///
/// Buses are opened lazily on first request. The registry lock covers only
/// map lookups and inserts, never a device open or a transaction; those run
/// unlocked or under each handle's own lock.
pub struct BusRegistry<O: BusOpener> {
    opener: O,
    options: BusOptions,
    buses: Mutex<BTreeMap<BusNumber, BusRef<O>>>,
}

impl BusRegistry<DevOpener> {
    /// Registry over `/dev/i2c-*` devices as described by `settings`
    pub fn from_config(settings: &BusSettings) -> Self {
        Self::new(settings.opener(), settings.options())
    }
}

impl<O: BusOpener> BusRegistry<O> {
    pub fn new(opener: O, options: BusOptions) -> Self {
        Self {
            opener,
            options,
            buses: Mutex::new(BTreeMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<BusNumber, BusRef<O>>> {
        self.buses.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Handle for bus `number`, opening the device on first request.
    ///
    /// The device is opened without the registry lock held. When two callers
    /// race on a missing bus, the first insert wins and the other closes its
    /// surplus descriptor. A failed open is not cached, so a later call
    /// retries it.
    pub fn bus(&self, number: BusNumber) -> BusResult<BusRef<O>> {
        if let Some(bus) = self.lock().get(&number) {
            return Ok(Arc::clone(bus));
        }

        let device = self.opener.open(number)?;

        let mut buses = self.lock();
        if let Some(existing) = buses.get(&number) {
            let existing = Arc::clone(existing);
            drop(buses);
            debug!("[registry] bus {} opened concurrently, dropping duplicate", number);
            if let Err(e) = device.close() {
                warn!("[registry] failed to close duplicate of I2C bus {}: {}", number, e);
            }
            return Ok(existing);
        }

        info!("[registry] opened I2C bus {}", number);
        let bus = Arc::new(I2cBus::new(number, device, self.options));
        buses.insert(number, Arc::clone(&bus));
        Ok(bus)
    }

    /// Bus numbers with an open handle, in ascending order
    pub fn open_buses(&self) -> Vec<BusNumber> {
        self.lock().keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Close every registered bus and empty the registry.
    ///
    /// All handles are closed even when one fails; the first error is
    /// returned. Callers must quiesce in-flight transactions first, and
    /// handles still held elsewhere fail with `BusError::Closed` afterwards.
    pub fn close_all(&self) -> BusResult<()> {
        let buses = std::mem::take(&mut *self.lock());
        let mut first_error: Option<BusError> = None;

        for (number, bus) in buses {
            if let Err(e) = bus.close() {
                warn!("[registry] failed to close I2C bus {}: {}", number, e);
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
