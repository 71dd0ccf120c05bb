use crate::bus::BusOpener;
use crate::config::DeviceEntry;
use crate::errors::BusResult;
use crate::registry::BusRegistry;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Outcome of reading a device's identity register
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityReport {
    pub id: String,
    pub expected: u8,
    pub actual: u8,
}

impl IdentityReport {
    pub fn matches(&self) -> bool {
        self.expected == self.actual
    }
}

/// Read `device`'s identity register through the registry and compare it
/// with the configured value. A mismatch is a report, not an error.
pub fn check_identity<O: BusOpener>(
    registry: &BusRegistry<O>,
    device: &DeviceEntry,
) -> BusResult<IdentityReport> {
    let bus = registry.bus(device.bus)?;
    let actual = bus.read_byte_from_register(device.address, device.id_register)?;

    let report = IdentityReport {
        id: device.id.clone(),
        expected: device.expected_id,
        actual,
    };
    if report.matches() {
        info!(
            "[{}] identity {:#04x} confirmed on bus {} at {:#04x}",
            device.id, actual, device.bus, device.address
        );
    } else {
        warn!(
            "[{}] wrong chip id: expected {:#04x}, got {:#04x}",
            device.id, device.expected_id, actual
        );
    }
    Ok(report)
}

/// Check every device on blocking worker tasks and return how many failed.
///
/// Devices on different buses are checked in parallel; the per-bus lock
/// serializes the ones that share a bus. A wrong identity, a bus error and
/// a crashed worker all count as failures, so the caller can always go on
/// to close the registry.
pub async fn check_all<O>(registry: Arc<BusRegistry<O>>, devices: Vec<DeviceEntry>) -> usize
where
    O: BusOpener + 'static,
{
    let mut checks = Vec::new();
    for device in devices {
        let registry = Arc::clone(&registry);
        let id = device.id.clone();
        let check = tokio::task::spawn_blocking(move || check_identity(&*registry, &device));
        checks.push((id, check));
    }

    let mut failures = 0usize;
    for (id, check) in checks {
        match check.await {
            Ok(Ok(report)) if report.matches() => {}
            Ok(Ok(_)) => failures += 1,
            Ok(Err(e)) => {
                error!("[{}] identity check failed: {}", id, e);
                failures += 1;
            }
            Err(e) => {
                error!("[{}] identity check task failed: {}", id, e);
                failures += 1;
            }
        }
    }
    failures
}
