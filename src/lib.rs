//! Serial-bus (I2C) access layer for single-board computers.
//!
//! A [`BusRegistry`] hands out one shared [`I2cBus`] per bus number. Each
//! bus serializes its transactions, selects the slave address only when it
//! changes, and issues register reads and writes as atomic multi-message
//! transfers.

// Public modules
pub mod bus;
pub mod config;
pub mod errors;
pub mod identify;
pub mod registry;

// Re-export commonly used types
pub use bus::{BusDevice, BusNumber, BusOpener, BusOptions, DevOpener, I2cBus, Message};
pub use config::{load_bus_config, load_device_config, BusConfig, DeviceConfig, DeviceEntry};
pub use errors::{BusError, BusResult, ConfigError, ConfigResult};
pub use identify::{check_all, check_identity, IdentityReport};
pub use registry::{BusRef, BusRegistry};

use tracing_subscriber::EnvFilter;

/// Initialize tracing with default configuration
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();
}
