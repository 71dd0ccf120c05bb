pub mod bus_config;
pub mod device_config;

pub use bus_config::{load_bus_config, parse_bus_config, BusConfig, BusSettings};
pub use device_config::{load_device_config, parse_device_config, DeviceConfig, DeviceEntry};
