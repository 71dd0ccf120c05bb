use crate::bus::{BusNumber, MAX_SLAVE_ADDRESS};
use crate::errors::{ConfigError, ConfigResult};
use serde::Deserialize;
use std::fs;

/// Root configuration struct expecting `[[device]]` TOML array format
#[derive(Debug, Default, Deserialize)]
pub struct DeviceConfig {
    #[serde(rename = "device", default)]
    pub devices: Vec<DeviceEntry>,
}

/// One slave device, matching each `[[device]]` section
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceEntry {
    pub id: String,
    pub bus: BusNumber,
    pub address: u8,
    /// Register holding the chip identity (WHO_AM_I or equivalent)
    pub id_register: u8,
    pub expected_id: u8,
}

impl DeviceConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        for (i, d) in self.devices.iter().enumerate() {
            if d.address > MAX_SLAVE_ADDRESS {
                return Err(ConfigError::InvalidValue {
                    field: format!("device[{}].address", i),
                    reason: format!("{:#04x} ('{}') is not a 7-bit address", d.address, d.id),
                });
            }
            if self.devices[..i].iter().any(|other| other.id == d.id) {
                return Err(ConfigError::InvalidValue {
                    field: format!("device[{}].id", i),
                    reason: format!("duplicate device id '{}'", d.id),
                });
            }
        }
        Ok(())
    }
}

/// Parse and validate device config text
pub fn parse_device_config(content: &str) -> ConfigResult<DeviceConfig> {
    let parsed: DeviceConfig = toml::from_str(content)?;
    parsed.validate()?;
    Ok(parsed)
}

/// Loads config from TOML file
pub fn load_device_config(path: &str) -> ConfigResult<DeviceConfig> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::LoadError {
        path: path.to_string(),
        source,
    })?;
    parse_device_config(&content)
}
