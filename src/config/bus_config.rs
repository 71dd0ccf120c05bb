use crate::bus::i2cdev::DEFAULT_PATH_TEMPLATE;
use crate::bus::{BusOptions, DevOpener};
use crate::errors::{ConfigError, ConfigResult};
use serde::Deserialize;
use std::fs;
use std::time::Duration;

/// Root structure of `buses.toml`
#[derive(Debug, Default, Deserialize)]
pub struct BusConfig {
    #[serde(default)]
    pub bus: BusSettings,
}

/// The `[bus]` table, applied to every bus the registry opens
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BusSettings {
    /// Device path with `{bus}` standing in for the bus number
    #[serde(default = "default_path_template")]
    pub path_template: String,
    #[serde(default = "default_exclusive")]
    pub exclusive: bool,
    /// Settling time between raw byte writes; hardware specific
    #[serde(default = "default_inter_byte_delay_ms")]
    pub inter_byte_delay_ms: u64,
}

fn default_path_template() -> String {
    DEFAULT_PATH_TEMPLATE.to_string()
}

fn default_exclusive() -> bool {
    true
}

fn default_inter_byte_delay_ms() -> u64 {
    20
}

impl Default for BusSettings {
    fn default() -> Self {
        Self {
            path_template: default_path_template(),
            exclusive: default_exclusive(),
            inter_byte_delay_ms: default_inter_byte_delay_ms(),
        }
    }
}

impl BusSettings {
    pub fn options(&self) -> BusOptions {
        BusOptions::default().with_inter_byte_delay(Duration::from_millis(self.inter_byte_delay_ms))
    }

    pub fn opener(&self) -> DevOpener {
        DevOpener::new(&self.path_template, self.exclusive)
    }
}

impl BusConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        if !self.bus.path_template.contains("{bus}") {
            return Err(ConfigError::InvalidValue {
                field: "bus.path_template".to_string(),
                reason: format!("'{}' has no {{bus}} placeholder", self.bus.path_template),
            });
        }
        Ok(())
    }
}

/// Parse and validate bus config text
pub fn parse_bus_config(content: &str) -> ConfigResult<BusConfig> {
    let parsed: BusConfig = toml::from_str(content)?;
    parsed.validate()?;
    Ok(parsed)
}

/// Load bus config file
pub fn load_bus_config(path: &str) -> ConfigResult<BusConfig> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::LoadError {
        path: path.to_string(),
        source,
    })?;
    parse_bus_config(&content)
}
