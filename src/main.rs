use sbc_i2c::{check_all, init_tracing, load_bus_config, load_device_config, BusRegistry};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // RUST_LOG=debug shows every address select and combined transfer
    init_tracing();

    info!("[i2c-identify] starting up...");

    // Load configuration from CONFIG_PATH or default
    let config_path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config".to_string());
    let bus_config = load_bus_config(&format!("{}/buses.toml", config_path))?;
    let device_config = load_device_config(&format!("{}/devices.toml", config_path))?;
    info!("[config] loaded {} device(s)", device_config.devices.len());

    let registry = Arc::new(BusRegistry::from_config(&bus_config.bus));

    let failures = check_all(Arc::clone(&registry), device_config.devices).await;

    info!("[registry] closing {} bus(es)", registry.len());
    registry.close_all()?;

    if failures > 0 {
        return Err(format!("{} device(s) failed the identity check", failures).into());
    }
    info!("[i2c-identify] all devices identified");
    Ok(())
}
