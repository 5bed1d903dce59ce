// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Daemon entry point: logging, configuration, hardware wiring, run.

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use lumibridge::bridge::Bridge;
use lumibridge::config::{BridgeConfig, CONFIG_PATH_ENV, DEFAULT_CONFIG_PATH};
use lumibridge::hal::GpioInput;
use lumibridge::hal::input::{BTN_0, DEFAULT_BUTTON_DEVICE, InputButton};
use lumibridge::hal::sysfs::{SysfsGpio, SysfsIlluminance, SysfsLight};
use lumibridge::registry::Registry;

#[tokio::main]
async fn main() -> lumibridge::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting lumibridge");

    let config_path =
        std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let config = BridgeConfig::load(&config_path)?;

    let light = Arc::new(SysfsLight::detect()?);
    let registry = Registry::build(
        &config,
        light,
        Arc::new(SysfsIlluminance::default()),
        open_gpio,
    )?;

    let button_rx = match InputButton::new(DEFAULT_BUTTON_DEVICE, vec![BTN_0]).spawn_reader() {
        Ok(rx) => Some(rx),
        Err(err) => {
            tracing::warn!(error = %err, "button device unavailable, continuing without it");
            None
        }
    };

    Bridge::new(config, registry, button_rx)?.run().await
}

/// Exports a GPIO line, falling back to a bare value-file reader when
/// the export fails; reads then fail per-cycle and are skipped.
fn open_gpio(gpio: u32) -> Arc<dyn GpioInput> {
    match SysfsGpio::export(gpio) {
        Ok(input) => Arc::new(input),
        Err(err) => {
            tracing::warn!(gpio, error = %err, "cannot set up GPIO line");
            Arc::new(SysfsGpio::from_value_path(format!(
                "/sys/class/gpio/gpio{gpio}/value"
            )))
        }
    }
}
