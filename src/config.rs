// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Bridge configuration.
//!
//! Loaded from a JSON file (default `/etc/lumimqtt.json`, overridable via
//! the `LUMIMQTT_CONFIG` environment variable). Every field has a default
//! so an empty file, or no file at all, yields a working configuration.
//!
//! The root topic is a template: a `{MAC}` placeholder resolves to the
//! device identifier, which is either configured explicitly or derived
//! from the first available network interface's MAC address as lowercase
//! hex with no separators.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

/// Default config file path on the gateway.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/lumimqtt.json";

/// Environment variable overriding the config file path.
pub const CONFIG_PATH_ENV: &str = "LUMIMQTT_CONFIG";

/// Configuration of a single GPIO-wired binary sensor.
#[derive(Debug, Clone, Deserialize)]
pub struct BinarySensorConfig {
    /// GPIO line number (sysfs numbering).
    pub gpio: Option<u32>,
    /// Home Assistant device class (`door`, `moisture`, ...).
    #[serde(default)]
    pub device_class: Option<String>,
    /// Topic suffix override; defaults to the sensor name.
    #[serde(default)]
    pub topic: Option<String>,
}

/// The full bridge configuration.
///
/// # Examples
///
/// ```
/// use lumibridge::config::BridgeConfig;
///
/// let config: BridgeConfig = serde_json::from_str(
///     r#"{"mqtt_host": "broker.local", "sensor_threshold": 10}"#,
/// ).unwrap();
/// assert_eq!(config.mqtt_host, "broker.local");
/// assert_eq!(config.mqtt_port, 1883);
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// MQTT broker host.
    pub mqtt_host: String,
    /// MQTT broker port.
    pub mqtt_port: u16,
    /// MQTT username.
    pub mqtt_user: Option<String>,
    /// MQTT password.
    pub mqtt_password: Option<String>,
    /// Root topic template; `{MAC}` resolves to the device id.
    pub topic_root: String,
    /// Explicit device id, overriding MAC resolution.
    pub device_id: Option<String>,
    /// Publish Home Assistant discovery documents on connect.
    pub auto_discovery: bool,
    /// Publish sensor state messages with the retain flag.
    pub sensor_retain: bool,
    /// Minimum analog delta that forces an immediate publish.
    pub sensor_threshold: f64,
    /// Maximum seconds between publishes for an unchanging sensor.
    pub sensor_debounce_period: f64,
    /// Default light transition duration in seconds, used when a `set`
    /// payload carries no `transition` field.
    pub light_transition_period: f64,
    /// Seconds between unconditional light state re-publishes.
    pub light_notification_period: f64,
    /// Seconds between sensor sampling cycles.
    pub sensor_poll_period: f64,
    /// Seconds to wait before reconnecting after a lost connection.
    pub reconnection_interval: f64,
    /// Configured binary sensors, by name.
    pub binary_sensors: BTreeMap<String, BinarySensorConfig>,
    /// Custom shell command templates, by id.
    pub custom_commands: BTreeMap<String, String>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            mqtt_host: "localhost".to_string(),
            mqtt_port: 1883,
            mqtt_user: None,
            mqtt_password: None,
            topic_root: "lumi/{MAC}".to_string(),
            device_id: None,
            auto_discovery: true,
            sensor_retain: false,
            // 50 raw units is roughly 5% of the illuminance range.
            sensor_threshold: 50.0,
            sensor_debounce_period: 60.0,
            light_transition_period: 1.0,
            light_notification_period: 60.0,
            sensor_poll_period: 1.0,
            reconnection_interval: 10.0,
            binary_sensors: BTreeMap::new(),
            custom_commands: BTreeMap::new(),
        }
    }
}

impl BridgeConfig {
    /// Loads configuration from a JSON file.
    ///
    /// A missing file yields the defaults; an unreadable or malformed
    /// file is a fatal error.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read, is not valid
    /// JSON, or fails validation.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::info!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Validates numeric constraints and binary sensor declarations.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] on the first violated constraint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("sensor_threshold", self.sensor_threshold),
            ("sensor_debounce_period", self.sensor_debounce_period),
            ("light_transition_period", self.light_transition_period),
            ("light_notification_period", self.light_notification_period),
            ("sensor_poll_period", self.sensor_poll_period),
            ("reconnection_interval", self.reconnection_interval),
        ] {
            if value < 0.0 || !value.is_finite() {
                return Err(ConfigError::NegativeValue { field, value });
            }
        }
        for (name, sensor) in &self.binary_sensors {
            if sensor.gpio.is_none() {
                return Err(ConfigError::MissingGpio(name.clone()));
            }
        }
        Ok(())
    }

    /// Resolves the device identifier: the explicit `device_id` if set,
    /// otherwise the MAC of the first available network interface.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoDeviceId`] when neither source yields an
    /// identifier.
    pub fn resolve_device_id(&self) -> Result<String, ConfigError> {
        if let Some(id) = &self.device_id {
            return Ok(id.clone());
        }
        first_interface_mac("/sys/class/net").ok_or(ConfigError::NoDeviceId)
    }

    /// Resolves the root topic by substituting `{MAC}` with the device id.
    #[must_use]
    pub fn resolve_topic_root(&self, device_id: &str) -> String {
        self.topic_root.replace("{MAC}", device_id)
    }

    /// Sensor debounce period as a [`Duration`].
    #[must_use]
    pub fn debounce_period(&self) -> Duration {
        Duration::from_secs_f64(self.sensor_debounce_period)
    }

    /// Sensor poll period as a [`Duration`].
    #[must_use]
    pub fn poll_period(&self) -> Duration {
        Duration::from_secs_f64(self.sensor_poll_period)
    }

    /// Light notification period as a [`Duration`].
    #[must_use]
    pub fn notification_period(&self) -> Duration {
        Duration::from_secs_f64(self.light_notification_period)
    }

    /// Reconnection backoff as a [`Duration`].
    #[must_use]
    pub fn reconnection_interval(&self) -> Duration {
        Duration::from_secs_f64(self.reconnection_interval)
    }
}

/// Reads the MAC of the first non-loopback interface under `sys_net`,
/// normalized to lowercase hex with no separators.
fn first_interface_mac(sys_net: impl AsRef<Path>) -> Option<String> {
    let mut names: Vec<_> = std::fs::read_dir(sys_net)
        .ok()?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.file_name().is_some_and(|name| name != "lo"))
        .collect();
    names.sort();
    for path in names {
        let Ok(raw) = std::fs::read_to_string(path.join("address")) else {
            continue;
        };
        let mac: String = raw
            .trim()
            .chars()
            .filter(char::is_ascii_hexdigit)
            .map(|c| c.to_ascii_lowercase())
            .collect();
        if !mac.is_empty() && mac.chars().any(|c| c != '0') {
            return Some(mac);
        }
    }
    None
}
