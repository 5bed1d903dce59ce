// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The device registry: every addressable entity this bridge exposes.
//!
//! Built once at startup from the configuration. The fixed platform
//! entities (illuminance sensor, RGB light, button) always exist;
//! binary sensors and custom commands come from the config. Entity ids
//! are unique and immutable for the process lifetime.

use std::collections::HashSet;
use std::sync::Arc;

use crate::config::BridgeConfig;
use crate::error::ConfigError;
use crate::hal::{GpioInput, IlluminanceReader, LightDriver};

/// Topic suffix of the fixed illuminance sensor.
pub const ILLUMINANCE_ID: &str = "illuminance";
/// Topic suffix of the fixed RGB light.
pub const LIGHT_ID: &str = "light";
/// Topic suffix of the fixed button.
pub const BUTTON_ID: &str = "btn0";

/// The analog illuminance sensor.
pub struct AnalogSensor {
    /// Entity id and topic suffix.
    pub id: String,
    /// Hardware reader.
    pub reader: Arc<dyn IlluminanceReader>,
}

/// A GPIO-wired binary sensor.
pub struct BinarySensor {
    /// Entity id.
    pub id: String,
    /// Topic suffix (defaults to the id).
    pub topic: String,
    /// Home Assistant device class, if configured.
    pub device_class: Option<String>,
    /// Hardware line.
    pub gpio: Arc<dyn GpioInput>,
}

/// The RGB status light.
pub struct LightEntity {
    /// Entity id and topic suffix.
    pub id: String,
    /// Hardware driver.
    pub driver: Arc<dyn LightDriver>,
}

/// The physical button.
pub struct ButtonEntity {
    /// Entity id and topic suffix.
    pub id: String,
}

/// A configured shell command entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomCommand {
    /// Entity id and topic suffix.
    pub id: String,
    /// Shell template with `{field}` placeholders.
    pub template: String,
}

/// The target of a `set` message, resolved by id lookup.
pub enum SetTarget<'a> {
    /// The RGB light.
    Light,
    /// A custom command entity.
    Command(&'a CustomCommand),
}

/// All entities exposed by this bridge.
pub struct Registry {
    /// The fixed illuminance sensor.
    pub sensor: AnalogSensor,
    /// The fixed RGB light.
    pub light: LightEntity,
    /// The fixed button.
    pub button: ButtonEntity,
    /// Configured binary sensors.
    pub binary_sensors: Vec<BinarySensor>,
    /// Configured custom commands.
    pub commands: Vec<CustomCommand>,
}

impl Registry {
    /// Builds the registry from configuration and hardware handles.
    ///
    /// `gpio_open` maps a GPIO line number to its reader; the production
    /// closure exports the line through sysfs.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a binary sensor has no GPIO line or
    /// two entities resolve to the same id.
    pub fn build(
        config: &BridgeConfig,
        light_driver: Arc<dyn LightDriver>,
        illuminance: Arc<dyn IlluminanceReader>,
        gpio_open: impl Fn(u32) -> Arc<dyn GpioInput>,
    ) -> Result<Self, ConfigError> {
        let mut seen: HashSet<String> =
            [ILLUMINANCE_ID, LIGHT_ID, BUTTON_ID].map(String::from).into();

        let mut binary_sensors = Vec::new();
        for (name, sensor) in &config.binary_sensors {
            let gpio = sensor
                .gpio
                .ok_or_else(|| ConfigError::MissingGpio(name.clone()))?;
            if !seen.insert(name.clone()) {
                return Err(ConfigError::DuplicateEntity(name.clone()));
            }
            binary_sensors.push(BinarySensor {
                id: name.clone(),
                topic: sensor.topic.clone().unwrap_or_else(|| name.clone()),
                device_class: sensor.device_class.clone(),
                gpio: gpio_open(gpio),
            });
        }

        let mut commands = Vec::new();
        for (id, template) in &config.custom_commands {
            if !seen.insert(id.clone()) {
                return Err(ConfigError::DuplicateEntity(id.clone()));
            }
            commands.push(CustomCommand {
                id: id.clone(),
                template: template.clone(),
            });
        }

        Ok(Self {
            sensor: AnalogSensor {
                id: ILLUMINANCE_ID.to_string(),
                reader: illuminance,
            },
            light: LightEntity {
                id: LIGHT_ID.to_string(),
                driver: light_driver,
            },
            button: ButtonEntity {
                id: BUTTON_ID.to_string(),
            },
            binary_sensors,
            commands,
        })
    }

    /// Resolves the entity addressed by a `set` topic's entity suffix.
    #[must_use]
    pub fn lookup_set(&self, id: &str) -> Option<SetTarget<'_>> {
        if id == self.light.id {
            return Some(SetTarget::Light);
        }
        self.commands
            .iter()
            .find(|command| command.id == id)
            .map(SetTarget::Command)
    }

    /// Topic suffixes the bridge subscribes to (`<id>/set`).
    pub fn set_suffixes(&self) -> impl Iterator<Item = String> + '_ {
        std::iter::once(format!("{}/set", self.light.id))
            .chain(self.commands.iter().map(|c| format!("{}/set", c.id)))
    }
}
