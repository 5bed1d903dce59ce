// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Home Assistant discovery documents.
//!
//! On every (re)connection the bridge publishes one retained config
//! document per entity under the `homeassistant/` discovery prefix, so
//! a hub on the same broker registers the gateway automatically.
//! Republishing identical documents on every reconnect is expected; the
//! generation is a pure function of the registry, which makes it
//! idempotent by construction.

use serde_json::{Value, json};

use crate::registry::Registry;
use crate::router::TopicRouter;
use crate::types::ButtonAction;

/// Discovery topic prefix watched by Home Assistant.
pub const DISCOVERY_PREFIX: &str = "homeassistant";

/// One retained discovery message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryMessage {
    /// Config topic under the discovery prefix.
    pub topic: String,
    /// JSON config document.
    pub payload: Value,
}

/// Generates discovery documents for every entity in a registry.
#[derive(Debug, Clone)]
pub struct DiscoveryPublisher {
    device_id: String,
}

impl DiscoveryPublisher {
    /// Creates a publisher for the given resolved device id.
    #[must_use]
    pub fn new(device_id: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
        }
    }

    /// The shared `device` block tying all entities to one gateway.
    fn device_block(&self) -> Value {
        let gateway = format!("xiaomi_gateway_{}", self.device_id);
        json!({
            "identifiers": [gateway],
            "name": gateway,
            "sw_version": env!("CARGO_PKG_VERSION"),
            "model": "Xiaomi Gateway",
            "manufacturer": "Xiaomi",
        })
    }

    /// Fields common to every entity document.
    fn generic_vals(&self, name: &str, router: &TopicRouter) -> Value {
        let unique = format!("{name}_{}", self.device_id);
        json!({
            "name": unique,
            "unique_id": unique,
            "device": self.device_block(),
            "availability_topic": router.status_topic(),
        })
    }

    /// Builds the full set of retained discovery messages.
    #[must_use]
    pub fn documents(&self, registry: &Registry, router: &TopicRouter) -> Vec<DiscoveryMessage> {
        let dev = &self.device_id;
        let mut messages = Vec::new();

        let mut sensor = self.generic_vals(&registry.sensor.id, router);
        merge(
            &mut sensor,
            json!({
                "device_class": "illuminance",
                "unit_of_measurement": "lx",
                "state_topic": router.topic(&registry.sensor.id),
            }),
        );
        messages.push(DiscoveryMessage {
            topic: format!(
                "{DISCOVERY_PREFIX}/sensor/{dev}/{}/config",
                registry.sensor.id
            ),
            payload: sensor,
        });

        for binary in &registry.binary_sensors {
            let mut doc = self.generic_vals(&binary.id, router);
            merge(&mut doc, json!({"state_topic": router.topic(&binary.topic)}));
            if let Some(class) = &binary.device_class {
                merge(&mut doc, json!({"device_class": class}));
            }
            messages.push(DiscoveryMessage {
                topic: format!("{DISCOVERY_PREFIX}/binary_sensor/{dev}/{}/config", binary.topic),
                payload: doc,
            });
        }

        let button_topic = router.topic(&registry.button.id);
        let mut button = self.generic_vals(&registry.button.id, router);
        merge(
            &mut button,
            json!({
                "icon": "mdi:gesture-double-tap",
                "json_attributes_topic": &button_topic,
                "state_topic": &button_topic,
                "value_template": "{{ value_json.action }}",
            }),
        );
        messages.push(DiscoveryMessage {
            topic: format!(
                "{DISCOVERY_PREFIX}/sensor/{dev}/{}/config",
                registry.button.id
            ),
            payload: button,
        });
        for action in ButtonAction::ALL {
            // Device automation documents carry no name/unique_id.
            messages.push(DiscoveryMessage {
                topic: format!(
                    "{DISCOVERY_PREFIX}/device_automation/{}_{dev}/action_{action}/config",
                    registry.button.id
                ),
                payload: json!({
                    "device": self.device_block(),
                    "automation_type": "trigger",
                    "topic": format!("{button_topic}/action"),
                    "subtype": action.as_str(),
                    "payload": action.as_str(),
                    "type": "action",
                }),
            });
        }

        let mut light = self.generic_vals(&registry.light.id, router);
        merge(
            &mut light,
            json!({
                "schema": "json",
                "color_mode": true,
                "supported_color_modes": ["rgb"],
                "brightness": true,
                "state_topic": router.topic(&registry.light.id),
                "command_topic": router.topic(&format!("{}/set", registry.light.id)),
            }),
        );
        messages.push(DiscoveryMessage {
            topic: format!(
                "{DISCOVERY_PREFIX}/light/{dev}/{}/config",
                registry.light.id
            ),
            payload: light,
        });

        for command in &registry.commands {
            let mut doc = self.generic_vals(&command.id, router);
            merge(
                &mut doc,
                json!({
                    "state_topic": router.topic(&command.id),
                    "command_topic": router.topic(&format!("{}/set", command.id)),
                }),
            );
            messages.push(DiscoveryMessage {
                topic: format!("{DISCOVERY_PREFIX}/switch/{dev}_{}/config", command.id),
                payload: doc,
            });
        }

        messages
    }
}

/// Merges `extra`'s fields into `doc` (both must be objects).
fn merge(doc: &mut Value, extra: Value) {
    if let (Value::Object(doc), Value::Object(extra)) = (doc, extra) {
        doc.extend(extra);
    }
}
