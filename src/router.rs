// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Topic routing for inbound MQTT messages.
//!
//! The router owns the resolved root topic and maps subtopics below it
//! to entities: `<root>/<entity>` is state (published by us),
//! `<root>/<entity>/set` is a command (subscribed). Payloads are decoded
//! exactly once here; downstream handlers receive a typed [`Route`].
//!
//! Unknown topics are ignored without error, so retained or foreign
//! messages sharing the broker never disturb the bridge.

use crate::registry::{CustomCommand, Registry, SetTarget};
use crate::types::{LightRequest, Payload, PowerState};

/// Availability subtopic (also the LWT topic).
pub const STATUS_SUFFIX: &str = "status";

/// A routed inbound message.
#[derive(Debug, PartialEq)]
pub enum Route<'a> {
    /// A light `set` command.
    LightSet(LightRequest),
    /// A custom command `set` with its decoded payload.
    CommandSet {
        /// The addressed command entity.
        command: &'a CustomCommand,
        /// JSON object or opaque text.
        payload: Payload,
    },
    /// Not for us; dropped silently.
    Ignored,
}

/// Maps topics to entities under a resolved root.
///
/// # Examples
///
/// ```
/// use lumibridge::router::TopicRouter;
///
/// let router = TopicRouter::new("lumi/a1b2c3");
/// assert_eq!(router.topic("light"), "lumi/a1b2c3/light");
/// assert_eq!(router.status_topic(), "lumi/a1b2c3/status");
/// ```
#[derive(Debug, Clone)]
pub struct TopicRouter {
    root: String,
}

impl TopicRouter {
    /// Creates a router for the given resolved root topic.
    #[must_use]
    pub fn new(root: impl Into<String>) -> Self {
        Self { root: root.into() }
    }

    /// The resolved root topic.
    #[must_use]
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Builds the full topic for an entity suffix.
    #[must_use]
    pub fn topic(&self, suffix: &str) -> String {
        format!("{}/{suffix}", self.root)
    }

    /// The availability (LWT) topic.
    #[must_use]
    pub fn status_topic(&self) -> String {
        self.topic(STATUS_SUFFIX)
    }

    /// The wildcard filter covering every command topic under the root.
    ///
    /// Deliberately `+/set` rather than `#`: the bridge's own state
    /// echoes must never re-enter the router.
    #[must_use]
    pub fn subscription_filter(&self) -> String {
        format!("{}/+/set", self.root)
    }

    /// Routes one inbound message.
    pub fn route<'a>(&self, registry: &'a Registry, topic: &str, payload: &[u8]) -> Route<'a> {
        let Some(suffix) = topic
            .strip_prefix(self.root.as_str())
            .and_then(|rest| rest.strip_prefix('/'))
        else {
            return Route::Ignored;
        };
        let Some(entity) = suffix.strip_suffix("/set") else {
            tracing::debug!(topic, "ignoring non-command topic");
            return Route::Ignored;
        };
        match registry.lookup_set(entity) {
            Some(SetTarget::Light) => match Payload::decode(payload) {
                Payload::Json(map) => Route::LightSet(LightRequest::from_json(&map)),
                // Plain ON/OFF still works for the light; anything else
                // on this topic is dropped.
                Payload::Text(text) => match PowerState::parse(&text) {
                    Ok(state) => Route::LightSet(LightRequest {
                        state: Some(state),
                        ..LightRequest::default()
                    }),
                    Err(_) => {
                        tracing::warn!(topic, "undecodable light payload");
                        Route::Ignored
                    }
                },
            },
            Some(SetTarget::Command(command)) => Route::CommandSet {
                command,
                payload: Payload::decode(payload),
            },
            None => {
                tracing::debug!(topic, "no entity for topic");
                Route::Ignored
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::config::BridgeConfig;
    use crate::error::HardwareError;
    use crate::hal::{GpioInput, IlluminanceReader, LightDriver};
    use crate::types::{LightState, RgbColor};

    struct NullLight;
    impl LightDriver for NullLight {
        fn apply(&self, _state: &LightState) -> Result<(), HardwareError> {
            Ok(())
        }
        fn read_initial(&self) -> Result<LightState, HardwareError> {
            Ok(LightState::default())
        }
    }

    struct NullIlluminance;
    impl IlluminanceReader for NullIlluminance {
        fn read(&self) -> Result<f64, HardwareError> {
            Ok(0.0)
        }
    }

    struct NullGpio;
    impl GpioInput for NullGpio {
        fn read(&self) -> Result<bool, HardwareError> {
            Ok(false)
        }
    }

    fn registry() -> Registry {
        let config: BridgeConfig =
            serde_json::from_str(r#"{"custom_commands": {"tts": "say {text}"}}"#).unwrap();
        Registry::build(
            &config,
            Arc::new(NullLight),
            Arc::new(NullIlluminance),
            |_| Arc::new(NullGpio),
        )
        .unwrap()
    }

    #[test]
    fn light_set_json_decodes_recognized_fields() {
        let router = TopicRouter::new("lumi/a1b2c3");
        let registry = registry();
        let route = router.route(
            &registry,
            "lumi/a1b2c3/light/set",
            br#"{"state":"ON","brightness":128,"color":{"r":10,"g":20,"b":30}}"#,
        );
        let Route::LightSet(req) = route else {
            panic!("expected LightSet, got {route:?}");
        };
        assert_eq!(req.state, Some(PowerState::On));
        assert_eq!(req.brightness, Some(128));
        assert_eq!(req.color, Some(RgbColor::new(10, 20, 30)));
    }

    #[test]
    fn light_set_plain_on_off() {
        let router = TopicRouter::new("lumi/a1b2c3");
        let registry = registry();
        let route = router.route(&registry, "lumi/a1b2c3/light/set", b"OFF");
        assert_eq!(
            route,
            Route::LightSet(LightRequest {
                state: Some(PowerState::Off),
                ..LightRequest::default()
            })
        );
    }

    #[test]
    fn command_text_payload_stays_text() {
        let router = TopicRouter::new("lumi/a1b2c3");
        let registry = registry();
        let route = router.route(&registry, "lumi/a1b2c3/tts/set", b"hello");
        let Route::CommandSet { command, payload } = route else {
            panic!("expected CommandSet");
        };
        assert_eq!(command.id, "tts");
        assert_eq!(payload, Payload::Text("hello".to_string()));
    }

    #[test]
    fn command_json_payload_decodes() {
        let router = TopicRouter::new("lumi/a1b2c3");
        let registry = registry();
        let route = router.route(&registry, "lumi/a1b2c3/tts/set", br#"{"text": "hi"}"#);
        assert!(matches!(
            route,
            Route::CommandSet { payload: Payload::Json(_), .. }
        ));
    }

    #[test]
    fn foreign_and_state_topics_ignored() {
        let router = TopicRouter::new("lumi/a1b2c3");
        let registry = registry();
        // Foreign root.
        assert_eq!(
            router.route(&registry, "zigbee2mqtt/light/set", b"{}"),
            Route::Ignored
        );
        // Our own state echo.
        assert_eq!(
            router.route(&registry, "lumi/a1b2c3/light", b"{}"),
            Route::Ignored
        );
        // Unknown entity.
        assert_eq!(
            router.route(&registry, "lumi/a1b2c3/nope/set", b"{}"),
            Route::Ignored
        );
        // Root prefix must match on a topic-level boundary.
        assert_eq!(
            router.route(&registry, "lumi/a1b2c3x/light/set", b"{}"),
            Route::Ignored
        );
    }

    #[test]
    fn garbage_light_payload_ignored() {
        let router = TopicRouter::new("lumi/a1b2c3");
        let registry = registry();
        assert_eq!(
            router.route(&registry, "lumi/a1b2c3/light/set", b"{broken"),
            Route::Ignored
        );
    }
}
