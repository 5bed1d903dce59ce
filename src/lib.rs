// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `lumibridge` - an MQTT automation bridge for the Xiaomi gateway.
//!
//! The bridge exposes the gateway's local hardware as addressable MQTT
//! entities following the Home Assistant discovery convention:
//!
//! - the illuminance sensor, debounced into a sparse state stream
//! - the RGB status light, with smooth timed transitions
//! - the physical button, classified into multi-press gestures
//! - GPIO-wired binary sensors
//! - arbitrary shell commands templated from inbound payloads
//!
//! # Topic layout
//!
//! With a root of `lumi/a1b2c3` (the suffix is the device's MAC unless
//! configured otherwise):
//!
//! ```text
//! lumi/a1b2c3/status        availability: online/offline (retained, LWT)
//! lumi/a1b2c3/light         state, JSON {"state","brightness","color"}
//! lumi/a1b2c3/light/set     command, any subset of the state fields
//!                           plus "transition" (seconds)
//! lumi/a1b2c3/illuminance   state, plain integer
//! lumi/a1b2c3/btn0/action   state, e.g. single / double / hold
//! lumi/a1b2c3/<sensor>      state, ON/OFF
//! lumi/a1b2c3/<command>/set command, JSON object or plain text
//! ```
//!
//! # Architecture
//!
//! A single event-loop task ([`bridge::Bridge`]) owns all entity state
//! and multiplexes the MQTT connection, sensor polling, button edges
//! and light animation ticks. Blocking work never runs on that task:
//! the button device is read on a dedicated thread and shell commands
//! run on detached tasks that signal completion over a channel.
//!
//! # Quick start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use lumibridge::bridge::Bridge;
//! use lumibridge::config::BridgeConfig;
//! use lumibridge::hal::input::{BTN_0, DEFAULT_BUTTON_DEVICE, InputButton};
//! use lumibridge::hal::sysfs::{SysfsGpio, SysfsIlluminance, SysfsLight};
//! use lumibridge::registry::Registry;
//!
//! #[tokio::main]
//! async fn main() -> lumibridge::Result<()> {
//!     let config = BridgeConfig::load("/etc/lumimqtt.json")?;
//!     let registry = Registry::build(
//!         &config,
//!         Arc::new(SysfsLight::detect()?),
//!         Arc::new(SysfsIlluminance::default()),
//!         |gpio| Arc::new(SysfsGpio::export(gpio).expect("gpio")),
//!     )?;
//!     // No button device is fine: pass `None` and the branch never fires.
//!     let button_rx = InputButton::new(DEFAULT_BUTTON_DEVICE, vec![BTN_0])
//!         .spawn_reader()
//!         .ok();
//!     Bridge::new(config, registry, button_rx)?.run().await
//! }
//! ```

pub mod bridge;
pub mod button;
pub mod config;
pub mod discovery;
pub mod dispatch;
pub mod error;
pub mod filter;
pub mod hal;
pub mod registry;
pub mod router;
pub mod transition;
pub mod types;

pub use bridge::Bridge;
pub use config::BridgeConfig;
pub use discovery::{DiscoveryMessage, DiscoveryPublisher};
pub use dispatch::CommandDispatcher;
pub use error::{ConfigError, Error, HardwareError, ProtocolError, Result, ValueError};
pub use filter::{ChangeFilter, DebounceFilter};
pub use registry::Registry;
pub use router::{Route, TopicRouter};
pub use transition::TransitionController;
