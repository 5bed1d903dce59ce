// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Light state: power, brightness and color, plus the JSON wire shape
//! used on the light's state and command topics.

use serde::{Deserialize, Serialize};

use crate::error::ValueError;
use crate::types::RgbColor;

/// Power state of a switchable entity.
///
/// Serialized as `"ON"` / `"OFF"` on the wire (Home Assistant JSON
/// schema convention).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PowerState {
    /// The entity is on.
    #[serde(rename = "ON", alias = "on", alias = "On")]
    On,
    /// The entity is off.
    #[serde(rename = "OFF", alias = "off", alias = "Off")]
    Off,
}

impl PowerState {
    /// Returns true for [`PowerState::On`].
    #[must_use]
    pub const fn is_on(self) -> bool {
        matches!(self, Self::On)
    }

    /// Parses a power state from text, case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns [`ValueError::InvalidPowerState`] for anything other than
    /// `on`/`off`.
    pub fn parse(text: &str) -> Result<Self, ValueError> {
        match text.trim().to_ascii_lowercase().as_str() {
            "on" | "1" | "true" => Ok(Self::On),
            "off" | "0" | "false" => Ok(Self::Off),
            other => Err(ValueError::InvalidPowerState(other.to_string())),
        }
    }
}

impl std::fmt::Display for PowerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::On => write!(f, "ON"),
            Self::Off => write!(f, "OFF"),
        }
    }
}

/// The full observable state of the RGB light.
///
/// This is the payload published on `<root>/light` and the target shape
/// accepted (as an arbitrary subset) on `<root>/light/set`.
///
/// # Examples
///
/// ```
/// use lumibridge::types::{LightState, PowerState, RgbColor};
///
/// let state = LightState {
///     state: PowerState::On,
///     brightness: 255,
///     color: RgbColor::new(255, 0, 0),
/// };
/// let json = serde_json::to_string(&state).unwrap();
/// assert_eq!(
///     json,
///     r#"{"state":"ON","brightness":255,"color":{"r":255,"g":0,"b":0}}"#
/// );
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LightState {
    /// Whether the light is on.
    pub state: PowerState,
    /// Brightness, 0-255.
    pub brightness: u8,
    /// RGB color.
    pub color: RgbColor,
}

impl LightState {
    /// Effective brightness for interpolation purposes: an off light
    /// animates from zero regardless of its stored brightness.
    #[must_use]
    pub fn effective_brightness(&self) -> u8 {
        if self.state.is_on() { self.brightness } else { 0 }
    }
}

impl Default for LightState {
    fn default() -> Self {
        Self {
            state: PowerState::Off,
            brightness: 255,
            color: RgbColor::WHITE,
        }
    }
}

/// A partial light update decoded from a `set` payload.
///
/// Every field is optional; absent fields keep their current value.
/// Unrecognized fields are ignored on decode.
///
/// # Examples
///
/// ```
/// use lumibridge::types::LightRequest;
///
/// let req: LightRequest =
///     serde_json::from_str(r#"{"brightness": 100, "transition": 10}"#).unwrap();
/// assert_eq!(req.brightness, Some(100));
/// assert_eq!(req.transition, Some(10.0));
/// assert!(req.state.is_none());
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
pub struct LightRequest {
    /// Requested power state.
    pub state: Option<PowerState>,
    /// Requested brightness, 0-255.
    pub brightness: Option<u8>,
    /// Requested color.
    pub color: Option<RgbColor>,
    /// Transition duration in seconds. Falls back to the configured
    /// default when absent.
    pub transition: Option<f64>,
}

impl LightRequest {
    /// Extracts a request from a decoded JSON object, leniently.
    ///
    /// Recognized fields are `state`, `brightness`, `color.{r,g,b}` and
    /// `transition`; everything else is ignored. Numeric fields are
    /// clamped into range instead of rejected, so a `brightness` of 300
    /// arrives as 255.
    #[must_use]
    pub fn from_json(map: &serde_json::Map<String, serde_json::Value>) -> Self {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        fn channel(value: &serde_json::Value) -> Option<u8> {
            value.as_f64().map(|v| v.round().clamp(0.0, 255.0) as u8)
        }
        let color = map.get("color").and_then(|value| {
            let obj = value.as_object()?;
            Some(RgbColor::new(
                obj.get("r").and_then(channel).unwrap_or(0),
                obj.get("g").and_then(channel).unwrap_or(0),
                obj.get("b").and_then(channel).unwrap_or(0),
            ))
        });
        Self {
            state: map
                .get("state")
                .and_then(serde_json::Value::as_str)
                .and_then(|text| PowerState::parse(text).ok()),
            brightness: map.get("brightness").and_then(channel),
            color,
            transition: map
                .get("transition")
                .and_then(serde_json::Value::as_f64)
                .map(|secs| secs.max(0.0)),
        }
    }

    /// Resolves this partial request against the current state into a
    /// concrete target.
    ///
    /// Original gateway behavior: turning on a dark light whose color is
    /// all-zero defaults the color to white, so the animation has
    /// something visible to fade toward.
    #[must_use]
    pub fn resolve(&self, current: &LightState) -> LightState {
        let mut color = self.color.unwrap_or(current.color);
        let state = self.state.unwrap_or(current.state);
        if !current.state.is_on() && color.is_black() {
            color = RgbColor::WHITE;
        }
        LightState {
            state,
            brightness: self.brightness.unwrap_or(current.brightness),
            color,
        }
    }
}
