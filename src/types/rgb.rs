// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! RGB color type with 8-bit channels.

use std::fmt;

use serde::{Deserialize, Serialize};

/// RGB color with 8-bit channels (0-255).
///
/// This is the wire representation used in light state payloads:
/// `{"r": 255, "g": 128, "b": 0}`.
///
/// # Examples
///
/// ```
/// use lumibridge::types::RgbColor;
///
/// let orange = RgbColor::new(255, 128, 0);
/// assert_eq!(orange.r, 255);
/// assert_eq!(orange.to_string(), "rgb(255, 128, 0)");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RgbColor {
    /// Red component.
    pub r: u8,
    /// Green component.
    pub g: u8,
    /// Blue component.
    pub b: u8,
}

impl RgbColor {
    /// Full white, the fallback color when a dark light is turned on
    /// without an explicit color.
    pub const WHITE: Self = Self::new(255, 255, 255);

    /// Fully dark.
    pub const BLACK: Self = Self::new(0, 0, 0);

    /// Creates a new RGB color.
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Returns true if every channel is zero.
    #[must_use]
    pub const fn is_black(&self) -> bool {
        self.r == 0 && self.g == 0 && self.b == 0
    }

    /// Linearly interpolates each channel toward `target`.
    ///
    /// `progress` is clamped to `[0.0, 1.0]`; channels are rounded to the
    /// nearest integer at each sampled step.
    #[must_use]
    pub fn lerp(&self, target: Self, progress: f64) -> Self {
        Self {
            r: lerp_channel(self.r, target.r, progress),
            g: lerp_channel(self.g, target.g, progress),
            b: lerp_channel(self.b, target.b, progress),
        }
    }
}

impl Default for RgbColor {
    fn default() -> Self {
        Self::WHITE
    }
}

impl fmt::Display for RgbColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rgb({}, {}, {})", self.r, self.g, self.b)
    }
}

// Channels stay within u8 range because both endpoints do.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn lerp_channel(from: u8, to: u8, progress: f64) -> u8 {
    let progress = progress.clamp(0.0, 1.0);
    let value = f64::from(from) + (f64::from(to) - f64::from(from)) * progress;
    value.round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lerp_endpoints() {
        let from = RgbColor::new(0, 100, 200);
        let to = RgbColor::new(255, 0, 200);
        assert_eq!(from.lerp(to, 0.0), from);
        assert_eq!(from.lerp(to, 1.0), to);
    }

    #[test]
    fn lerp_midpoint_rounds() {
        let from = RgbColor::new(0, 0, 0);
        let to = RgbColor::new(255, 255, 255);
        let mid = from.lerp(to, 0.5);
        assert_eq!(mid, RgbColor::new(128, 128, 128));
    }

    #[test]
    fn lerp_clamps_progress() {
        let from = RgbColor::new(10, 10, 10);
        let to = RgbColor::new(20, 20, 20);
        assert_eq!(from.lerp(to, -1.0), from);
        assert_eq!(from.lerp(to, 2.0), to);
    }

    #[test]
    fn serde_wire_shape() {
        let color = RgbColor::new(10, 20, 30);
        let json = serde_json::to_string(&color).unwrap();
        assert_eq!(json, r#"{"r":10,"g":20,"b":30}"#);
        let back: RgbColor = serde_json::from_str(&json).unwrap();
        assert_eq!(back, color);
    }

    #[test]
    fn black_detection() {
        assert!(RgbColor::BLACK.is_black());
        assert!(!RgbColor::new(0, 0, 1).is_black());
    }
}
