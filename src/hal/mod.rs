// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Hardware access layer.
//!
//! The bridge core consumes hardware through these traits so the event
//! loop and its tests never touch real device files. The production
//! implementations live in [`sysfs`] (LED, IIO illuminance, GPIO) and
//! [`input`] (button events from a Linux input device).
//!
//! All trait methods are synchronous and bounded: sysfs reads and writes
//! complete in microseconds. The one genuinely blocking source, the
//! button input device, is read on a dedicated thread that feeds edges
//! into the event loop over a channel.

pub mod input;
pub mod sysfs;

use crate::error::HardwareError;
use crate::types::LightState;

/// A press or release edge from the physical button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    /// Button went down.
    Press,
    /// Button came up.
    Release,
}

/// Drives the RGB status light.
pub trait LightDriver: Send + Sync {
    /// Applies a light state to the hardware.
    ///
    /// # Errors
    ///
    /// Returns [`HardwareError`] when a PWM write fails; the caller logs
    /// and continues.
    fn apply(&self, state: &LightState) -> Result<(), HardwareError>;

    /// Reads the state the hardware is currently showing, used once at
    /// startup to seed the bridge's light state.
    ///
    /// # Errors
    ///
    /// Returns [`HardwareError`] when the PWM values cannot be read.
    fn read_initial(&self) -> Result<LightState, HardwareError>;
}

/// Reads the analog illuminance sensor.
pub trait IlluminanceReader: Send + Sync {
    /// Samples the sensor, returning a value in lux.
    ///
    /// # Errors
    ///
    /// Returns [`HardwareError`] on a failed or unparseable read; the
    /// sampling cycle is skipped and the next poll retries.
    fn read(&self) -> Result<f64, HardwareError>;
}

/// Reads one GPIO-wired binary input.
pub trait GpioInput: Send + Sync {
    /// Samples the line. `true` means active.
    ///
    /// # Errors
    ///
    /// Returns [`HardwareError`] on a failed read; the sampling cycle is
    /// skipped.
    fn read(&self) -> Result<bool, HardwareError>;
}
