// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Sysfs-backed hardware implementations for the Xiaomi gateway.
//!
//! - RGB light: three LED class devices (`/sys/class/leds/{red,green,blue}`,
//!   with a legacy `/sys/class/backlight/lumi_*` fallback on old firmwares)
//! - illuminance: an IIO voltage channel
//! - binary sensors: exported GPIO lines

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::HardwareError;
use crate::hal::{GpioInput, IlluminanceReader, LightDriver};
use crate::types::{LightState, PowerState, RgbColor};

/// Raw IIO reading to lux conversion factor for the gateway's sensor.
const ILLUMINANCE_COEFFICIENT: f64 = 0.25;

/// Default IIO channel for the gateway's illuminance sensor.
pub const DEFAULT_ILLUMINANCE_PATH: &str = "/sys/bus/iio/devices/iio:device0/in_voltage5_raw";

fn read_trimmed(path: &Path) -> Result<String, HardwareError> {
    fs::read_to_string(path)
        .map(|raw| raw.trim().to_string())
        .map_err(|source| HardwareError::Io {
            path: path.display().to_string(),
            source,
        })
}

fn read_number(path: &Path) -> Result<u32, HardwareError> {
    let raw = read_trimmed(path)?;
    raw.parse().map_err(|_| HardwareError::Parse {
        path: path.display().to_string(),
        value: raw,
    })
}

fn write_value(path: &Path, value: impl std::fmt::Display) -> Result<(), HardwareError> {
    let io_err = |source| HardwareError::Io {
        path: path.display().to_string(),
        source,
    };
    let mut file = fs::OpenOptions::new().write(true).open(path).map_err(io_err)?;
    writeln!(file, "{value}").map_err(io_err)
}

/// One LED class channel: a `brightness` file plus its `max_brightness`.
#[derive(Debug, Clone)]
struct LedChannel {
    brightness: PathBuf,
    pwm_max: u32,
}

impl LedChannel {
    fn open(dir: &Path) -> Result<Self, HardwareError> {
        let pwm_max = read_number(&dir.join("max_brightness"))?;
        Ok(Self {
            brightness: dir.join("brightness"),
            pwm_max,
        })
    }

    fn read(&self) -> Result<u32, HardwareError> {
        read_number(&self.brightness)
    }

    /// Scales an 8-bit channel value by brightness into PWM units.
    fn write_scaled(&self, channel: u8, brightness: u8, on: bool) -> Result<(), HardwareError> {
        let pwm = if on {
            let scaled = f64::from(channel) * f64::from(self.pwm_max) / 255.0
                * f64::from(brightness)
                / 255.0;
            // Bounded by pwm_max, which fits u32.
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let pwm = scaled.round().clamp(0.0, f64::from(self.pwm_max)) as u32;
            pwm
        } else {
            0
        };
        write_value(&self.brightness, pwm)
    }
}

/// The gateway's RGB light, driven through three sysfs LED devices.
#[derive(Debug, Clone)]
pub struct SysfsLight {
    red: LedChannel,
    green: LedChannel,
    blue: LedChannel,
}

impl SysfsLight {
    /// Opens the light at the standard LED class paths, falling back to
    /// the legacy backlight paths found on old gateway firmwares.
    ///
    /// # Errors
    ///
    /// Returns [`HardwareError`] when neither layout is present.
    pub fn detect() -> Result<Self, HardwareError> {
        if Path::new("/sys/class/backlight/lumi_r").exists() {
            Self::open(
                "/sys/class/backlight/lumi_r",
                "/sys/class/backlight/lumi_g",
                "/sys/class/backlight/lumi_b",
            )
        } else {
            Self::open(
                "/sys/class/leds/red",
                "/sys/class/leds/green",
                "/sys/class/leds/blue",
            )
        }
    }

    /// Opens the light from explicit per-channel directories.
    ///
    /// # Errors
    ///
    /// Returns [`HardwareError`] when a channel's `max_brightness` cannot
    /// be read.
    pub fn open(
        red: impl AsRef<Path>,
        green: impl AsRef<Path>,
        blue: impl AsRef<Path>,
    ) -> Result<Self, HardwareError> {
        Ok(Self {
            red: LedChannel::open(red.as_ref())?,
            green: LedChannel::open(green.as_ref())?,
            blue: LedChannel::open(blue.as_ref())?,
        })
    }
}

impl LightDriver for SysfsLight {
    fn apply(&self, state: &LightState) -> Result<(), HardwareError> {
        let on = state.state.is_on();
        self.red.write_scaled(state.color.r, state.brightness, on)?;
        self.green.write_scaled(state.color.g, state.brightness, on)?;
        self.blue.write_scaled(state.color.b, state.brightness, on)
    }

    fn read_initial(&self) -> Result<LightState, HardwareError> {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        fn scale(raw: u32, max: u32) -> u8 {
            if max == 0 {
                return 0;
            }
            (f64::from(raw) / f64::from(max) * 255.0).round().clamp(0.0, 255.0) as u8
        }
        let r = self.red.read()?;
        let g = self.green.read()?;
        let b = self.blue.read()?;
        let lit = r > 0 || g > 0 || b > 0;
        Ok(LightState {
            state: if lit { PowerState::On } else { PowerState::Off },
            brightness: 255,
            color: RgbColor::new(
                scale(r, self.red.pwm_max),
                scale(g, self.green.pwm_max),
                scale(b, self.blue.pwm_max),
            ),
        })
    }
}

/// The gateway's IIO illuminance channel.
#[derive(Debug, Clone)]
pub struct SysfsIlluminance {
    path: PathBuf,
}

impl SysfsIlluminance {
    /// Creates a reader for the given raw IIO channel file.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Default for SysfsIlluminance {
    fn default() -> Self {
        Self::new(DEFAULT_ILLUMINANCE_PATH)
    }
}

impl IlluminanceReader for SysfsIlluminance {
    fn read(&self) -> Result<f64, HardwareError> {
        let raw = read_number(&self.path)?;
        Ok((f64::from(raw) * ILLUMINANCE_COEFFICIENT).floor())
    }
}

/// A GPIO line exported through the sysfs GPIO interface.
#[derive(Debug, Clone)]
pub struct SysfsGpio {
    value_path: PathBuf,
}

impl SysfsGpio {
    /// Exports the line (if not already exported), sets it as an input
    /// and returns a reader for it.
    ///
    /// # Errors
    ///
    /// Returns [`HardwareError`] when the export or direction write
    /// fails.
    pub fn export(gpio: u32) -> Result<Self, HardwareError> {
        let base = PathBuf::from(format!("/sys/class/gpio/gpio{gpio}"));
        if !base.exists() {
            write_value(Path::new("/sys/class/gpio/export"), gpio)?;
            write_value(&base.join("direction"), "in")?;
        }
        Ok(Self {
            value_path: base.join("value"),
        })
    }

    /// Creates a reader for an already-exported line's value file. Used
    /// by tests.
    #[must_use]
    pub fn from_value_path(path: impl Into<PathBuf>) -> Self {
        Self {
            value_path: path.into(),
        }
    }
}

impl GpioInput for SysfsGpio {
    fn read(&self) -> Result<bool, HardwareError> {
        let raw = read_trimmed(&self.value_path)?;
        match raw.as_str() {
            "0" => Ok(false),
            "1" => Ok(true),
            _ => Err(HardwareError::Parse {
                path: self.value_path.display().to_string(),
                value: raw,
            }),
        }
    }
}
