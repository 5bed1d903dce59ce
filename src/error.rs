// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the `lumibridge` daemon.
//!
//! Only configuration errors are fatal: they abort startup before the
//! bridge connects to the broker. Everything else (transport drops,
//! malformed payloads, hardware read failures, command spawn failures)
//! is logged and recovered at the site where it occurs.

use thiserror::Error;

/// The main error type for this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid or incomplete configuration. Fatal at startup.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Error on the MQTT transport.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Error talking to local hardware (sysfs, GPIO, input device).
    #[error("hardware error: {0}")]
    Hardware(#[from] HardwareError),

    /// A value failed validation.
    #[error("value error: {0}")]
    Value(#[from] ValueError),
}

/// Errors raised while loading or validating the bridge configuration.
///
/// All of these are fatal: the process reports them and exits without
/// starting the bridge.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("cannot read config file {path}: {source}")]
    Io {
        /// Path that failed to open.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The configuration file is not valid JSON.
    #[error("invalid config file: {0}")]
    Json(#[from] serde_json::Error),

    /// A declared binary sensor is missing its GPIO line.
    #[error("GPIO number is not set for binary sensor {0:?}")]
    MissingGpio(String),

    /// A numeric setting that must be non-negative is negative.
    #[error("{field} must be >= 0, got {value}")]
    NegativeValue {
        /// Name of the offending setting.
        field: &'static str,
        /// The rejected value.
        value: f64,
    },

    /// Two configured entities resolved to the same id.
    #[error("duplicate entity id {0:?}")]
    DuplicateEntity(String),

    /// The device identifier could not be resolved from any network
    /// interface and none was configured explicitly.
    #[error("no device id configured and no network interface MAC found")]
    NoDeviceId,
}

/// Errors on the MQTT transport.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Publishing or subscribing through the client failed.
    #[error("MQTT error: {0}")]
    Mqtt(#[from] rumqttc::ClientError),

    /// The connection to the broker dropped.
    #[error("connection lost: {0}")]
    ConnectionLost(String),

    /// An internal channel was closed.
    #[error("channel closed: {0}")]
    ChannelClosed(String),
}

/// Errors reading local hardware.
///
/// A failed read skips the current sampling cycle; the last published
/// value stays authoritative on the bus.
#[derive(Debug, Error)]
pub enum HardwareError {
    /// A sysfs or device file could not be read or written.
    #[error("cannot access {path}: {source}")]
    Io {
        /// Device file path.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A device file held a value that did not parse.
    #[error("unexpected value in {path}: {value:?}")]
    Parse {
        /// Device file path.
        path: String,
        /// The raw text that failed to parse.
        value: String,
    },
}

/// Errors related to value validation and constraints.
///
/// Out-of-range numeric fields on the wire are clamped rather than
/// rejected, so only unparseable power states surface here.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValueError {
    /// An invalid power state string was provided.
    #[error("invalid power state: {0}")]
    InvalidPowerState(String),
}

/// A specialized Result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display() {
        let err = ConfigError::MissingGpio("door".to_string());
        assert_eq!(
            err.to_string(),
            "GPIO number is not set for binary sensor \"door\""
        );
    }

    #[test]
    fn error_from_config_error() {
        let err: Error = ConfigError::NoDeviceId.into();
        assert!(matches!(err, Error::Config(ConfigError::NoDeviceId)));
    }

    #[test]
    fn negative_value_display() {
        let err = ConfigError::NegativeValue {
            field: "sensor_threshold",
            value: -1.0,
        };
        assert_eq!(err.to_string(), "sensor_threshold must be >= 0, got -1");
    }

    #[test]
    fn protocol_error_display() {
        let err = ProtocolError::ConnectionLost("connection refused".to_string());
        assert_eq!(err.to_string(), "connection lost: connection refused");
    }

    #[test]
    fn value_error_display() {
        let err = ValueError::InvalidPowerState("maybe".to_string());
        assert_eq!(err.to_string(), "invalid power state: maybe");
    }
}
