/*
 * This file is part of pifan.
 *
 * Copyright (C) 2025 pifan contributors
 *
 * pifan is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * pifan is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with pifan. If not, see <https://www.gnu.org/licenses/>.
 */

//! Error types for pifan
//!
//! Errors are split by the phase they can occur in. Configuration and
//! hardware activation errors only happen at startup; sensor and actuator
//! errors surface from the control loop as a [`ControlFault`]. Every one of
//! them ends the process with exit status 1.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Startup configuration errors. Raised before any hardware is touched.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Invalid GPIO pin {0}: must be 12, 13, 18, or 19 (hardware PWM)")]
    UnsupportedPin(i32),

    #[error("Invalid threshold table: {0}")]
    InvalidThresholds(String),

    #[error("Invalid polling interval {0}s: must be greater than 0 and at most 3600")]
    InvalidInterval(f64),

    #[error("Invalid configuration value for {field}: {reason}")]
    InvalidValue {
        field: &'static str,
        reason: String,
    },

    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Closed set of failure categories an actuator can report.
///
/// The control loop only ever sees these kinds, never a driver's own
/// error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorErrorKind {
    /// PWM driver is not loaded or not reachable
    DriverUnavailable,
    /// The requested PWM channel does not exist or cannot be exported
    BadChannel,
    /// Duty value outside the actuator's native range
    BadDutyValue,
    /// The pin could not be switched to its PWM alternate function
    BadMode,
    /// Any other I/O failure while talking to the driver
    Io,
}

impl fmt::Display for ActuatorErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::DriverUnavailable => "driver unavailable",
            Self::BadChannel => "bad channel",
            Self::BadDutyValue => "bad duty value",
            Self::BadMode => "bad pin mode",
            Self::Io => "I/O error",
        };
        f.write_str(s)
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("PWM actuator error ({kind}): {detail}")]
pub struct ActuatorError {
    pub kind: ActuatorErrorKind,
    pub detail: String,
}

impl ActuatorError {
    pub fn new(kind: ActuatorErrorKind, detail: impl Into<String>) -> Self {
        Self { kind, detail: detail.into() }
    }

    pub fn bad_duty(value: u16, max: u16) -> Self {
        Self::new(
            ActuatorErrorKind::BadDutyValue,
            format!("duty {} out of range (0-{})", value, max),
        )
    }
}

/// One-time hardware handshake failed. There is no retry path.
#[derive(thiserror::Error, Debug)]
#[error("Error initializing PWM hardware on GPIO {gpio}: {source}")]
pub struct HardwareError {
    pub gpio: i32,
    #[source]
    pub source: ActuatorError,
}

/// Anything that stops the controller before the first temperature sample.
#[derive(thiserror::Error, Debug)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Hardware(#[from] HardwareError),
}

#[derive(thiserror::Error, Debug)]
pub enum SensorError {
    #[error("Failed to read temperature from {path}: {source}")]
    Unavailable {
        path: PathBuf,
        source: io::Error,
    },

    #[error("Malformed temperature reading in {path}: '{content}'")]
    Malformed {
        path: PathBuf,
        content: String,
    },
}

/// Fatal condition raised by the control loop.
#[derive(thiserror::Error, Debug)]
pub enum ControlFault {
    /// The sensor could not be read. `failsafe` holds the error from the
    /// full-speed write attempted before giving up, if that failed too.
    #[error("Error reading CPU temp: {source}")]
    SensorRead {
        source: SensorError,
        failsafe: Option<ActuatorError>,
    },

    #[error("Error setting fan duty to {duty}: {source}")]
    ActuatorWrite {
        duty: u16,
        source: ActuatorError,
    },
}

impl ControlFault {
    /// Whether the fan was left at full speed before the fault was returned.
    pub fn failed_safe(&self) -> bool {
        matches!(self, Self::SensorRead { failsafe: None, .. })
    }
}
