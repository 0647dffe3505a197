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

use std::fs;
use std::path::PathBuf;

use crate::error::SensorError;

/// Read side of the loop: a chip temperature in millidegrees Celsius.
#[cfg_attr(test, mockall::automock)]
pub trait TemperatureSensor {
    fn read_raw(&mut self) -> Result<i64, SensorError>;
}

/// A sysfs thermal zone `temp` file.
///
/// The file is reopened on every read, so a zone that disappears at
/// runtime shows up as a read failure on the next sample.
#[derive(Debug, Clone)]
pub struct ThermalZoneSensor {
    path: PathBuf,
}

impl ThermalZoneSensor {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl TemperatureSensor for ThermalZoneSensor {
    fn read_raw(&mut self) -> Result<i64, SensorError> {
        let content = fs::read_to_string(&self.path)
            .map_err(|source| SensorError::Unavailable { path: self.path.clone(), source })?;
        let trimmed = content.trim();
        trimmed.parse::<i64>().map_err(|_| SensorError::Malformed {
            path: self.path.clone(),
            content: trimmed.to_string(),
        })
    }
}
