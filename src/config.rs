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
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::constants::{control, paths, pwm};
use crate::error::ConfigError;

/// One fan speed step: at or above `threshold_c`, drive `duty`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tier {
    pub threshold_c: f64,
    pub duty: u16,
}

/// Tiers sorted by strictly descending threshold.
///
/// Below the lowest threshold the fan idles at duty 0.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdTable {
    tiers: Vec<Tier>,
}

impl ThresholdTable {
    pub fn new(tiers: Vec<Tier>) -> Result<Self, ConfigError> {
        if tiers.is_empty() {
            return Err(ConfigError::InvalidThresholds("at least one tier required".into()));
        }
        if tiers.len() > control::MAX_TIERS {
            return Err(ConfigError::InvalidThresholds(format!(
                "too many tiers (max {})",
                control::MAX_TIERS
            )));
        }
        let mut last = f64::INFINITY;
        for t in &tiers {
            if !t.threshold_c.is_finite() {
                return Err(ConfigError::InvalidThresholds("threshold must be a finite number".into()));
            }
            if t.threshold_c >= last {
                return Err(ConfigError::InvalidThresholds(
                    "thresholds must be strictly descending".into(),
                ));
            }
            if t.duty > pwm::MAX_DUTY {
                return Err(ConfigError::InvalidThresholds(format!(
                    "duty {} out of range (0-{})",
                    t.duty,
                    pwm::MAX_DUTY
                )));
            }
            last = t.threshold_c;
        }
        Ok(Self { tiers })
    }

    /// Duty for `temp_c`: the first tier whose threshold is at or below it.
    ///
    /// Comparison is inclusive and has no hysteresis, so a reading sitting
    /// exactly on a boundary selects the higher tier every time.
    pub fn select(&self, temp_c: f64) -> u16 {
        self.tiers
            .iter()
            .find(|t| temp_c >= t.threshold_c)
            .map(|t| t.duty)
            .unwrap_or(pwm::IDLE)
    }

    pub fn tiers(&self) -> &[Tier] {
        &self.tiers
    }
}

impl Default for ThresholdTable {
    fn default() -> Self {
        Self {
            tiers: control::DEFAULT_TIERS
                .iter()
                .map(|&(threshold_c, duty)| Tier { threshold_c, duty })
                .collect(),
        }
    }
}

/// Everything the controller needs, resolved once at startup.
#[derive(Debug, Clone)]
pub struct FanConfig {
    /// BCM GPIO number driving the fan
    pub pin: i32,
    pub interval: Duration,
    pub thresholds: ThresholdTable,
    /// Log every sample and write, not just the first
    pub verbose: bool,
    pub sensor_path: PathBuf,
    pub pwm_chip: PathBuf,
    pub pwm_period_ns: u32,
}

impl Default for FanConfig {
    fn default() -> Self {
        Self {
            pin: control::DEFAULT_GPIO,
            interval: control::DEFAULT_INTERVAL,
            thresholds: ThresholdTable::default(),
            verbose: false,
            sensor_path: PathBuf::from(paths::THERMAL_ZONE_TEMP),
            pwm_chip: PathBuf::from(paths::PWM_CHIP),
            pwm_period_ns: pwm::DEFAULT_PERIOD_NS,
        }
    }
}

/// A tier as written in the config file.
///
/// Exactly one of `duty` (native, 0-1023) or `duty_pct` (0-100) must be set.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileTier {
    pub threshold_c: f64,
    #[serde(default)]
    pub duty: Option<u16>,
    #[serde(default)]
    pub duty_pct: Option<f32>,
}

/// On-disk configuration. Every field is optional and overrides the default.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub pin: Option<i32>,
    #[serde(default)]
    pub interval_secs: Option<f64>,
    #[serde(default)]
    pub thresholds: Option<Vec<FileTier>>,
    #[serde(default)]
    pub verbose: Option<bool>,
    #[serde(default)]
    pub sensor_path: Option<PathBuf>,
    #[serde(default)]
    pub pwm_chip: Option<PathBuf>,
    #[serde(default)]
    pub pwm_period_ns: Option<u32>,
}

/// Values given on the command line. They win over the file.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub pin: Option<i32>,
    pub interval_secs: Option<f64>,
    pub verbose: bool,
}

pub fn system_config_path() -> PathBuf {
    PathBuf::from(paths::SYSTEM_CONFIG)
}

pub fn read_file_config(path: &Path) -> Result<FileConfig, ConfigError> {
    let data = fs::read_to_string(path)
        .map_err(|source| ConfigError::FileRead { path: path.to_path_buf(), source })?;
    serde_json::from_str(&data)
        .map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })
}

fn interval_from_secs(secs: f64) -> Result<Duration, ConfigError> {
    if !secs.is_finite() || secs <= 0.0 || secs > control::MAX_INTERVAL_SECS {
        return Err(ConfigError::InvalidInterval(secs));
    }
    Ok(Duration::from_secs_f64(secs))
}

fn tiers_from_file(tiers: &[FileTier]) -> Result<ThresholdTable, ConfigError> {
    let mut out = Vec::with_capacity(tiers.len());
    for t in tiers {
        let duty = match (t.duty, t.duty_pct) {
            (Some(duty), None) => duty,
            (None, Some(duty_pct)) => {
                if !(0.0..=100.0).contains(&duty_pct) {
                    return Err(ConfigError::InvalidThresholds(format!(
                        "duty_pct {} out of range (0-100)",
                        duty_pct
                    )));
                }
                pwm::from_percent(duty_pct)
            }
            (Some(_), Some(_)) => {
                return Err(ConfigError::InvalidThresholds(format!(
                    "tier at {}C sets both duty and duty_pct",
                    t.threshold_c
                )));
            }
            (None, None) => {
                return Err(ConfigError::InvalidThresholds(format!(
                    "tier at {}C needs duty or duty_pct",
                    t.threshold_c
                )));
            }
        };
        out.push(Tier { threshold_c: t.threshold_c, duty });
    }
    ThresholdTable::new(out)
}

impl FanConfig {
    /// Layer an optional file and command-line overrides over the defaults.
    ///
    /// The GPIO number is carried through unchecked; the pin resolver owns
    /// that validation.
    pub fn build(file: Option<FileConfig>, overrides: &Overrides) -> Result<Self, ConfigError> {
        let mut cfg = FanConfig::default();

        if let Some(file) = file {
            if let Some(pin) = file.pin {
                cfg.pin = pin;
            }
            if let Some(secs) = file.interval_secs {
                cfg.interval = interval_from_secs(secs)?;
            }
            if let Some(tiers) = &file.thresholds {
                cfg.thresholds = tiers_from_file(tiers)?;
            }
            if let Some(verbose) = file.verbose {
                cfg.verbose = verbose;
            }
            if let Some(path) = file.sensor_path {
                cfg.sensor_path = path;
            }
            if let Some(chip) = file.pwm_chip {
                cfg.pwm_chip = chip;
            }
            if let Some(period) = file.pwm_period_ns {
                if period == 0 {
                    return Err(ConfigError::InvalidValue {
                        field: "pwm_period_ns",
                        reason: "must be greater than 0".into(),
                    });
                }
                cfg.pwm_period_ns = period;
            }
        }

        if let Some(pin) = overrides.pin {
            cfg.pin = pin;
        }
        if let Some(secs) = overrides.interval_secs {
            cfg.interval = interval_from_secs(secs)?;
        }
        cfg.verbose |= overrides.verbose;

        Ok(cfg)
    }

    /// Load from `explicit` if given, else from the system path when present.
    pub fn load(explicit: Option<&Path>, overrides: &Overrides) -> Result<Self, ConfigError> {
        let file = match explicit {
            Some(path) => Some(read_file_config(path)?),
            None => {
                let system = system_config_path();
                if system.exists() {
                    Some(read_file_config(&system)?)
                } else {
                    None
                }
            }
        };
        Self::build(file, overrides)
    }
}
