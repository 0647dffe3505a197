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

//! PWM output
//!
//! [`SysfsPwm`] drives the Linux PWM class device. The controller must be
//! enabled in the device tree (`dtoverlay=pwm-2chan` or `dtoverlay=pwm`)
//! so that `/sys/class/pwm/pwmchip0` exists.
//!
//! # Duty values
//!
//! Duty values are native 10-bit numbers:
//! - 0 = fan off
//! - 1023 = full speed
//!
//! They are scaled to nanoseconds of the configured period on write.
//! Values above 1023 are rejected, never clamped.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::thread;

use tracing::{debug, info, warn};

use crate::constants::{pwm, sysfs};
use crate::error::{ActuatorError, ActuatorErrorKind};
use crate::pins::HardwareChannel;

/// Write side of the fan: one-time setup plus duty writes.
#[cfg_attr(test, mockall::automock)]
pub trait PwmActuator {
    /// Driver-level initialization. Called once, before anything else.
    fn initialize(&mut self) -> Result<(), ActuatorError>;

    /// Route PWM to the pin and prepare the channel for duty writes.
    fn configure_channel(&mut self, channel: &HardwareChannel) -> Result<(), ActuatorError>;

    /// Command a native duty value (0-1023).
    fn set_duty(&mut self, channel: &HardwareChannel, duty: u16) -> Result<(), ActuatorError>;
}

/// How the GPIO gets switched to its PWM alternate function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinMux {
    /// Run `pinctrl`, falling back to `raspi-gpio`
    Command,
    /// Leave muxing to the device-tree overlay
    Skip,
}

/// Hardware PWM through `/sys/class/pwm/pwmchipN`.
#[derive(Debug)]
pub struct SysfsPwm {
    chip: PathBuf,
    period_ns: u32,
    pin_mux: PinMux,
}

fn io_err(kind: ActuatorErrorKind, what: &str, path: &Path, e: io::Error) -> ActuatorError {
    ActuatorError::new(kind, format!("{} {}: {}", what, path.display(), e))
}

impl SysfsPwm {
    pub fn new(chip: impl Into<PathBuf>, period_ns: u32) -> Self {
        Self { chip: chip.into(), period_ns, pin_mux: PinMux::Command }
    }

    pub fn with_pin_mux(mut self, pin_mux: PinMux) -> Self {
        self.pin_mux = pin_mux;
        self
    }

    fn channel_dir(&self, channel: u8) -> PathBuf {
        self.chip.join(format!("pwm{}", channel))
    }

    fn write_attr(&self, path: &Path, value: impl ToString) -> Result<(), ActuatorError> {
        fs::write(path, value.to_string())
            .map_err(|e| io_err(ActuatorErrorKind::Io, "Failed to write", path, e))
    }

    /// Number of channels the chip advertises, if it says
    fn channel_count(&self) -> Option<u8> {
        fs::read_to_string(self.chip.join("npwm")).ok()?.trim().parse().ok()
    }

    fn set_alt_function(&self, hw: &HardwareChannel) -> Result<(), ActuatorError> {
        if self.pin_mux == PinMux::Skip {
            return Ok(());
        }
        let gpio = hw.gpio.to_string();
        let mode = hw.alt_function.as_mode_arg();

        for tool in ["pinctrl", "raspi-gpio"] {
            match Command::new(tool).args(["set", gpio.as_str(), mode]).output() {
                Ok(output) if output.status.success() => {
                    debug!("{} set GPIO {} to {}", tool, gpio, hw.alt_function);
                    return Ok(());
                }
                Ok(output) => {
                    return Err(ActuatorError::new(
                        ActuatorErrorKind::BadMode,
                        format!(
                            "{} could not set GPIO {} to {}: {}",
                            tool,
                            gpio,
                            hw.alt_function,
                            String::from_utf8_lossy(&output.stderr).trim()
                        ),
                    ));
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => {
                    return Err(ActuatorError::new(
                        ActuatorErrorKind::BadMode,
                        format!("could not run {}: {}", tool, e),
                    ));
                }
            }
        }

        warn!(
            "Neither pinctrl nor raspi-gpio found; assuming the device-tree overlay put GPIO {} in {}",
            gpio, hw.alt_function
        );
        Ok(())
    }

    fn export(&self, channel: u8) -> Result<PathBuf, ActuatorError> {
        let dir = self.channel_dir(channel);
        if dir.is_dir() {
            debug!("PWM channel {} already exported", channel);
            return Ok(dir);
        }

        let export = self.chip.join("export");
        fs::write(&export, channel.to_string())
            .map_err(|e| io_err(ActuatorErrorKind::BadChannel, "Failed to export channel via", &export, e))?;

        // udev creates the node asynchronously
        for _ in 0..sysfs::EXPORT_POLL_ATTEMPTS {
            if dir.is_dir() {
                return Ok(dir);
            }
            thread::sleep(sysfs::EXPORT_POLL);
        }
        Err(ActuatorError::new(
            ActuatorErrorKind::BadChannel,
            format!("{} did not appear after export", dir.display()),
        ))
    }
}

impl PwmActuator for SysfsPwm {
    fn initialize(&mut self) -> Result<(), ActuatorError> {
        if !self.chip.is_dir() {
            return Err(ActuatorError::new(
                ActuatorErrorKind::DriverUnavailable,
                format!(
                    "{} not found (is dtoverlay=pwm-2chan enabled in config.txt?)",
                    self.chip.display()
                ),
            ));
        }
        Ok(())
    }

    fn configure_channel(&mut self, hw: &HardwareChannel) -> Result<(), ActuatorError> {
        if let Some(count) = self.channel_count() {
            if hw.pwm_channel >= count {
                return Err(ActuatorError::new(
                    ActuatorErrorKind::BadChannel,
                    format!("{} has {} channel(s), need channel {}", self.chip.display(), count, hw.pwm_channel),
                ));
            }
        }

        self.set_alt_function(hw)?;
        let dir = self.export(hw.pwm_channel)?;

        // duty_cycle must never exceed period, so zero it before changing period
        self.write_attr(&dir.join("duty_cycle"), 0)?;
        self.write_attr(&dir.join("period"), self.period_ns)?;
        self.write_attr(&dir.join("enable"), 1)?;
        Ok(())
    }

    fn set_duty(&mut self, hw: &HardwareChannel, duty: u16) -> Result<(), ActuatorError> {
        if duty > pwm::MAX_DUTY {
            return Err(ActuatorError::bad_duty(duty, pwm::MAX_DUTY));
        }
        let ns = pwm::to_duty_cycle_ns(duty, self.period_ns);
        self.write_attr(&self.channel_dir(hw.pwm_channel).join("duty_cycle"), ns)
    }
}

/// Logs commands instead of touching hardware. For benches without a fan.
#[derive(Debug, Default)]
pub struct DryRunPwm {
    last: Option<u16>,
}

impl DryRunPwm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_duty(&self) -> Option<u16> {
        self.last
    }
}

impl PwmActuator for DryRunPwm {
    fn initialize(&mut self) -> Result<(), ActuatorError> {
        info!("dry-run: skipping PWM driver initialization");
        Ok(())
    }

    fn configure_channel(&mut self, hw: &HardwareChannel) -> Result<(), ActuatorError> {
        info!(
            "dry-run: would set GPIO {} to {} and enable PWM channel {}",
            hw.gpio, hw.alt_function, hw.pwm_channel
        );
        Ok(())
    }

    fn set_duty(&mut self, hw: &HardwareChannel, duty: u16) -> Result<(), ActuatorError> {
        if duty > pwm::MAX_DUTY {
            return Err(ActuatorError::bad_duty(duty, pwm::MAX_DUTY));
        }
        if self.last != Some(duty) {
            info!("dry-run: PWM channel {} duty -> {}", hw.pwm_channel, duty);
        }
        self.last = Some(duty);
        Ok(())
    }
}
