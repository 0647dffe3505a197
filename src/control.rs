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

//! Thermal control loop
//!
//! Sample, pick a tier, write the duty, sleep, repeat. There is no retry
//! anywhere: a sensor that cannot be read forces the fan to full speed and
//! ends the loop, and a duty write that fails ends it immediately.

use std::convert::Infallible;
use std::thread;
use std::time::Duration;

use tracing::{error, info};

use crate::actuator::PwmActuator;
use crate::config::{FanConfig, ThresholdTable};
use crate::constants::{pwm, temperature};
use crate::error::ControlFault;
use crate::pins::ChannelConfig;
use crate::sensor::TemperatureSensor;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoopState {
    /// Set after the first successful iteration; only gates the startup report
    pub has_initialized_once: bool,
    pub last_commanded_duty: Option<u16>,
}

/// What one successful iteration did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepOutcome {
    pub raw: i64,
    pub temp_c: f64,
    pub duty: u16,
    /// True only for the iteration that emitted the startup report
    pub first_iteration: bool,
    /// Duty differs from the previous successful write
    pub tier_changed: bool,
}

pub struct ThermalLoop<S, A> {
    channel: ChannelConfig,
    thresholds: ThresholdTable,
    interval: Duration,
    verbose: bool,
    sensor: S,
    actuator: A,
    state: LoopState,
}

impl<S: TemperatureSensor, A: PwmActuator> ThermalLoop<S, A> {
    /// `channel` must already have been activated on `actuator`.
    pub fn new(config: &FanConfig, channel: ChannelConfig, sensor: S, actuator: A) -> Self {
        Self {
            channel,
            thresholds: config.thresholds.clone(),
            interval: config.interval,
            verbose: config.verbose,
            sensor,
            actuator,
            state: LoopState::default(),
        }
    }

    pub fn state(&self) -> &LoopState {
        &self.state
    }

    pub fn actuator(&self) -> &A {
        &self.actuator
    }

    /// Run one sample/decide/actuate cycle.
    pub fn step(&mut self) -> Result<StepOutcome, ControlFault> {
        let hw = self.channel.hardware_channel;

        let raw = match self.sensor.read_raw() {
            Ok(raw) => raw,
            Err(source) => {
                error!("Error reading CPU temp! Setting fan to full...");
                let failsafe = self.actuator.set_duty(&hw, pwm::MAX_DUTY).err();
                if failsafe.is_none() {
                    self.state.last_commanded_duty = Some(pwm::MAX_DUTY);
                }
                return Err(ControlFault::SensorRead { source, failsafe });
            }
        };
        let temp_c = temperature::millidegrees_to_celsius(raw);

        if self.verbose {
            info!("Current CPU/GPU temp RAW {}", raw);
            info!("Current CPU/GPU temp {:6.3}C", temp_c);
        }

        let duty = self.thresholds.select(temp_c);

        self.actuator
            .set_duty(&hw, duty)
            .map_err(|source| ControlFault::ActuatorWrite { duty, source })?;

        if self.verbose {
            info!(
                " - Set fan to {} ({:.0}%) on GPIO {}",
                duty,
                pwm::to_percent(duty),
                self.channel.physical_id
            );
        }
        let tier_changed = self.state.last_commanded_duty.is_some_and(|last| last != duty);
        if self.verbose && tier_changed {
            info!(from = ?self.state.last_commanded_duty, to = duty, "Fan tier changed");
        }

        let first_iteration = !self.state.has_initialized_once;
        if first_iteration {
            info!("CPU/GPU temp read successfully for first time: {:6.3}C", temp_c);
            info!(
                "Initialized fan to {} on GPIO {} (WiringPi pin {})",
                duty, self.channel.physical_id, hw.wiringpi_pin
            );
        }

        self.state.last_commanded_duty = Some(duty);
        self.state.has_initialized_once = true;

        Ok(StepOutcome { raw, temp_c, duty, first_iteration, tier_changed })
    }

    /// Loop until a fault. Never returns `Ok`.
    pub fn run(mut self) -> Result<Infallible, ControlFault> {
        loop {
            self.step()?;
            thread::sleep(self.interval);
        }
    }
}
