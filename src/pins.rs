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

//! GPIO to hardware PWM channel mapping
//!
//! Only four BCM GPIOs can carry the SoC's hardware PWM outputs. Each one
//! sits on a fixed PWM channel and needs a specific alternate function
//! selected before the signal reaches the pin:
//!
//! | BCM GPIO | Header pin | WiringPi pin | PWM channel | ALT mode |
//! |---------:|-----------:|-------------:|------------:|:--------:|
//! |       12 |         32 |           26 |           0 | ALT0     |
//! |       13 |         33 |           23 |           1 | ALT0     |
//! |       18 |         12 |            1 |           0 | ALT5     |
//! |       19 |         35 |           24 |           1 | ALT5     |

use std::fmt;

use tracing::{debug, info};

use crate::actuator::PwmActuator;
use crate::error::{ConfigError, HardwareError, StartupError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AltFunction {
    Alt0,
    Alt5,
}

impl AltFunction {
    /// Mode argument understood by `pinctrl` and `raspi-gpio`
    pub fn as_mode_arg(&self) -> &'static str {
        match self {
            Self::Alt0 => "a0",
            Self::Alt5 => "a5",
        }
    }
}

impl fmt::Display for AltFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Alt0 => f.write_str("ALT0"),
            Self::Alt5 => f.write_str("ALT5"),
        }
    }
}

/// Driver-facing description of where a GPIO's PWM signal comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HardwareChannel {
    pub gpio: u8,
    pub pwm_channel: u8,
    pub alt_function: AltFunction,
    pub header_pin: u8,
    pub wiringpi_pin: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelConfig {
    pub physical_id: i32,
    pub hardware_channel: HardwareChannel,
}

const PWM_PINS: [HardwareChannel; 4] = [
    HardwareChannel { gpio: 12, pwm_channel: 0, alt_function: AltFunction::Alt0, header_pin: 32, wiringpi_pin: 26 },
    HardwareChannel { gpio: 13, pwm_channel: 1, alt_function: AltFunction::Alt0, header_pin: 33, wiringpi_pin: 23 },
    HardwareChannel { gpio: 18, pwm_channel: 0, alt_function: AltFunction::Alt5, header_pin: 12, wiringpi_pin: 1 },
    HardwareChannel { gpio: 19, pwm_channel: 1, alt_function: AltFunction::Alt5, header_pin: 35, wiringpi_pin: 24 },
];

/// BCM GPIO numbers with hardware PWM
pub fn supported_pins() -> impl Iterator<Item = i32> {
    PWM_PINS.iter().map(|p| p.gpio as i32)
}

/// Look up the PWM channel for a BCM GPIO. Pure; touches no hardware.
pub fn resolve(physical_id: i32) -> Result<ChannelConfig, ConfigError> {
    PWM_PINS
        .iter()
        .find(|p| p.gpio as i32 == physical_id)
        .map(|&hardware_channel| ChannelConfig { physical_id, hardware_channel })
        .ok_or(ConfigError::UnsupportedPin(physical_id))
}

/// One-time hardware bring-up for `config`.
///
/// Must run exactly once, before the first duty write.
pub fn activate<A: PwmActuator + ?Sized>(
    config: &ChannelConfig,
    actuator: &mut A,
) -> Result<(), HardwareError> {
    let hw = &config.hardware_channel;
    let wrap = |source| HardwareError { gpio: config.physical_id, source };

    actuator.initialize().map_err(wrap)?;
    info!("PWM driver initialized");

    debug!(
        gpio = hw.gpio,
        channel = hw.pwm_channel,
        mode = %hw.alt_function,
        "Configuring PWM channel"
    );
    actuator.configure_channel(hw).map_err(wrap)?;
    Ok(())
}

/// Resolve `pin` and activate it on `actuator`.
///
/// The actuator is untouched unless the pin resolves.
pub fn bring_up<A: PwmActuator + ?Sized>(
    pin: i32,
    actuator: &mut A,
) -> Result<ChannelConfig, StartupError> {
    let channel = resolve(pin)?;
    info!(
        "Starting PWM fan control service on GPIO pin #{} (WiringPi pin #{})...",
        channel.physical_id, channel.hardware_channel.wiringpi_pin
    );
    activate(&channel, actuator)?;
    Ok(channel)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actuator::MockPwmActuator;
    use crate::error::{ActuatorError, ActuatorErrorKind};

    #[test]
    fn test_resolve_all_supported_pins() {
        let expected = [
            (12, 0, AltFunction::Alt0, 26),
            (13, 1, AltFunction::Alt0, 23),
            (18, 0, AltFunction::Alt5, 1),
            (19, 1, AltFunction::Alt5, 24),
        ];
        for (gpio, channel, alt, wpi) in expected {
            let cfg = resolve(gpio).unwrap();
            assert_eq!(cfg.physical_id, gpio);
            assert_eq!(cfg.hardware_channel.gpio as i32, gpio);
            assert_eq!(cfg.hardware_channel.pwm_channel, channel);
            assert_eq!(cfg.hardware_channel.alt_function, alt);
            assert_eq!(cfg.hardware_channel.wiringpi_pin, wpi);
        }
    }

    #[test]
    fn test_resolve_is_deterministic() {
        for gpio in supported_pins() {
            assert_eq!(resolve(gpio).unwrap(), resolve(gpio).unwrap());
        }
    }

    #[test]
    fn test_resolve_rejects_other_pins() {
        for gpio in [-1, 0, 1, 11, 14, 17, 20, 26, 40, i32::MAX] {
            match resolve(gpio) {
                Err(ConfigError::UnsupportedPin(v)) => assert_eq!(v, gpio),
                other => panic!("expected UnsupportedPin for {}, got {:?}", gpio, other),
            }
        }
    }

    #[test]
    fn test_alt_mode_args() {
        assert_eq!(AltFunction::Alt0.as_mode_arg(), "a0");
        assert_eq!(AltFunction::Alt5.as_mode_arg(), "a5");
        assert_eq!(AltFunction::Alt5.to_string(), "ALT5");
    }

    #[test]
    fn test_activate_initializes_then_configures() {
        let cfg = resolve(18).unwrap();
        let mut seq = mockall::Sequence::new();
        let mut mock = MockPwmActuator::new();
        mock.expect_initialize()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(()));
        mock.expect_configure_channel()
            .withf(|hw| hw.gpio == 18 && hw.pwm_channel == 0)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        mock.expect_set_duty().times(0);

        assert!(activate(&cfg, &mut mock).is_ok());
    }

    #[test]
    fn test_activate_stops_on_init_failure() {
        let cfg = resolve(12).unwrap();
        let mut mock = MockPwmActuator::new();
        mock.expect_initialize().times(1).returning(|| {
            Err(ActuatorError::new(ActuatorErrorKind::DriverUnavailable, "no pwmchip0"))
        });
        mock.expect_configure_channel().times(0);

        let err = activate(&cfg, &mut mock).unwrap_err();
        assert_eq!(err.gpio, 12);
        assert_eq!(err.source.kind, ActuatorErrorKind::DriverUnavailable);
    }

    #[test]
    fn test_activate_reports_bad_mode() {
        let cfg = resolve(19).unwrap();
        let mut mock = MockPwmActuator::new();
        mock.expect_initialize().returning(|| Ok(()));
        mock.expect_configure_channel()
            .returning(|_| Err(ActuatorError::new(ActuatorErrorKind::BadMode, "pinctrl failed")));

        let err = activate(&cfg, &mut mock).unwrap_err();
        assert_eq!(err.source.kind, ActuatorErrorKind::BadMode);
    }

    #[test]
    fn test_bring_up_unsupported_pin_never_touches_hardware() {
        let mut mock = MockPwmActuator::new();
        mock.expect_initialize().times(0);
        mock.expect_configure_channel().times(0);
        mock.expect_set_duty().times(0);

        let err = bring_up(7, &mut mock).unwrap_err();
        assert!(matches!(err, StartupError::Config(ConfigError::UnsupportedPin(7))));
    }

    #[test]
    fn test_bring_up_activates_resolved_channel() {
        let mut seq = mockall::Sequence::new();
        let mut mock = MockPwmActuator::new();
        mock.expect_initialize()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(()));
        mock.expect_configure_channel()
            .withf(|hw| hw.gpio == 13 && hw.pwm_channel == 1 && hw.alt_function == AltFunction::Alt0)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        mock.expect_set_duty().times(0);

        let channel = bring_up(13, &mut mock).unwrap();
        assert_eq!(channel, resolve(13).unwrap());
    }

    #[test]
    fn test_bring_up_reports_hardware_failure() {
        let mut mock = MockPwmActuator::new();
        mock.expect_initialize().returning(|| {
            Err(ActuatorError::new(ActuatorErrorKind::DriverUnavailable, "no pwmchip0"))
        });
        mock.expect_configure_channel().times(0);

        match bring_up(18, &mut mock) {
            Err(StartupError::Hardware(e)) => assert_eq!(e.gpio, 18),
            other => panic!("unexpected {:?}", other),
        }
    }
}
