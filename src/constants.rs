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

//! Constants and defaults for pifan
//!
//! Paths, default tiers and the native PWM range live here so the rest of
//! the crate never carries magic numbers.

use std::time::Duration;

/// System paths
pub mod paths {
    /// CPU and GPU share one die on the Pi, so this zone covers both
    pub const THERMAL_ZONE_TEMP: &str = "/sys/class/thermal/thermal_zone0/temp";

    /// Hardware PWM controller exposed by the `pwm` / `pwm-2chan` overlays
    pub const PWM_CHIP: &str = "/sys/class/pwm/pwmchip0";

    /// Optional system-wide configuration file
    pub const SYSTEM_CONFIG: &str = "/etc/pifan/config.json";

    /// Present when systemd-journald is accepting native log records
    pub const JOURNALD_SOCKET: &str = "/run/systemd/journal/socket";
}

/// Control loop defaults
pub mod control {
    use super::Duration;

    pub const DEFAULT_GPIO: i32 = 18;

    pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(2);

    /// Upper bound accepted for the polling interval, in seconds
    pub const MAX_INTERVAL_SECS: f64 = 3600.0;

    /// Default tiers as (threshold °C, native duty), highest first
    pub const DEFAULT_TIERS: &[(f64, u16)] = &[
        (40.0, super::pwm::FULL),
        (37.0, super::pwm::MID),
        (34.0, super::pwm::LOW),
    ];

    pub const MAX_TIERS: usize = 16;
}

/// Native PWM duty range
pub mod pwm {
    /// Highest native duty value (10-bit range, 0-1023)
    pub const MAX_DUTY: u16 = 1023;

    pub const FULL: u16 = MAX_DUTY;
    pub const MID: u16 = 800;
    pub const LOW: u16 = 600;
    pub const IDLE: u16 = 0;

    /// 25 kHz, the usual frequency for 4-pin PC fans
    pub const DEFAULT_PERIOD_NS: u32 = 40_000;

    /// Convert a percentage (0.0-100.0) to a native duty value.
    ///
    /// Out-of-range and NaN inputs are clamped to the nearest bound.
    pub fn from_percent(percent: f32) -> u16 {
        let p = if percent.is_nan() { 0.0 } else { percent.clamp(0.0, 100.0) };
        ((p / 100.0) * MAX_DUTY as f32).round() as u16
    }

    /// Convert a native duty value back to a percentage
    pub fn to_percent(duty: u16) -> f32 {
        (duty.min(MAX_DUTY) as f32 / MAX_DUTY as f32) * 100.0
    }

    /// Duty cycle in nanoseconds for a given period
    pub fn to_duty_cycle_ns(duty: u16, period_ns: u32) -> u32 {
        ((period_ns as u64 * duty.min(MAX_DUTY) as u64) / MAX_DUTY as u64) as u32
    }
}

/// Temperature conversion
pub mod temperature {
    /// The thermal zone reports millidegrees Celsius
    pub const MILLIDEGREE_DIVISOR: f64 = 1000.0;

    pub fn millidegrees_to_celsius(raw: i64) -> f64 {
        raw as f64 / MILLIDEGREE_DIVISOR
    }
}

/// Hardware bring-up timing
pub mod sysfs {
    use super::Duration;

    /// How often to check for the `pwmN` node after export
    pub const EXPORT_POLL: Duration = Duration::from_millis(50);

    /// Attempts before giving up on the exported node appearing
    pub const EXPORT_POLL_ATTEMPTS: u32 = 20;
}
