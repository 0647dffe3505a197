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

//! pifan - Raspberry Pi CPU PWM fan controller
//!
//! Watches the SoC temperature and drives a fan on one of the hardware PWM
//! GPIOs through a small table of speed tiers.

pub mod actuator;
pub mod config;
pub mod constants;
pub mod control;
pub mod error;
pub mod logger;
pub mod pins;
pub mod sensor;

#[cfg(test)]
pub mod test_utils;
