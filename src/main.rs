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

use std::path::PathBuf;
use std::process;

use anyhow::Context;
use clap::error::ErrorKind;
use clap::Parser;
use tracing::{error, info, warn};

use pifan::actuator::{DryRunPwm, PwmActuator, SysfsPwm};
use pifan::config::{FanConfig, Overrides};
use pifan::control::ThermalLoop;
use pifan::error::ControlFault;
use pifan::logger;
use pifan::pins;
use pifan::sensor::ThermalZoneSensor;

#[derive(Parser, Debug)]
#[command(name = "pifan")]
#[command(version)]
#[command(about = "Raspberry Pi CPU PWM Fan Controller")]
#[command(long_about = "Raspberry Pi CPU PWM Fan Controller

Watches CPU temp and sets PWM fan speed accordingly through the kernel's
hardware PWM driver.")]
#[command(after_help = "Supported pins: BCM GPIO 12, 13, 18, 19 (hardware PWM)

FILES:
    /etc/pifan/config.json    Optional configuration (overridden by flags)

ENVIRONMENT VARIABLES:
    PIFAN_LOG=debug           Log filter (default: info)

Exit status: 1 if error")]
struct Cli {
    /// BCM GPIO pin # for setting PWM fan speed (default 18)
    #[arg(long, value_name = "BCM_GPIO_PIN_NUMBER", allow_negative_numbers = true)]
    gpio: Option<i32>,

    /// Path to a JSON configuration file
    #[arg(long, short = 'c', value_name = "FILE")]
    config: Option<PathBuf>,

    /// Seconds between temperature checks (default 2)
    #[arg(long, short = 'i', value_name = "SECONDS")]
    interval: Option<f64>,

    /// Log every reading and fan write
    #[arg(long, short)]
    verbose: bool,

    /// Log PWM commands instead of touching hardware
    #[arg(long)]
    dry_run: bool,
}

fn load_config(cli: &Cli) -> anyhow::Result<FanConfig> {
    let overrides = Overrides {
        pin: cli.gpio,
        interval_secs: cli.interval,
        verbose: cli.verbose,
    };
    let cfg = FanConfig::load(cli.config.as_deref(), &overrides)
        .context("Invalid configuration")?;
    Ok(cfg)
}

fn report_fault(fault: &ControlFault) {
    match fault {
        ControlFault::SensorRead { failsafe: None, .. } => {
            error!("{}. Fan set to full, exiting with code 1.", fault);
        }
        ControlFault::SensorRead { failsafe: Some(e), .. } => {
            error!("{}. Could not set fan to full either ({}), exiting with code 1.", fault, e);
        }
        ControlFault::ActuatorWrite { .. } => {
            error!("{}. Exiting with code 1.", fault);
        }
    }
}

fn drive<A: PwmActuator>(config: &FanConfig, mut actuator: A) -> ! {
    let channel = match pins::bring_up(config.pin, &mut actuator) {
        Ok(channel) => channel,
        Err(e) => {
            error!("{}. Exiting with code 1.", e);
            process::exit(1);
        }
    };

    info!(
        "GPIO #{} set to PWM output! Starting CPU temp polling at {:?} interval...",
        channel.physical_id, config.interval
    );

    let sensor = ThermalZoneSensor::new(&config.sensor_path);
    let control = ThermalLoop::new(config, channel, sensor, actuator);

    let fault = match control.run() {
        Ok(never) => match never {},
        Err(fault) => fault,
    };
    report_fault(&fault);
    process::exit(1);
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
                _ => 1,
            };
            let _ = e.print();
            process::exit(code);
        }
    };

    logger::init_logging();

    let config = match load_config(&cli) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("{:#}. Exiting with code 1.", e);
            process::exit(1);
        }
    };

    if cli.dry_run {
        drive(&config, DryRunPwm::new());
    }

    // SAFETY: geteuid has no preconditions and cannot fail
    if unsafe { libc::geteuid() } != 0 {
        warn!("Not running as root; exporting the PWM channel will likely fail");
    }
    drive(&config, SysfsPwm::new(&config.pwm_chip, config.pwm_period_ns));
}
