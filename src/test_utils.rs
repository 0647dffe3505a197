/*
 * Test utilities and mock helpers for pifan
 *
 * Scripted sensors, recording actuators and fake sysfs trees shared by the
 * unit test modules.
 */

#[cfg(test)]
pub mod test_utils {
    use std::collections::VecDeque;
    use std::fs;
    use std::io;
    use std::path::PathBuf;
    use std::time::Duration;

    use tempfile::TempDir;

    use crate::actuator::PwmActuator;
    use crate::config::FanConfig;
    use crate::error::{ActuatorError, SensorError};
    use crate::pins::HardwareChannel;
    use crate::sensor::TemperatureSensor;

    /// Default tiers, GPIO 18, and no sleep between iterations
    pub fn test_config() -> FanConfig {
        FanConfig { interval: Duration::ZERO, ..FanConfig::default() }
    }

    /// Returns each raw reading in order, then fails as if the zone vanished.
    pub struct ScriptedSensor {
        readings: VecDeque<i64>,
    }

    impl ScriptedSensor {
        pub fn new(readings: impl IntoIterator<Item = i64>) -> Self {
            Self { readings: readings.into_iter().collect() }
        }
    }

    impl TemperatureSensor for ScriptedSensor {
        fn read_raw(&mut self) -> Result<i64, SensorError> {
            self.readings.pop_front().ok_or_else(|| SensorError::Unavailable {
                path: PathBuf::from("/sys/class/thermal/thermal_zone0/temp"),
                source: io::Error::new(io::ErrorKind::NotFound, "script exhausted"),
            })
        }
    }

    /// Accepts every command and remembers the duty values written.
    #[derive(Default)]
    pub struct RecordingPwm {
        writes: Vec<u16>,
        configured: Vec<HardwareChannel>,
    }

    impl RecordingPwm {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn writes(&self) -> &[u16] {
            &self.writes
        }

        pub fn configured(&self) -> &[HardwareChannel] {
            &self.configured
        }
    }

    impl PwmActuator for RecordingPwm {
        fn initialize(&mut self) -> Result<(), ActuatorError> {
            Ok(())
        }

        fn configure_channel(&mut self, channel: &HardwareChannel) -> Result<(), ActuatorError> {
            self.configured.push(*channel);
            Ok(())
        }

        fn set_duty(&mut self, _channel: &HardwareChannel, duty: u16) -> Result<(), ActuatorError> {
            self.writes.push(duty);
            Ok(())
        }
    }

    /// Creates a fake `/sys/class/pwm/pwmchipN` directory
    pub fn create_mock_pwm_chip(with_channel0: bool) -> TempDir {
        let chip = TempDir::new().unwrap();
        fs::write(chip.path().join("npwm"), "2\n").unwrap();
        if with_channel0 {
            fs::create_dir_all(chip.path().join("pwm0")).unwrap();
        }
        chip
    }

    /// Creates a fake thermal zone `temp` file with the given content
    pub fn create_mock_thermal_zone(content: &str) -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let zone = dir.path().join("thermal_zone0");
        fs::create_dir_all(&zone).unwrap();
        let temp = zone.join("temp");
        fs::write(&temp, content).unwrap();
        (dir, temp)
    }
}

#[cfg(test)]
mod tests {
    use super::test_utils::*;
    use crate::actuator::PwmActuator;
    use crate::pins::resolve;
    use crate::sensor::TemperatureSensor;

    #[test]
    fn test_scripted_sensor_exhausts() {
        let mut s = ScriptedSensor::new([1, 2]);
        assert_eq!(s.read_raw().unwrap(), 1);
        assert_eq!(s.read_raw().unwrap(), 2);
        assert!(s.read_raw().is_err());
    }

    #[test]
    fn test_recording_pwm() {
        let hw = resolve(18).unwrap().hardware_channel;
        let mut pwm = RecordingPwm::new();
        pwm.configure_channel(&hw).unwrap();
        pwm.set_duty(&hw, 600).unwrap();
        assert_eq!(pwm.configured(), &[hw]);
        assert_eq!(pwm.writes(), &[600]);
    }

    #[test]
    fn test_mock_pwm_chip_layout() {
        let chip = create_mock_pwm_chip(true);
        assert!(chip.path().join("pwm0").is_dir());
        assert!(!chip.path().join("pwm1").exists());
    }
}
