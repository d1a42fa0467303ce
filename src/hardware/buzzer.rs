//! Buzzer actuator on a GPIO output

use crate::core::MAX_PATTERN_TIME_S;
use crate::hardware::{ActuatorError, ActuatorResult};
use embedded_hal::digital::OutputPin;
use linux_embedded_hal::sysfs_gpio::Direction;
use linux_embedded_hal::SysfsPin;
use log::debug;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Audible output driven by the feedback loop
pub trait BuzzerActuator: Send {
    /// Sound `repetitions` pulses, blocking for the full on/off pattern
    fn beep(&mut self, on_time_s: f64, off_time_s: f64, repetitions: u32) -> ActuatorResult<()>;

    /// Silence the buzzer
    fn off(&mut self) -> ActuatorResult<()>;

    /// Check if the buzzer is currently sounding
    fn is_active(&self) -> bool;
}

/// Buzzer wiring
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuzzerConfig {
    /// BCM GPIO number
    pub pin: u64,
    /// Whether a high level sounds the buzzer
    pub active_high: bool,
}

impl Default for BuzzerConfig {
    fn default() -> Self {
        Self {
            pin: 23,
            active_high: true,
        }
    }
}

/// Readiness pattern sounded once at startup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StartupBeep {
    pub on_time_s: f64,
    pub off_time_s: f64,
    pub repetitions: u32,
}

impl Default for StartupBeep {
    fn default() -> Self {
        Self {
            on_time_s: 0.2,
            off_time_s: 1.0,
            repetitions: 2,
        }
    }
}

/// Check that a pulse pattern can actually be slept
pub fn check_timing(on_time_s: f64, off_time_s: f64) -> ActuatorResult<()> {
    let valid = |t: f64| t.is_finite() && t >= 0.0 && t <= MAX_PATTERN_TIME_S;
    if valid(on_time_s) && valid(off_time_s) {
        Ok(())
    } else {
        Err(ActuatorError::InvalidTiming { on_time_s, off_time_s })
    }
}

/// Buzzer on any `embedded-hal` output pin
pub struct GpioBuzzer<P: OutputPin> {
    pin: P,
    pin_number: u64,
    active_high: bool,
    active: bool,
}

impl<P: OutputPin> GpioBuzzer<P> {
    pub fn new(pin: P, pin_number: u64, active_high: bool) -> Self {
        Self {
            pin,
            pin_number,
            active_high,
            active: false,
        }
    }

    /// Drive the pin so the buzzer sounds (`on`) or stays quiet
    fn drive(&mut self, on: bool) -> ActuatorResult<()> {
        let result = if on == self.active_high {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        };

        result.map_err(|e| ActuatorError::PinError {
            pin: self.pin_number,
            details: format!("{:?}", e),
        })?;
        self.active = on;
        Ok(())
    }

    /// Release the wrapped pin
    pub fn release(self) -> P {
        self.pin
    }
}

impl<P: OutputPin + Send> BuzzerActuator for GpioBuzzer<P> {
    fn beep(&mut self, on_time_s: f64, off_time_s: f64, repetitions: u32) -> ActuatorResult<()> {
        check_timing(on_time_s, off_time_s)?;

        for _ in 0..repetitions {
            if let Err(e) = self.drive(true) {
                let _ = self.drive(false);
                return Err(e);
            }
            std::thread::sleep(Duration::from_secs_f64(on_time_s));
            self.drive(false)?;
            std::thread::sleep(Duration::from_secs_f64(off_time_s));
        }
        Ok(())
    }

    fn off(&mut self) -> ActuatorResult<()> {
        self.drive(false)
    }

    fn is_active(&self) -> bool {
        self.active
    }
}

/// Export the configured GPIO through sysfs and wrap it as a silent buzzer
pub fn open_sysfs_buzzer(config: &BuzzerConfig) -> ActuatorResult<GpioBuzzer<SysfsPin>> {
    let pin = SysfsPin::new(config.pin);
    let setup_failed = |e: linux_embedded_hal::sysfs_gpio::Error| ActuatorError::SetupFailed {
        pin: config.pin,
        details: e.to_string(),
    };

    pin.export().map_err(setup_failed)?;
    // Start at the quiet level
    let idle = if config.active_high {
        Direction::Low
    } else {
        Direction::High
    };
    pin.set_direction(idle).map_err(setup_failed)?;

    debug!("GPIO {} exported as buzzer output", config.pin);
    Ok(GpioBuzzer::new(pin, config.pin, config.active_high))
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal::digital::{ErrorType, PinState};
    use std::convert::Infallible;

    /// Output pin that records every level written to it
    #[derive(Default)]
    struct RecordingPin {
        levels: Vec<PinState>,
    }

    impl ErrorType for RecordingPin {
        type Error = Infallible;
    }

    impl OutputPin for RecordingPin {
        fn set_low(&mut self) -> Result<(), Self::Error> {
            self.levels.push(PinState::Low);
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Self::Error> {
            self.levels.push(PinState::High);
            Ok(())
        }
    }

    #[test]
    fn test_active_high_pulses() {
        let mut buzzer = GpioBuzzer::new(RecordingPin::default(), 23, true);
        buzzer.beep(0.0, 0.0, 2).unwrap();
        assert!(!buzzer.is_active());

        let pin = buzzer.release();
        assert_eq!(
            pin.levels,
            vec![PinState::High, PinState::Low, PinState::High, PinState::Low]
        );
    }

    #[test]
    fn test_active_low_inverts_levels() {
        let mut buzzer = GpioBuzzer::new(RecordingPin::default(), 23, false);
        buzzer.beep(0.0, 0.0, 1).unwrap();
        buzzer.off().unwrap();

        let pin = buzzer.release();
        assert_eq!(
            pin.levels,
            vec![PinState::Low, PinState::High, PinState::High]
        );
    }

    #[test]
    fn test_invalid_timing_rejected() {
        let mut buzzer = GpioBuzzer::new(RecordingPin::default(), 23, true);
        assert!(matches!(
            buzzer.beep(f64::NAN, 0.1, 1),
            Err(ActuatorError::InvalidTiming { .. })
        ));
        assert!(buzzer.beep(0.1, -1.0, 1).is_err());
        assert!(buzzer.release().levels.is_empty());
    }

    #[test]
    fn test_startup_beep_defaults() {
        let startup = StartupBeep::default();
        assert_eq!(startup.repetitions, 2);
        assert!(check_timing(startup.on_time_s, startup.off_time_s).is_ok());
    }
}
