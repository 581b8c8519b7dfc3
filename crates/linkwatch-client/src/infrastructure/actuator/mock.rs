//! Recording actuator for tests.
//!
//! Counts every call instead of touching hardware, so integration tests can
//! assert which effects a command produced.  Set `should_fail` to make every
//! call return an [`ActuatorError`].

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::application::commands::{ActuatorError, DeviceActuator};

#[derive(Debug, Default)]
pub struct RecordingActuator {
    pub led_toggles: AtomicUsize,
    pub reboots: AtomicUsize,
    pub should_fail: AtomicBool,
}

impl RecordingActuator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn led_toggles(&self) -> usize {
        self.led_toggles.load(Ordering::SeqCst)
    }

    pub fn reboots(&self) -> usize {
        self.reboots.load(Ordering::SeqCst)
    }

    pub fn set_should_fail(&self, fail: bool) {
        self.should_fail.store(fail, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), ActuatorError> {
        if self.should_fail.load(Ordering::SeqCst) {
            return Err(ActuatorError::Device("mock failure".into()));
        }
        Ok(())
    }
}

impl DeviceActuator for RecordingActuator {
    fn toggle_led(&self) -> Result<bool, ActuatorError> {
        self.check()?;
        let count = self.led_toggles.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(count % 2 == 1)
    }

    fn reboot(&self) -> Result<(), ActuatorError> {
        self.check()?;
        self.reboots.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
