//! Actuator for running the client on an ordinary host.
//!
//! A host has no status LED and must not restart because a peer asked it
//! to.  The LED is an in-memory flag reported through the log, and a reboot
//! request is logged and accepted; the session layer then starts over from
//! discovery, which is what a freshly booted device would do.

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{info, warn};

use crate::application::commands::{ActuatorError, DeviceActuator};

#[derive(Debug, Default)]
pub struct HostActuator {
    led_on: AtomicBool,
}

impl HostActuator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn led_on(&self) -> bool {
        self.led_on.load(Ordering::Relaxed)
    }
}

impl DeviceActuator for HostActuator {
    fn toggle_led(&self) -> Result<bool, ActuatorError> {
        let on = !self.led_on.fetch_xor(true, Ordering::Relaxed);
        info!(led = if on { "on" } else { "off" }, "status LED");
        Ok(on)
    }

    fn reboot(&self) -> Result<(), ActuatorError> {
        warn!("reboot requested; restarting the session instead of the host");
        self.led_on.store(false, Ordering::Relaxed);
        Ok(())
    }
}
