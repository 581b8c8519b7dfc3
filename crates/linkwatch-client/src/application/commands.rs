//! Command execution on the client device.
//!
//! The coordinator addresses a client with four command codes.  Two of them
//! have an effect here; the other two are part of the wire enum but have no
//! implementation on the device and are reported as unsupported.

use std::sync::Arc;

use linkwatch_core::CommandKind;
use thiserror::Error;
use tracing::{info, warn};

/// Error type for device effects.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ActuatorError {
    #[error("device error: {0}")]
    Device(String),
}

/// The device-side effects a command can trigger.
///
/// Each host provides an implementation in the infrastructure layer.
#[cfg_attr(test, mockall::automock)]
pub trait DeviceActuator: Send + Sync {
    /// Flips the status LED and returns its new state (`true` = on).
    fn toggle_led(&self) -> Result<bool, ActuatorError>;

    /// Restarts the device.  Returning `Ok` means the restart was initiated.
    fn reboot(&self) -> Result<(), ActuatorError>;
}

/// What executing a command did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    LedSwitched { on: bool },
    Rebooting,
    Unsupported(CommandKind),
}

/// Dispatches commands to the device actuator.
pub struct CommandExecutor {
    actuator: Arc<dyn DeviceActuator>,
}

impl CommandExecutor {
    pub fn new(actuator: Arc<dyn DeviceActuator>) -> Self {
        Self { actuator }
    }

    /// Runs one command.
    ///
    /// # Errors
    ///
    /// Returns [`ActuatorError`] if the device refused the effect.
    pub fn execute(&self, command: CommandKind) -> Result<CommandOutcome, ActuatorError> {
        match command {
            CommandKind::LedToggle => {
                let on = self.actuator.toggle_led()?;
                info!(led = if on { "on" } else { "off" }, "LED toggled");
                Ok(CommandOutcome::LedSwitched { on })
            }
            CommandKind::Reboot => {
                self.actuator.reboot()?;
                warn!("reboot requested by coordinator");
                Ok(CommandOutcome::Rebooting)
            }
            CommandKind::SystemInfo | CommandKind::WifiScan => {
                warn!(%command, "command not supported on this device");
                Ok(CommandOutcome::Unsupported(command))
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
