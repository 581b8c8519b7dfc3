//! Liveness monitor.
//!
//! The runtime calls [`ProtocolCore::sweep_liveness`] on a fixed period
//! (default 5 s).  Any alive client whose last heartbeat is older than the
//! liveness timeout (default 15 s, roughly three missed beats at the default
//! heartbeat interval) is declared dead.  The sweep only reads and writes the
//! registry; it sends nothing and leaves secure channels as they are.

use std::fmt;
use std::time::Duration;

use tracing::warn;

use super::protocol_core::ProtocolCore;
use super::registry::LivenessLost;

/// A silence length rounded down to its largest whole unit, for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SilenceDuration {
    Seconds(u64),
    Minutes(u64),
    Hours(u64),
}

impl SilenceDuration {
    pub fn classify(elapsed: Duration) -> Self {
        let secs = elapsed.as_secs();
        if secs >= 3600 {
            SilenceDuration::Hours(secs / 3600)
        } else if secs >= 60 {
            SilenceDuration::Minutes(secs / 60)
        } else {
            SilenceDuration::Seconds(secs)
        }
    }
}

impl fmt::Display for SilenceDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SilenceDuration::Seconds(n) => write!(f, "{n} seconds"),
            SilenceDuration::Minutes(n) => write!(f, "{n} minutes"),
            SilenceDuration::Hours(n) => write!(f, "{n} hours"),
        }
    }
}

impl ProtocolCore {
    /// Declares silent clients dead and logs each one.
    pub fn sweep_liveness(&mut self) -> Vec<LivenessLost> {
        let now = self.clock.now();
        let lost = self.registry.sweep(now, self.liveness_timeout);
        for event in &lost {
            warn!(
                peer = %event.address,
                index = event.index,
                "client went silent; declared dead after {}",
                SilenceDuration::classify(event.silence)
            );
        }
        lost
    }
}
