//! Coordinator event loop.
//!
//! One task owns the [`ProtocolCore`] and serialises the three event sources
//! that touch it:
//!
//! ```text
//!  radio rx thread ──► inbound mpsc ──┐
//!  stdin task      ──► console mpsc ──┼──► select! ──► ProtocolCore
//!  sweep interval  ───────────────────┘
//! ```
//!
//! Nothing else mutates the registry, so no locking is needed.  Console
//! replies and refusals are written to the operator output; protocol
//! rejections only go to the log.

use std::future::Future;
use std::io::Write;
use std::time::Duration;

use linkwatch_core::InboundFrame;
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::application::console::parse_command;
use crate::application::handshake::InboundAction;
use crate::application::protocol_core::ProtocolCore;
use crate::application::registry::LivenessLost;

/// The coordinator process state: the protocol core plus the operator output.
pub struct Coordinator<W> {
    core: ProtocolCore,
    out: W,
}

impl<W: Write> Coordinator<W> {
    pub fn new(core: ProtocolCore, out: W) -> Self {
        Self { core, out }
    }

    pub fn core(&self) -> &ProtocolCore {
        &self.core
    }

    /// Operator output written so far.
    pub fn output(&self) -> &W {
        &self.out
    }

    /// Feeds one radio frame to the handshake.  Rejections are logged at
    /// their own severity and never escape.
    pub fn on_frame(&mut self, frame: &InboundFrame) {
        match self.core.handle_inbound(frame) {
            Ok(InboundAction::HeartbeatRecorded { index, upgraded }) => {
                debug!(peer = %frame.source, index, upgraded, "heartbeat");
            }
            Ok(action) => debug!(?action, "handshake step"),
            Err(e) => e.report(),
        }
    }

    /// Parses and runs one operator line.
    pub fn on_console_line(&mut self, line: &str) {
        let command = match parse_command(line) {
            Ok(Some(command)) => command,
            Ok(None) => return,
            Err(e) => {
                self.write_line(&format!("error: {e}"));
                return;
            }
        };

        match self.core.execute(command) {
            Ok(reply) => self.write_text(&reply.to_string()),
            Err(e) => {
                warn!("console command refused: {e}");
                self.write_line(&format!("error: {e}"));
            }
        }
    }

    /// Runs one liveness sweep, then retries deferred upgrades of the
    /// clients that survived it.
    pub fn on_sweep(&mut self) -> Vec<LivenessLost> {
        let lost = self.core.sweep_liveness();
        self.core.retry_pending_upgrades();
        lost
    }

    /// Drives the loop until `shutdown` resolves or the radio channel closes.
    ///
    /// A closed console channel (stdin EOF) only disables that branch.
    /// Returns `self` so the caller can inspect the final state.
    pub async fn run<F>(
        mut self,
        mut inbound: mpsc::Receiver<InboundFrame>,
        mut console: mpsc::Receiver<String>,
        sweep_interval: Duration,
        shutdown: F,
    ) -> Self
    where
        F: Future<Output = ()>,
    {
        let mut ticker = interval(sweep_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick fires immediately; a sweep at t=0 has nothing to do.
        ticker.tick().await;

        let mut console_open = true;
        tokio::pin!(shutdown);

        info!(
            capacity = self.core.registry().capacity(),
            timeout_ms = self.core.liveness_timeout().as_millis() as u64,
            "coordinator running"
        );

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("shutdown requested");
                    break;
                }
                frame = inbound.recv() => match frame {
                    Some(frame) => self.on_frame(&frame),
                    None => {
                        warn!("radio receive channel closed");
                        break;
                    }
                },
                line = console.recv(), if console_open => match line {
                    Some(line) => self.on_console_line(&line),
                    None => console_open = false,
                },
                _ = ticker.tick() => {
                    self.on_sweep();
                }
            }
        }
        self
    }

    fn write_line(&mut self, line: &str) {
        self.write_text(&format!("{line}\n"));
    }

    fn write_text(&mut self, text: &str) {
        if let Err(e) = self.out.write_all(text.as_bytes()).and_then(|()| self.out.flush()) {
            warn!("failed to write console output: {e}");
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
