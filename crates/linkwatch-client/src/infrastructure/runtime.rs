//! Client event loop.
//!
//! A single task owns the [`ClientSession`].  It waits on two things: the
//! next inbound frame and a one-shot deadline for the session's periodic
//! action.  The deadline depends on the phase the session is in:
//!
//! | Phase | Delay before the next tick |
//! |---|---|
//! | `Discovering` | `discovery_interval` (first broadcast is immediate) |
//! | `Paired` | `settle_delay`, then the first heartbeat |
//! | `Heartbeating` | `heartbeat_interval` |
//!
//! A frame that changes the phase reschedules the deadline.

use std::future::Future;

use linkwatch_core::InboundFrame;
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use crate::application::session::{ClientSession, SessionPhase};
use crate::infrastructure::storage::config::ClientTimings;

/// Drives `session` until `shutdown` resolves or the radio channel closes.
///
/// Returns the session so the caller can inspect its final state.
pub async fn run<F>(
    mut session: ClientSession,
    mut inbound: mpsc::Receiver<InboundFrame>,
    timings: ClientTimings,
    shutdown: F,
) -> ClientSession
where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    let mut deadline = Instant::now();
    info!("client running; discovering");

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("shutdown requested");
                break;
            }
            frame = inbound.recv() => {
                let Some(frame) = frame else {
                    warn!("radio receive channel closed");
                    break;
                };
                let before = session.phase();
                match session.handle_inbound(&frame) {
                    Ok(action) => debug!(?action, "inbound frame handled"),
                    Err(e) => e.report(),
                }
                let after = session.phase();
                if after != before {
                    deadline = Instant::now() + entry_delay(after, &timings);
                }
            }
            _ = sleep_until(deadline) => {
                if let Err(e) = session.tick() {
                    e.report();
                }
                deadline = Instant::now() + tick_delay(session.phase(), &timings);
            }
        }
    }

    if let Some(coordinator) = session.coordinator() {
        info!(peer = %coordinator, "leaving session");
    }
    session
}

/// Delay after entering `phase` through an inbound frame.
fn entry_delay(phase: SessionPhase, timings: &ClientTimings) -> std::time::Duration {
    match phase {
        SessionPhase::Discovering => std::time::Duration::ZERO,
        SessionPhase::Paired => timings.settle_delay,
        SessionPhase::Heartbeating => timings.heartbeat_interval,
    }
}

/// Delay after a tick that left the session in `phase`.
fn tick_delay(phase: SessionPhase, timings: &ClientTimings) -> std::time::Duration {
    match phase {
        SessionPhase::Discovering => timings.discovery_interval,
        SessionPhase::Paired => timings.settle_delay,
        SessionPhase::Heartbeating => timings.heartbeat_interval,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
