//! Operator input source.
//!
//! Reads lines from any async reader (stdin in production) on a background
//! task and forwards them into a channel the event loop can `select!` on.
//! The channel closes when the reader reaches end-of-file or fails.

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Buffered lines waiting for the event loop.
const LINE_BUFFER: usize = 16;

/// Spawns a reader over process stdin.
pub fn spawn_stdin_reader() -> mpsc::Receiver<String> {
    spawn_line_reader(tokio::io::stdin())
}

/// Spawns a task that forwards every line of `reader` into the returned channel.
pub fn spawn_line_reader<R>(reader: R) -> mpsc::Receiver<String>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::channel(LINE_BUFFER);
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if tx.send(line).await.is_err() {
                        break;
                    }
                }
                Ok(None) => {
                    debug!("console input closed");
                    break;
                }
                Err(e) => {
                    warn!("console read failed: {e}");
                    break;
                }
            }
        }
    });
    rx
}
