//! Operator command console.
//!
//! Turns one line of operator input into a [`ConsoleCommand`] and executes it
//! against the registry and secure channels.  The verb set is closed:
//!
//! | Verb | Effect |
//! |---|---|
//! | `list` | one line per registry slot with its address and ALIVE/DEAD |
//! | `led <index>` | send a LedToggle command to an alive, encrypted client |
//! | `reboot <index>` | send a Reboot command, then mark the client dead and tear down its link |
//! | `help` | print the verb list |
//!
//! Commands are only ever sent over an encrypted link.  A target that is
//! dead or still plaintext is refused; the console never upgrades a link
//! itself.  After a reboot is sent the entry is marked dead immediately,
//! without waiting for the client to disappear.

use std::fmt;

use linkwatch_core::{ChannelError, CommandKind, DeviceAddress, Message};
use thiserror::Error;
use tracing::{info, warn};

use super::protocol_core::ProtocolCore;

/// Longest accepted input line; anything beyond is discarded.
pub const MAX_LINE_BYTES: usize = 63;

/// A parsed operator command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleCommand {
    List,
    Help,
    Reboot(usize),
    Led(usize),
}

/// Everything the console can refuse.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConsoleError {
    #[error("unknown command '{0}'; type 'help' for the list")]
    UnknownCommand(String),

    #[error("usage: {verb} <client_index>")]
    Usage { verb: &'static str },

    #[error("client {index} does not exist ({count} registered)")]
    NoSuchClient { index: usize, count: usize },

    #[error("client {0} is dead")]
    ClientDead(usize),

    #[error("client {0} does not have an encrypted connection")]
    NotEncrypted(usize),

    #[error("failed to send {command} to client {index}: {source}")]
    Dispatch {
        index: usize,
        command: CommandKind,
        #[source]
        source: ChannelError,
    },
}

/// One row of `list` output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientRow {
    pub index: usize,
    pub address: DeviceAddress,
    pub alive: bool,
}

/// What a successful command produced.  `Display` renders the operator text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleReply {
    Listing(Vec<ClientRow>),
    Help,
    Dispatched {
        index: usize,
        address: DeviceAddress,
        command: CommandKind,
    },
}

impl fmt::Display for ConsoleReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConsoleReply::Listing(rows) if rows.is_empty() => writeln!(f, "No clients found"),
            ConsoleReply::Listing(rows) => {
                writeln!(f, "Known clients:")?;
                for row in rows {
                    let status = if row.alive { "ALIVE" } else { "DEAD" };
                    writeln!(f, "Client {}: {} - {}", row.index, row.address, status)?;
                }
                Ok(())
            }
            ConsoleReply::Help => {
                writeln!(f, "Commands:")?;
                writeln!(f, "  list            list known clients and their status")?;
                writeln!(f, "  reboot <index>  reboot a client")?;
                writeln!(f, "  led <index>     toggle a client's LED")?;
                writeln!(f, "  help            show this list")
            }
            ConsoleReply::Dispatched {
                index,
                address,
                command,
            } => writeln!(f, "Sent {command} to client {index} ({address})"),
        }
    }
}

/// Parses one input line.
///
/// Returns `Ok(None)` for blank input.  Input past [`MAX_LINE_BYTES`] is cut
/// off before parsing.
pub fn parse_command(line: &str) -> Result<Option<ConsoleCommand>, ConsoleError> {
    let line = truncate_line(line);
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };
    let args: Vec<&str> = words.collect();

    let command = match verb {
        "list" => ConsoleCommand::List,
        "help" => ConsoleCommand::Help,
        "reboot" => ConsoleCommand::Reboot(parse_index("reboot", &args)?),
        "led" => ConsoleCommand::Led(parse_index("led", &args)?),
        other => return Err(ConsoleError::UnknownCommand(other.to_string())),
    };
    Ok(Some(command))
}

fn parse_index(verb: &'static str, args: &[&str]) -> Result<usize, ConsoleError> {
    match args {
        [one] => one.parse().map_err(|_| ConsoleError::Usage { verb }),
        _ => Err(ConsoleError::Usage { verb }),
    }
}

fn truncate_line(line: &str) -> &str {
    if line.len() <= MAX_LINE_BYTES {
        return line;
    }
    let mut end = MAX_LINE_BYTES;
    while !line.is_char_boundary(end) {
        end -= 1;
    }
    &line[..end]
}

impl ProtocolCore {
    /// Runs a parsed console command.
    ///
    /// # Errors
    ///
    /// Returns [`ConsoleError`] when the target is missing, dead or not yet
    /// encrypted, or the radio refused the frame.  Nothing is sent and no
    /// state changes in any of those cases.
    pub fn execute(&mut self, command: ConsoleCommand) -> Result<ConsoleReply, ConsoleError> {
        match command {
            ConsoleCommand::List => Ok(ConsoleReply::Listing(self.client_rows())),
            ConsoleCommand::Help => Ok(ConsoleReply::Help),
            ConsoleCommand::Led(index) => self.dispatch(index, CommandKind::LedToggle),
            ConsoleCommand::Reboot(index) => {
                let reply = self.dispatch(index, CommandKind::Reboot)?;
                if let ConsoleReply::Dispatched { address, .. } = reply {
                    self.registry.mark_dead(index);
                    self.channels.teardown(address);
                    warn!(peer = %address, index, "reboot sent; client marked dead");
                }
                Ok(reply)
            }
        }
    }

    fn client_rows(&self) -> Vec<ClientRow> {
        self.registry
            .entries()
            .iter()
            .enumerate()
            .map(|(index, e)| ClientRow {
                index,
                address: e.address,
                alive: e.alive,
            })
            .collect()
    }

    fn dispatch(&mut self, index: usize, command: CommandKind) -> Result<ConsoleReply, ConsoleError> {
        let entry = self.registry.get(index).ok_or(ConsoleError::NoSuchClient {
            index,
            count: self.registry.len(),
        })?;
        if !entry.alive {
            return Err(ConsoleError::ClientDead(index));
        }
        if !entry.encrypted {
            return Err(ConsoleError::NotEncrypted(index));
        }

        let address = entry.address;
        self.channels
            .send(address, &Message::Command(command))
            .map_err(|source| ConsoleError::Dispatch {
                index,
                command,
                source,
            })?;

        info!(peer = %address, index, %command, "command dispatched");
        Ok(ConsoleReply::Dispatched {
            index,
            address,
            command,
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::test_support::{client, discover_from, fixture, heartbeat_from};
    use linkwatch_core::LinkState;

    // ── Parsing ───────────────────────────────────────────────────────────────

    #[test]
    fn test_parse_recognises_every_verb() {
        assert_eq!(parse_command("list"), Ok(Some(ConsoleCommand::List)));
        assert_eq!(parse_command("help"), Ok(Some(ConsoleCommand::Help)));
        assert_eq!(parse_command("reboot 1"), Ok(Some(ConsoleCommand::Reboot(1))));
        assert_eq!(parse_command("  led   0 \r\n"), Ok(Some(ConsoleCommand::Led(0))));
    }

    #[test]
    fn test_parse_blank_line_is_nothing() {
        assert_eq!(parse_command(""), Ok(None));
        assert_eq!(parse_command("   \n"), Ok(None));
    }

    #[test]
    fn test_parse_wrong_argument_count_is_usage_error() {
        assert_eq!(parse_command("reboot"), Err(ConsoleError::Usage { verb: "reboot" }));
        assert_eq!(parse_command("led 1 2"), Err(ConsoleError::Usage { verb: "led" }));
        assert_eq!(parse_command("led one"), Err(ConsoleError::Usage { verb: "led" }));
        assert_eq!(parse_command("reboot -1"), Err(ConsoleError::Usage { verb: "reboot" }));
    }

    #[test]
    fn test_parse_unknown_verb() {
        assert_eq!(
            parse_command("shutdown 0"),
            Err(ConsoleError::UnknownCommand("shutdown".to_string()))
        );
    }

    #[test]
    fn test_parse_discards_input_past_line_limit() {
        let line = format!("led {}1", " ".repeat(MAX_LINE_BYTES));
        assert_eq!(parse_command(&line), Err(ConsoleError::Usage { verb: "led" }));
    }

    // ── Rendering ─────────────────────────────────────────────────────────────

    #[test]
    fn test_empty_listing_says_no_clients() {
        assert_eq!(ConsoleReply::Listing(Vec::new()).to_string(), "No clients found\n");
    }

    #[test]
    fn test_listing_shows_address_and_status() {
        let reply = ConsoleReply::Listing(vec![
            ClientRow { index: 0, address: client(1), alive: true },
            ClientRow { index: 1, address: client(2), alive: false },
        ]);
        let text = reply.to_string();
        assert!(text.contains("Client 0: 24:0A:C4:00:00:01 - ALIVE"));
        assert!(text.contains("Client 1: 24:0A:C4:00:00:02 - DEAD"));
    }

    // ── Execution ─────────────────────────────────────────────────────────────

    #[test]
    fn test_command_to_missing_index_is_refused() {
        let (radio, _clock, mut core) = fixture();
        assert_eq!(
            core.execute(ConsoleCommand::Led(0)),
            Err(ConsoleError::NoSuchClient { index: 0, count: 0 })
        );
        assert!(radio.sends().is_empty());
    }

    #[test]
    fn test_command_to_plaintext_client_is_refused() {
        let (radio, _clock, mut core) = fixture();
        core.handle_inbound(&discover_from(client(1))).unwrap();
        radio.clear_records();

        assert_eq!(core.execute(ConsoleCommand::Reboot(0)), Err(ConsoleError::NotEncrypted(0)));
        assert!(radio.sends().is_empty());
        assert!(core.registry().entries()[0].alive);
    }

    #[test]
    fn test_led_sends_led_toggle_and_keeps_entry() {
        // Arrange
        let (radio, _clock, mut core) = fixture();
        core.handle_inbound(&discover_from(client(1))).unwrap();
        core.handle_inbound(&heartbeat_from(client(1))).unwrap();
        radio.clear_records();

        // Act
        let reply = core.execute(ConsoleCommand::Led(0)).unwrap();

        // Assert
        assert_eq!(
            reply,
            ConsoleReply::Dispatched { index: 0, address: client(1), command: CommandKind::LedToggle }
        );
        assert_eq!(
            radio.sent_messages(),
            vec![(client(1), Message::Command(CommandKind::LedToggle))]
        );
        let entry = &core.registry().entries()[0];
        assert!(entry.alive && entry.encrypted);
    }

    #[test]
    fn test_reboot_sends_then_marks_dead_and_tears_down() {
        let (radio, _clock, mut core) = fixture();
        core.handle_inbound(&discover_from(client(1))).unwrap();
        core.handle_inbound(&heartbeat_from(client(1))).unwrap();
        radio.clear_records();

        core.execute(ConsoleCommand::Reboot(0)).unwrap();

        assert_eq!(
            radio.sent_messages(),
            vec![(client(1), Message::Command(CommandKind::Reboot))]
        );
        let entry = &core.registry().entries()[0];
        assert!(!entry.alive);
        assert!(!entry.encrypted);
        assert_eq!(core.channels().link_state(client(1)), LinkState::Unauthenticated);
    }

    #[test]
    fn test_failed_dispatch_changes_nothing() {
        let (radio, _clock, mut core) = fixture();
        core.handle_inbound(&discover_from(client(1))).unwrap();
        core.handle_inbound(&heartbeat_from(client(1))).unwrap();
        radio.set_fail_sends(true);

        let result = core.execute(ConsoleCommand::Reboot(0));

        assert!(matches!(result, Err(ConsoleError::Dispatch { index: 0, .. })));
        let entry = &core.registry().entries()[0];
        assert!(entry.alive && entry.encrypted);
        assert!(core.channels().is_encrypted(client(1)));
    }
}
