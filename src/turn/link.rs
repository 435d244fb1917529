//! Client connections.
//!
//! A `PlayerLink` is the coordinator's view of one client: it pushes
//! prompts and snapshots out and pulls input lines in. Transports are
//! outside this crate; `ChannelLink` adapts any pair of line channels and
//! is what the binary, the bots' tests and the integration tests use.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

use thiserror::Error;

use crate::board::PlayerId;
use crate::protocol::MapSnapshot;

/// Why a link stopped producing input.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum LinkError {
    #[error("client disconnected")]
    Disconnected,

    #[error("client timed out")]
    TimedOut,
}

/// One connected client.
pub trait PlayerLink: Send {
    /// Called once before initial placement, with the units to distribute.
    fn begin_placement(&mut self, player: PlayerId, snapshot: &MapSnapshot, units: u32) {
        let _ = (player, snapshot);
        self.send(&format!("place {}", units));
    }

    /// Called at the start of every order-collection phase.
    fn begin_round(&mut self, player: PlayerId, snapshot: &MapSnapshot) {
        let _ = (player, snapshot);
        self.send("orders");
    }

    /// Blocks for the next input line.
    fn next_line(&mut self) -> Result<String, LinkError>;

    /// Sends one line of output. Delivery failures are ignored; a dead
    /// client shows up on the next `next_line`.
    fn send(&mut self, line: &str);
}

/// A link backed by two in-process channels.
pub struct ChannelLink {
    incoming: Receiver<String>,
    outgoing: Sender<String>,
    timeout: Option<Duration>,
}

/// The client side of a `ChannelLink`.
pub struct ClientEnd {
    pub lines: Sender<String>,
    pub replies: Receiver<String>,
}

impl ChannelLink {
    /// Creates a connected link and client end. `timeout` bounds how long
    /// `next_line` waits.
    pub fn pair(timeout: Option<Duration>) -> (ChannelLink, ClientEnd) {
        let (line_tx, line_rx) = mpsc::channel();
        let (reply_tx, reply_rx) = mpsc::channel();
        (
            ChannelLink {
                incoming: line_rx,
                outgoing: reply_tx,
                timeout,
            },
            ClientEnd {
                lines: line_tx,
                replies: reply_rx,
            },
        )
    }
}

impl PlayerLink for ChannelLink {
    fn begin_placement(&mut self, player: PlayerId, snapshot: &MapSnapshot, units: u32) {
        self.send(&format!("you are player {}", player.0));
        self.send(snapshot.render_text().trim_end());
        self.send(&format!("place {}", units));
    }

    fn begin_round(&mut self, _player: PlayerId, snapshot: &MapSnapshot) {
        self.send(snapshot.render_text().trim_end());
        self.send("orders");
    }

    fn next_line(&mut self) -> Result<String, LinkError> {
        match self.timeout {
            Some(timeout) => self.incoming.recv_timeout(timeout).map_err(|e| match e {
                RecvTimeoutError::Timeout => LinkError::TimedOut,
                RecvTimeoutError::Disconnected => LinkError::Disconnected,
            }),
            None => self.incoming.recv().map_err(|_| LinkError::Disconnected),
        }
    }

    fn send(&mut self, line: &str) {
        let _ = self.outgoing.send(line.to_string());
    }
}

impl ClientEnd {
    /// Queues several input lines at once.
    pub fn feed<'a>(&self, lines: impl IntoIterator<Item = &'a str>) {
        for line in lines {
            let _ = self.lines.send(line.to_string());
        }
    }

    /// Everything the server has sent so far.
    pub fn received(&self) -> Vec<String> {
        self.replies.try_iter().collect()
    }
}
