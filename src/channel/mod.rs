//! Channel for a single command/reply exchange with the `prussd` daemon.
//!
//! A [`Channel`] is intended to be short-lived per exchange: each
//! [`Channel::send_command()`] connects, sends one command line, reads one reply, and
//! disconnects.  Channels are only created by [`crate::Pru`] and [`crate::Pruss`], each of
//! which holds a private one.
//!
//! See [`crate`] for a description of how the layers fit together.

// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

pub(crate) mod reply;

use std::io::{ErrorKind, Read, Write};

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};

use crate::command::Command;
use crate::io::Connector;
use crate::{Error, Result};

/// Maximum size of a reply from the daemon, in bytes.  Large enough for a register dump.
pub const MAX_REPLY_LEN: usize = 2048;

/// Byte terminating every command sent to the daemon
pub const COMMAND_TERMINATOR: u8 = b'\n';

/// Request/reply channel to the daemon.
///
/// Holds a stream only between connect and disconnect, both of which happen inside
/// [`Self::send_command()`].
pub(crate) struct Channel<C: Connector> {
    connector: C,
    stream: Option<C::Stream>,
}

impl<C: Connector> Channel<C> {
    /// Create a new, disconnected, channel.
    pub(crate) fn new(connector: C) -> Self {
        Self {
            connector,
            stream: None,
        }
    }

    /// Send `command` and return the daemon's reply verbatim, up to any NUL.
    ///
    /// Exactly one connect and one disconnect happen per call.  The connection is torn down
    /// whether or not the exchange succeeded.
    ///
    /// Returns [`Error::ConnectionFailed`] if the daemon can't be reached, and
    /// [`Error::Transport`] if the command can't be written or the reply read.
    pub(crate) fn send_command(&mut self, command: &Command<'_>) -> Result<String> {
        let line = command.to_string();
        trace!("Sending {line:?}");

        self.connect()?;
        let result = self.exchange(&line);
        self.disconnect();

        match &result {
            Ok(reply) => trace!("Reply to {line:?}: {reply:?}"),
            Err(e) => debug!("Exchange {line:?} failed: {e}"),
        }
        result
    }

    /// Whether a connection is currently open.  Only true during an exchange.
    #[allow(dead_code)]
    pub(crate) fn is_connected(&self) -> bool {
        self.stream.is_some()
    }
}

// Internal functions
impl<C: Connector> Channel<C> {
    fn connect(&mut self) -> Result<()> {
        // A previous exchange always disconnects, but don't leak a stream if not
        self.disconnect();

        match self.connector.connect() {
            Ok(stream) => {
                self.stream = Some(stream);
                Ok(())
            }
            Err(e) => {
                warn!("Failed to connect to prussd: {e}");
                Err(Error::ConnectionFailed(e.kind()))
            }
        }
    }

    fn disconnect(&mut self) -> bool {
        self.stream.take().is_some()
    }

    fn exchange(&mut self, line: &str) -> Result<String> {
        let stream = self
            .stream
            .as_mut()
            .ok_or(Error::ConnectionFailed(ErrorKind::NotConnected))?;

        // Whole command goes out in one write
        let mut frame = Vec::with_capacity(line.len() + 1);
        frame.extend_from_slice(line.as_bytes());
        frame.push(COMMAND_TERMINATOR);
        stream
            .write_all(&frame)
            .and_then(|()| stream.flush())
            .map_err(|e| Error::Transport(e.kind()))?;

        // One reply per connection, read once
        let mut buf = [0u8; MAX_REPLY_LEN];
        let len = loop {
            match stream.read(&mut buf) {
                Ok(len) => break len,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(Error::Transport(e.kind())),
            }
        };

        Ok(reply::decode(&buf[..len]))
    }
}
