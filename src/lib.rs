//! Client crate for controlling the two PRU co-processors of a PRU-ICSS through the
//! privileged `prussd` daemon.
//!
//! The host process never touches the hardware itself.  Driver probing, sysfs writes,
//! firmware staging and RPMsg device I/O are all carried out by the daemon.  This crate
//! encodes each operation as a one-line text command, sends it to the daemon over a local
//! socket, and interprets the single reply as a status code or a payload.
//!
//! ## Architecture
//!
//! Three layers, each depending only on the one below:
//!
//! - **Channel**: one command, one reply.  A fresh connection is made for every command,
//!   and torn down as soon as the reply has been read, whether or not the reply indicates
//!   success.  There is no persistent connection to the daemon.
//! - **Pru**: one of the two cores.  Holds a local mirror of the core's lifecycle state
//!   ([`PruState`]) and its RPMsg channel identity, which is only used to format message
//!   commands.
//! - **Pruss**: the controller.  Owns both [`Pru`] instances and the on/off state of the
//!   shared subsystem.  While the subsystem is off, both cores are [`PruState::Absent`].
//!
//! The local state is optimistic: it is updated only when the daemon replies with
//! success, and is never re-read from the daemon.
//!
//! ## Modules
//!
//! - [`channel`] - Reply size limits and command framing for exchanges with the daemon
//! - [`client`] - [`Pruss`] controller, [`Pru`] cores and their configuration
//! - [`command`] - Typed daemon commands and their wire encoding
//! - [`io`] - [`io::Connector`] trait used to obtain a transport stream, and the Unix
//!   domain socket implementation
//!
//! ## Getting Started
//!
//! ```no_run
//! use pruss_ctl::{Pruss, PrussConfig, PruState};
//!
//! let config = PrussConfig::from_env();
//! let mut pruss = Pruss::open(&config)?;
//!
//! let pru0 = pruss.pru0_mut();
//! pru0.load("firmware/am335x-pru0-fw")?;
//! assert_eq!(pru0.state(), PruState::Running);
//!
//! pru0.send_string_message("hello")?;
//! if let Some(reply) = pru0.receive_message()? {
//!     println!("PRU0 says {reply}");
//! }
//!
//! // Dropping the controller shuts the subsystem down
//! drop(pruss);
//! # Ok::<(), pruss_ctl::Error>(())
//! ```
//!
//! Alternative transports can be used by implementing [`io::Connector`] and passing it to
//! [`Pruss::init()`].
//!
//! ## Concurrency
//!
//! All operations are synchronous and blocking, and take `&mut self`.  Nothing inside the
//! crate locks.  If a [`Pruss`] must be shared between threads, wrap it in a `Mutex` so
//! that operations on it and its cores are serialized.
//!
//! ## Features
//!
//! Default features:
//! - `unix-socket` - Enable [`io::UnixConnector`] and [`Pruss::open()`], connecting to the
//!   daemon over a Unix domain socket.

// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

use std::convert::Infallible;
use std::io::ErrorKind;

pub mod channel;
pub mod client;
pub mod command;
pub mod io;

#[cfg(test)]
mod testing;

pub use client::{MessageKind, Pru, PruId, PruState, Pruss, PrussConfig, Region, RpmsgChannel};

/// Errors returned by [`Pru`] and [`Pruss`] operations.
///
/// Distinguishes errors detected locally, before anything is sent, from failures to reach
/// the daemon, and from failures the daemon reported.  See [`Error::is_local()`],
/// [`Error::is_unreachable()`] and [`Error::is_remote()`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Could not connect to the daemon
    #[error("cannot connect to prussd: {0}")]
    ConnectionFailed(ErrorKind),
    /// Connected to the daemon, but sending the command or reading the reply failed
    #[error("exchange with prussd failed: {0}")]
    Transport(ErrorKind),
    /// Reply could not be interpreted.  Contains the raw reply.
    #[error("unexpected reply from prussd: {0:?}")]
    Protocol(String),
    /// The daemon attempted the operation and reported this error code
    #[error("prussd reported error {0}: {desc}", desc = errno_description(.0))]
    Remote(i32),
    /// No device is available for this operation in the core's current state
    #[error("no such device")]
    NoDevice,
    /// Already in the requested state
    #[error("already in requested state")]
    Already,
    /// Argument rejected before sending
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
    /// Message larger than an RPMsg payload
    #[error("message of {0} bytes is too large")]
    PayloadTooLarge(usize),
}

impl Error {
    /// Returns the negative errno value equivalent to this error, in the same form the
    /// daemon reports its own failures.  Remote codes are returned verbatim.
    pub fn errno(&self) -> i32 {
        match self {
            Error::ConnectionFailed(_) => -libc::ECONNREFUSED,
            Error::Transport(_) => -libc::EIO,
            Error::Protocol(_) => -libc::EPROTO,
            Error::Remote(code) => *code,
            Error::NoDevice => -libc::ENODEV,
            Error::Already => -libc::EALREADY,
            Error::InvalidArgument(_) => -libc::EINVAL,
            Error::PayloadTooLarge(_) => -libc::EMSGSIZE,
        }
    }

    /// Whether the error was detected locally.  Nothing was sent to the daemon.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            Error::NoDevice
                | Error::Already
                | Error::InvalidArgument(_)
                | Error::PayloadTooLarge(_)
        )
    }

    /// Whether the daemon could not be reached, or stopped responding mid-exchange.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Error::ConnectionFailed(_) | Error::Transport(_))
    }

    /// Whether the daemon carried out the operation and it failed.
    pub fn is_remote(&self) -> bool {
        matches!(self, Error::Remote(_))
    }

    /// Whether the daemon, or the reply read, timed out.
    pub fn is_timeout(&self) -> bool {
        match self {
            Error::Remote(code) => *code == -libc::ETIMEDOUT,
            Error::Transport(kind) => matches!(kind, ErrorKind::TimedOut | ErrorKind::WouldBlock),
            _ => false,
        }
    }
}

impl From<Infallible> for Error {
    fn from(never: Infallible) -> Self {
        match never {}
    }
}

fn errno_description(code: &i32) -> String {
    std::io::Error::from_raw_os_error(code.saturating_abs()).to_string()
}

/// Type to represent the result of a PRU or PRUSS operation
pub type Result<T> = std::result::Result<T, Error>;
