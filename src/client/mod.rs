//! Client for the `prussd` daemon:
//! - [`Pruss`]: the controller, owning the subsystem lifecycle and both cores
//! - [`Pru`]: a single core's lifecycle state machine, messaging and memory access
//!
//! See [`PrussConfig`] for how the daemon is located.

// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

pub mod pru;
pub mod pruss;

pub use pru::{Pru, PruState};
pub use pruss::Pruss;

use core::fmt;
use std::ffi::OsString;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};

use crate::Error;

/// Socket the daemon listens on, unless configured otherwise
pub const DEFAULT_SOCKET_PATH: &str = "/tmp/prussd.sock";

/// Environment variable overriding [`PrussConfig::socket_path`]
pub const SOCKET_PATH_ENV: &str = "PRUSSD_SOCKET";

/// Environment variable overriding [`PrussConfig::connect_timeout`], in milliseconds
pub const CONNECT_TIMEOUT_ENV: &str = "PRUSSD_CONNECT_TIMEOUT_MS";

/// Environment variable overriding [`PrussConfig::reply_timeout`], in milliseconds
pub const REPLY_TIMEOUT_ENV: &str = "PRUSSD_REPLY_TIMEOUT_MS";

/// RPMsg channel name created by the `pruss_api` driver, shared by both cores
pub const DEFAULT_RPMSG_NAME: &str = "pruss_api_pru";

/// Maximum RPMsg payload: a 512 byte buffer less its 16 byte header
pub const MAX_MESSAGE_LEN: usize = 496;

/// Configuration for reaching the daemon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrussConfig {
    /// Path of the daemon's Unix domain socket
    pub socket_path: PathBuf,
    /// How long to wait for a connection.  `None` waits as long as the OS does.
    pub connect_timeout: Option<Duration>,
    /// How long to wait for each reply.  `None` blocks until the daemon replies, which
    /// [`Pru::wait_for_event()`] without a timeout relies on.
    pub reply_timeout: Option<Duration>,
}

impl Default for PrussConfig {
    fn default() -> Self {
        Self {
            socket_path: PathBuf::from(DEFAULT_SOCKET_PATH),
            connect_timeout: None,
            reply_timeout: None,
        }
    }
}

impl PrussConfig {
    /// Default configuration, overridden by [`SOCKET_PATH_ENV`], [`CONNECT_TIMEOUT_ENV`]
    /// and [`REPLY_TIMEOUT_ENV`] when set.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var_os(name))
    }

    /// As [`Self::from_env()`], but reading variables through `lookup`.
    ///
    /// Timeouts which aren't a whole number of milliseconds are ignored, with a warning.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<OsString>,
    {
        let mut config = Self::default();
        if let Some(path) = lookup(SOCKET_PATH_ENV).filter(|path| !path.is_empty()) {
            config.socket_path = PathBuf::from(path);
        }
        if let Some(timeout) =
            lookup(CONNECT_TIMEOUT_ENV).and_then(|value| parse_millis(CONNECT_TIMEOUT_ENV, &value))
        {
            config.connect_timeout = Some(timeout);
        }
        if let Some(timeout) =
            lookup(REPLY_TIMEOUT_ENV).and_then(|value| parse_millis(REPLY_TIMEOUT_ENV, &value))
        {
            config.reply_timeout = Some(timeout);
        }
        config
    }

    /// Use a different daemon socket.
    pub fn with_socket_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.socket_path = path.into();
        self
    }

    /// Bound the time taken to connect.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Bound the time waited for each reply.
    pub fn with_reply_timeout(mut self, timeout: Duration) -> Self {
        self.reply_timeout = Some(timeout);
        self
    }
}

fn parse_millis(name: &str, value: &OsString) -> Option<Duration> {
    match value.to_str().and_then(|v| v.trim().parse::<u64>().ok()) {
        Some(millis) => Some(Duration::from_millis(millis)),
        None => {
            warn!("Ignoring {name}={value:?}: not a number of milliseconds");
            None
        }
    }
}

/// Identifies one of the two PRU cores
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PruId {
    Pru0,
    Pru1,
}

impl PruId {
    /// Both cores, in index order
    pub const ALL: [PruId; 2] = [PruId::Pru0, PruId::Pru1];

    /// Index of the core, as used in daemon commands
    pub const fn index(self) -> u8 {
        match self {
            PruId::Pru0 => 0,
            PruId::Pru1 => 1,
        }
    }
}

impl TryFrom<u8> for PruId {
    type Error = Error;

    fn try_from(index: u8) -> Result<Self, Error> {
        match index {
            0 => Ok(PruId::Pru0),
            1 => Ok(PruId::Pru1),
            _ => Err(Error::InvalidArgument("PRU index")),
        }
    }
}

impl fmt::Display for PruId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PRU{}", self.index())
    }
}

/// Addressable PRU memory regions.
///
/// Memory operations accept anything convertible into a `Region`, such as a `&str`, or a
/// `u8` numbered as the daemon's memory map (0 and 1 for data RAM, 3 for shared RAM).  An
/// unrecognised region is rejected with [`Error::InvalidArgument`] before anything is
/// sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Region {
    /// Shared RAM
    Shared,
    /// Data RAM 0
    Data0,
    /// Data RAM 1
    Data1,
}

impl Region {
    pub(crate) const fn wire_suffix(self) -> &'static str {
        match self {
            Region::Shared => "S",
            Region::Data0 => "D0",
            Region::Data1 => "D1",
        }
    }
}

impl TryFrom<u8> for Region {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Error> {
        match value {
            0 => Ok(Region::Data0),
            1 => Ok(Region::Data1),
            3 => Ok(Region::Shared),
            _ => Err(Error::InvalidArgument("memory region")),
        }
    }
}

impl FromStr for Region {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s.trim().to_ascii_lowercase().as_str() {
            "shared" | "sram" | "s" => Ok(Region::Shared),
            "data0" | "dram0" | "d0" => Ok(Region::Data0),
            "data1" | "dram1" | "d1" => Ok(Region::Data1),
            _ => Err(Error::InvalidArgument("memory region")),
        }
    }
}

impl TryFrom<&str> for Region {
    type Error = Error;

    fn try_from(s: &str) -> Result<Self, Error> {
        s.parse()
    }
}

/// Kind of RPMsg payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// Free-form text
    Text,
    /// Integer the daemon converts to its binary form before writing
    Raw,
}

impl MessageKind {
    pub(crate) const fn as_str(self) -> &'static str {
        match self {
            MessageKind::Text => "s",
            MessageKind::Raw => "r",
        }
    }
}

/// RPMsg channel identity: the channel family name, and the port within it.
///
/// Only used to format message commands; the daemon opens the actual device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpmsgChannel {
    name: String,
    port: u32,
}

impl RpmsgChannel {
    /// Create a channel identity.  No validation is done here, see
    /// [`Pru::set_channel()`].
    pub fn new(name: impl Into<String>, port: u32) -> Self {
        Self {
            name: name.into(),
            port,
        }
    }

    /// The identity used by the `pruss_api` driver for `pru`
    pub fn default_for(pru: PruId) -> Self {
        Self::new(DEFAULT_RPMSG_NAME, u32::from(pru.index()))
    }

    /// Channel family name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Port within the family
    pub fn port(&self) -> u32 {
        self.port
    }
}

impl fmt::Display for RpmsgChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.port)
    }
}
