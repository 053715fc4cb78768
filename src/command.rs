//! Commands understood by the `prussd` daemon, and their wire encoding.
//!
//! Every command is a single line of ASCII text: a verb, optionally followed by
//! space-separated arguments.  The [`core::fmt::Display`] implementation of [`Command`]
//! produces that line, without the terminating newline, which the channel adds.
//!
//! | Command | Line |
//! |---|---|
//! | [`Command::ProbeRproc`] | `PROBE_RPROC` |
//! | [`Command::UnprobeRproc`] | `UNPROBE_RPROC` |
//! | [`Command::Enable`] | `ENABLE_<n>` |
//! | [`Command::Disable`] | `DISABLE_<n>` |
//! | [`Command::Pause`] | `PAUSE_<n>` |
//! | [`Command::Resume`] | `RESUME_<n>` |
//! | [`Command::GetRegs`] | `GETREGS_<n>` |
//! | [`Command::Load`] | `LOAD_<n> <firmware>` |
//! | [`Command::SendMessage`] | `SENDMSG <s\|r> <name> <port> <payload>` |
//! | [`Command::GetMessage`] | `GETMSG <name> <port>` |
//! | [`Command::EventWait`] | `EVENTWAIT <name> <port> [<timeout>]` |
//! | [`Command::MemRead`] | `MEMREAD_S <offset>`, `MEMREAD_D<m> <offset>` |
//! | [`Command::MemWrite`] | `MEMWRITE_S <offset> <value>`, `MEMWRITE_D<m> <offset> <value>` |

// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

use core::fmt;

use crate::client::{MessageKind, PruId, Region, RpmsgChannel};

/// A single daemon command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command<'a> {
    /// Probe the remoteproc driver, bringing the subsystem up
    ProbeRproc,
    /// Unprobe the remoteproc driver, taking the subsystem down
    UnprobeRproc,
    /// Start a core from its first instruction
    Enable(PruId),
    /// Stop a core
    Disable(PruId),
    /// Halt a core so that it can be resumed
    Pause(PruId),
    /// Resume a halted core
    Resume(PruId),
    /// Fetch a core's register dump
    GetRegs(PruId),
    /// Install firmware from an absolute path
    Load { pru: PruId, firmware: &'a str },
    /// Send an RPMsg message
    SendMessage {
        kind: MessageKind,
        channel: &'a RpmsgChannel,
        payload: &'a str,
    },
    /// Fetch the next queued RPMsg message, without blocking
    GetMessage { channel: &'a RpmsgChannel },
    /// Block in the daemon until the RPMsg channel has data, or the timeout elapses
    EventWait {
        channel: &'a RpmsgChannel,
        timeout_secs: Option<u64>,
    },
    /// Read a byte of PRU memory
    MemRead { region: Region, offset: u32 },
    /// Write a byte of PRU memory
    MemWrite { region: Region, offset: u32, value: u8 },
}

impl fmt::Display for Command<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::ProbeRproc => f.write_str("PROBE_RPROC"),
            Command::UnprobeRproc => f.write_str("UNPROBE_RPROC"),
            Command::Enable(pru) => write!(f, "ENABLE_{}", pru.index()),
            Command::Disable(pru) => write!(f, "DISABLE_{}", pru.index()),
            Command::Pause(pru) => write!(f, "PAUSE_{}", pru.index()),
            Command::Resume(pru) => write!(f, "RESUME_{}", pru.index()),
            Command::GetRegs(pru) => write!(f, "GETREGS_{}", pru.index()),
            Command::Load { pru, firmware } => write!(f, "LOAD_{} {firmware}", pru.index()),
            Command::SendMessage {
                kind,
                channel,
                payload,
            } => write!(f, "SENDMSG {} {channel} {payload}", kind.as_str()),
            Command::GetMessage { channel } => write!(f, "GETMSG {channel}"),
            Command::EventWait {
                channel,
                timeout_secs,
            } => match timeout_secs {
                Some(secs) => write!(f, "EVENTWAIT {channel} {secs}"),
                None => write!(f, "EVENTWAIT {channel}"),
            },
            Command::MemRead { region, offset } => {
                write!(f, "MEMREAD_{} {offset}", region.wire_suffix())
            }
            Command::MemWrite {
                region,
                offset,
                value,
            } => write!(f, "MEMWRITE_{} {offset} {value}", region.wire_suffix()),
        }
    }
}
