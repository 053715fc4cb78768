//! Interpretation of replies from the daemon.
//!
//! Lifecycle, probe, message-send, event-wait and memory-write commands get a decimal
//! status back: `0` for success, otherwise a (normally negative) errno.  Anything that
//! doesn't parse as an integer is a protocol error, never success.

// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

use crate::{Error, Result};

/// Convert raw reply bytes to a string, stopping at the first NUL.
pub(crate) fn decode(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|b| *b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

/// Parse a status reply.
pub(crate) fn status(reply: &str) -> Result<()> {
    match code(reply) {
        Some(0) => Ok(()),
        Some(code) => Err(Error::Remote(code)),
        None => Err(Error::Protocol(reply.to_string())),
    }
}

/// Parse a reply carrying a single byte value, or a negative errno.
pub(crate) fn byte(reply: &str) -> Result<u8> {
    match code(reply) {
        Some(code) if code < 0 => Err(Error::Remote(code)),
        Some(code) => u8::try_from(code).map_err(|_| Error::Protocol(reply.to_string())),
        None => Err(Error::Protocol(reply.to_string())),
    }
}

/// Accept a free-form payload, unless the whole reply is a negative errno.
pub(crate) fn payload(reply: String) -> Result<String> {
    match code(&reply) {
        Some(code) if code < 0 => Err(Error::Remote(code)),
        _ => Ok(reply),
    }
}

/// Interpret an RPMsg receive reply.  An empty reply or a lone newline means no message
/// was queued, and a negative integer is the daemon's error code.
pub(crate) fn message(reply: String) -> Result<Option<String>> {
    let reply = payload(reply)?;
    let text = reply.strip_suffix('\n').unwrap_or(&reply);
    if text.is_empty() {
        Ok(None)
    } else {
        Ok(Some(text.to_string()))
    }
}

fn code(reply: &str) -> Option<i32> {
    reply
        .trim_matches(|c: char| c.is_whitespace() || c == '\0')
        .parse()
        .ok()
}
