//! In-memory stand-in for the daemon, for unit tests.
//!
//! Every connection records the command line written to it and answers with the next
//! scripted reply, or `"0"` once the script is exhausted.

// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

use std::collections::VecDeque;
use std::io::{self, ErrorKind, Read, Write};
use std::sync::{Arc, Mutex};

use crate::io::Connector;

#[derive(Default)]
struct Script {
    replies: VecDeque<String>,
    commands: Vec<String>,
    connections: usize,
    refuse: bool,
}

/// Cloneable handle; clones share the same script and command log.
#[derive(Clone, Default)]
pub(crate) struct FakeDaemon {
    script: Arc<Mutex<Script>>,
}

impl FakeDaemon {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Queue a reply for a future command
    pub(crate) fn reply(&self, reply: &str) -> &Self {
        self.lock().replies.push_back(reply.to_string());
        self
    }

    /// Fail every subsequent connection attempt
    pub(crate) fn refuse_connections(&self) {
        self.lock().refuse = true;
    }

    /// Command lines received so far, without terminators
    pub(crate) fn commands(&self) -> Vec<String> {
        self.lock().commands.clone()
    }

    /// Number of connections made so far
    pub(crate) fn connections(&self) -> usize {
        self.lock().connections
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().unwrap()
    }
}

impl Connector for FakeDaemon {
    type Stream = FakeStream;

    fn connect(&self) -> io::Result<FakeStream> {
        let mut script = self.lock();
        if script.refuse {
            return Err(io::Error::from(ErrorKind::ConnectionRefused));
        }
        script.connections += 1;
        Ok(FakeStream {
            daemon: self.clone(),
            request: Vec::new(),
            reply: None,
        })
    }
}

pub(crate) struct FakeStream {
    daemon: FakeDaemon,
    request: Vec<u8>,
    reply: Option<io::Cursor<Vec<u8>>>,
}

impl Write for FakeStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.request.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Read for FakeStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.reply.is_none() {
            let line = String::from_utf8_lossy(&self.request);
            let line = line.strip_suffix('\n').unwrap_or(&line).to_string();
            let mut script = self.daemon.lock();
            script.commands.push(line);
            let reply = script.replies.pop_front().unwrap_or_else(|| "0".to_string());
            self.reply = Some(io::Cursor::new(reply.into_bytes()));
        }
        match self.reply.as_mut() {
            Some(reply) => reply.read(buf),
            None => Ok(0),
        }
    }
}
