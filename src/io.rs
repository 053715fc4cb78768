//! Transport traits for reaching the `prussd` daemon.
//!
//! A [`Connector`] knows how to open a fresh bidirectional byte stream to the daemon.  It
//! is called once per command: the stream is written, read once, and then dropped, which
//! closes it.
//!
//! # Possible implementations
//!
//! - [`UnixConnector`] - the daemon's Unix domain socket, normally `/tmp/prussd.sock`
//! - Tests and simulators: an in-memory stream that records commands and returns
//!   scripted replies
//! - Remote control: a TCP stream to a forwarder running alongside the daemon

// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

use std::io::{Read, Write};
use std::sync::Arc;

#[cfg(all(unix, feature = "unix-socket"))]
pub use unix::UnixConnector;

/// Connector trait.
pub trait Connector {
    /// The stream type produced by a successful connection.  Dropping it must close the
    /// connection.
    type Stream: Read + Write;

    /// Open a new connection to the daemon.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error if the endpoint does not exist, refuses the
    /// connection, or the connection attempt times out.
    fn connect(&self) -> std::io::Result<Self::Stream>;
}

impl<T: Connector + ?Sized> Connector for Arc<T> {
    type Stream = T::Stream;

    fn connect(&self) -> std::io::Result<Self::Stream> {
        (**self).connect()
    }
}

#[cfg(all(unix, feature = "unix-socket"))]
mod unix {
    use std::io;
    use std::os::fd::OwnedFd;
    use std::os::unix::net::UnixStream;
    use std::path::{Path, PathBuf};
    use std::time::Duration;

    #[allow(unused_imports)]
    use log::{debug, error, info, trace, warn};
    use socket2::{Domain, SockAddr, Socket, Type};

    use super::Connector;
    use crate::client::PrussConfig;

    /// Connects to the daemon's Unix domain stream socket.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct UnixConnector {
        path: PathBuf,
        connect_timeout: Option<Duration>,
        reply_timeout: Option<Duration>,
    }

    impl UnixConnector {
        /// Create a connector from the socket path and timeouts in `config`.
        pub fn new(config: &PrussConfig) -> Self {
            Self {
                path: config.socket_path.clone(),
                connect_timeout: config.connect_timeout,
                reply_timeout: config.reply_timeout,
            }
        }

        /// Path of the daemon socket
        pub fn path(&self) -> &Path {
            &self.path
        }
    }

    impl Connector for UnixConnector {
        type Stream = UnixStream;

        fn connect(&self) -> io::Result<UnixStream> {
            let socket = Socket::new(Domain::UNIX, Type::STREAM, None)?;
            let address = SockAddr::unix(&self.path)?;
            match self.connect_timeout {
                Some(timeout) => socket.connect_timeout(&address, timeout)?,
                None => socket.connect(&address)?,
            }
            let stream = UnixStream::from(OwnedFd::from(socket));

            // None blocks until the daemon replies, which event waits rely on
            stream.set_read_timeout(self.reply_timeout)?;

            trace!("Connected to {}", self.path.display());
            Ok(stream)
        }
    }

}
