//! End-to-end tests against a fake daemon listening on a real Unix domain socket.

// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

#![cfg(all(unix, feature = "unix-socket"))]

use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixListener;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use pruss_ctl::{Error, PruState, Pruss, PrussConfig, Region};
use rstest::{fixture, rstest};
use tempfile::TempDir;

/// Serves a fixed number of connections, one command each, replying from a script.
struct FakeDaemon {
    _dir: TempDir,
    path: PathBuf,
    requests: Arc<Mutex<Vec<String>>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl FakeDaemon {
    fn spawn(replies: Vec<&str>) -> Self {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("prussd.sock");
        let listener = UnixListener::bind(&path).expect("bind fake daemon");
        let requests = Arc::new(Mutex::new(Vec::new()));
        let replies: Vec<String> = replies.into_iter().map(String::from).collect();

        let requests_clone = Arc::clone(&requests);
        let handle = thread::spawn(move || {
            for reply in replies {
                let (stream, _) = listener.accept().expect("accept");
                let mut reader = BufReader::new(stream);
                let mut line = String::new();
                reader.read_line(&mut line).expect("read command");
                requests_clone
                    .lock()
                    .expect("requests lock")
                    .push(line);
                let mut stream = reader.into_inner();
                stream.write_all(reply.as_bytes()).expect("write reply");
                // Dropping the stream closes the connection
            }
        });

        Self {
            _dir: dir,
            path,
            requests,
            handle: Some(handle),
        }
    }

    fn config(&self) -> PrussConfig {
        PrussConfig::default()
            .with_socket_path(&self.path)
            .with_connect_timeout(Duration::from_secs(5))
            .with_reply_timeout(Duration::from_secs(5))
    }

    /// Wait for every scripted connection, then return the raw command lines.
    fn finish(mut self) -> Vec<String> {
        if let Some(handle) = self.handle.take() {
            handle.join().expect("fake daemon panicked");
        }
        self.requests.lock().expect("requests lock").clone()
    }
}

#[fixture]
fn missing_socket() -> (TempDir, PrussConfig) {
    let dir = tempfile::tempdir().expect("temp dir");
    let config = PrussConfig::default().with_socket_path(dir.path().join("absent.sock"));
    (dir, config)
}

#[rstest]
fn controller_lifecycle_over_socket() {
    let daemon = FakeDaemon::spawn(vec!["0", "0", "0", "0\n", "0", "0"]);

    let mut pruss = Pruss::open(&daemon.config()).expect("open");
    assert!(pruss.is_on());

    let pru0 = pruss.pru0_mut();
    pru0.enable().expect("enable");
    assert_eq!(pru0.state(), PruState::Running);
    assert_eq!(pru0.enable(), Err(Error::Already));

    drop(pruss);

    assert_eq!(
        daemon.finish(),
        vec![
            "DISABLE_0\n",
            "DISABLE_1\n",
            "PROBE_RPROC\n",
            "ENABLE_0\n",
            "DISABLE_0\n",
            "UNPROBE_RPROC\n",
        ]
    );
}

#[rstest]
fn payload_replies_over_socket() {
    let dump = "Control Registers\nCTRL := 0x00000102\n";
    let daemon = FakeDaemon::spawn(vec!["0", "0", "0", dump, "\n", "hello pru\n", "255", "0"]);

    let mut pruss = Pruss::open(&daemon.config()).expect("open");
    let pru1 = pruss.pru1_mut();

    assert_eq!(pru1.show_registers().as_deref(), Ok(dump));
    assert_eq!(pru1.receive_message(), Ok(None));
    assert_eq!(pru1.receive_message(), Ok(Some("hello pru".to_string())));
    assert_eq!(pru1.memory_read(Region::Data0, 4), Ok(255));
    assert_eq!(
        pru1.memory_read("dram7", 4),
        Err(Error::InvalidArgument("memory region"))
    );

    // Explicit shutdown, so drop has nothing left to send
    pruss.shut_down().expect("shut down");

    let requests = daemon.finish();
    assert_eq!(
        requests[3..],
        [
            "GETREGS_1\n",
            "GETMSG pruss_api_pru 1\n",
            "GETMSG pruss_api_pru 1\n",
            "MEMREAD_D0 4\n",
            "UNPROBE_RPROC\n",
        ]
    );
}

#[rstest]
fn missing_daemon_is_connection_failure(missing_socket: (TempDir, PrussConfig)) {
    let (_dir, config) = missing_socket;

    let error = Pruss::open(&config).err().expect("open should fail");

    assert!(matches!(error, Error::ConnectionFailed(_)));
    assert!(error.is_unreachable());
    assert_eq!(error.errno(), -libc::ECONNREFUSED);
}

#[rstest]
fn silent_daemon_times_out() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("prussd.sock");
    let listener = UnixListener::bind(&path).expect("bind");
    let handle = thread::spawn(move || {
        // Two initial stops and the probe.  Never reply, and hold each connection open
        // until the client gives up on it.
        for _ in 0..3 {
            let (stream, _) = listener.accept().expect("accept");
            let mut reader = BufReader::new(stream);
            let mut text = String::new();
            let _ = reader.read_line(&mut text);
            let _ = reader.read_line(&mut text);
        }
    });
    let config = PrussConfig::default()
        .with_socket_path(&path)
        .with_reply_timeout(Duration::from_millis(100));

    let error = Pruss::open(&config).err().expect("open should fail");

    // Stop timeouts are ignored, the probe timeout is not
    assert!(error.is_unreachable(), "{error:?}");
    assert!(error.is_timeout(), "{error:?}");
    handle.join().expect("listener thread");
}
