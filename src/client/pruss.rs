//! The PRU-ICSS controller.
//!
//! [`Pruss`] owns both cores and the on/off state of the subsystem they live in.  The
//! subsystem is brought up by having the daemon probe the remoteproc driver, after which
//! both cores exist and are stopped.  While it is off, both cores are
//! [`PruState::Absent`] and every lifecycle operation on them fails with
//! [`Error::NoDevice`] without contacting the daemon.
//!
//! Unlike a process-wide singleton, a `Pruss` is created explicitly, by
//! [`Pruss::open()`] or [`Pruss::init()`], and shuts the subsystem down when dropped.

// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};

use crate::channel::{Channel, reply};
use crate::client::{Pru, PruId, PruState};
use crate::command::Command;
use crate::io::Connector;
use crate::{Error, Result};

/// PRU-ICSS controller, owning both PRU cores.
///
/// Example usage:
///
/// ```no_run
/// use pruss_ctl::{Pruss, PrussConfig};
///
/// let mut pruss = Pruss::open(&PrussConfig::default())?;
/// assert!(pruss.is_on());
///
/// pruss.pru1_mut().load("/home/debian/blinky.out")?;
/// pruss.restart()?;
/// # Ok::<(), pruss_ctl::Error>(())
/// ```
pub struct Pruss<C: Connector> {
    on: bool,
    channel: Channel<C>,
    pru0: Pru<C>,
    pru1: Pru<C>,
}

#[cfg(all(unix, feature = "unix-socket"))]
impl Pruss<crate::io::UnixConnector> {
    /// Connect to the daemon's Unix socket as configured by `config`, and bring the
    /// subsystem up.  See [`Self::init()`].
    pub fn open(config: &crate::PrussConfig) -> Result<Self> {
        Self::init(crate::io::UnixConnector::new(config))
    }
}

impl<C: Connector + Clone> Pruss<C> {
    /// Create a controller with the subsystem assumed off, without contacting the daemon.
    ///
    /// Use [`Self::boot_up()`] to bring the subsystem up, or [`Self::init()`] instead of
    /// this function.
    pub fn new(connector: C) -> Self {
        Self {
            on: false,
            pru0: Pru::new(PruId::Pru0, connector.clone()),
            pru1: Pru::new(PruId::Pru1, connector.clone()),
            channel: Channel::new(connector),
        }
    }

    /// Create a controller and bring the subsystem up.
    ///
    /// Both cores are first stopped, whatever state a previous user left them in, with
    /// any errors ignored.  Then the subsystem is booted, and any failure to do so is
    /// returned.
    pub fn init(connector: C) -> Result<Self> {
        let mut pruss = Self::new(connector);
        pruss.stop_cores();
        pruss.boot_up()?;
        Ok(pruss)
    }
}

impl<C: Connector> Pruss<C> {
    /// Whether the subsystem is on, as far as this controller knows.
    pub fn is_on(&self) -> bool {
        self.on
    }

    /// Bring the subsystem up, by probing the remoteproc driver.
    ///
    /// Returns [`Error::Already`] without contacting the daemon if the subsystem is
    /// already on.  On success both cores are [`PruState::Stopped`].
    pub fn boot_up(&mut self) -> Result<()> {
        if self.on {
            return Err(Error::Already);
        }
        let reply = self.channel.send_command(&Command::ProbeRproc)?;
        reply::status(&reply)?;

        self.on = true;
        self.pru0.set_state(PruState::Stopped);
        self.pru1.set_state(PruState::Stopped);
        debug!("PRUSS booted");
        Ok(())
    }

    /// Take the subsystem down, by stopping both cores and unprobing the remoteproc
    /// driver.
    ///
    /// Returns [`Error::Already`] without contacting the daemon if the subsystem is
    /// already off.  Failures to stop the cores are ignored.  On success both cores are
    /// [`PruState::Absent`].
    pub fn shut_down(&mut self) -> Result<()> {
        if !self.on {
            return Err(Error::Already);
        }
        for pru in [&mut self.pru0, &mut self.pru1] {
            match pru.disable() {
                Ok(()) | Err(Error::Already) => (),
                Err(e) => warn!("{}: failed to stop during shutdown: {e}", pru.id()),
            }
        }
        let reply = self.channel.send_command(&Command::UnprobeRproc)?;
        reply::status(&reply)?;

        self.on = false;
        self.pru0.set_state(PruState::Absent);
        self.pru1.set_state(PruState::Absent);
        debug!("PRUSS shut down");
        Ok(())
    }

    /// Shut the subsystem down, then boot it up again.
    ///
    /// Both steps are always attempted.  A shutdown failure is logged rather than
    /// returned, and the boot result is returned.  If a step fails, [`Self::is_on()`] may
    /// no longer match what the daemon actually did.
    pub fn restart(&mut self) -> Result<()> {
        if let Err(e) = self.shut_down() {
            warn!("PRUSS restart: shutdown failed: {e}");
        }
        self.boot_up()
    }

    /// PRU0
    pub fn pru0(&self) -> &Pru<C> {
        &self.pru0
    }

    /// PRU0, for control
    pub fn pru0_mut(&mut self) -> &mut Pru<C> {
        &mut self.pru0
    }

    /// PRU1
    pub fn pru1(&self) -> &Pru<C> {
        &self.pru1
    }

    /// PRU1, for control
    pub fn pru1_mut(&mut self) -> &mut Pru<C> {
        &mut self.pru1
    }

    /// The core identified by `id`
    pub fn pru(&self, id: PruId) -> &Pru<C> {
        match id {
            PruId::Pru0 => &self.pru0,
            PruId::Pru1 => &self.pru1,
        }
    }

    /// The core identified by `id`, for control
    pub fn pru_mut(&mut self, id: PruId) -> &mut Pru<C> {
        match id {
            PruId::Pru0 => &mut self.pru0,
            PruId::Pru1 => &mut self.pru1,
        }
    }
}

// Internal functions
impl<C: Connector> Pruss<C> {
    // Sent regardless of local state, as that is unknown until booted
    fn stop_cores(&mut self) {
        for id in PruId::ALL {
            let result = self
                .channel
                .send_command(&Command::Disable(id))
                .and_then(|text| reply::status(&text));
            if let Err(e) = result {
                trace!("{id}: initial stop: {e}");
            }
        }
    }
}

impl<C: Connector> Drop for Pruss<C> {
    fn drop(&mut self) {
        if self.on {
            if let Err(e) = self.shut_down() {
                warn!("Failed to shut PRUSS down: {e}");
            }
        }
    }
}
