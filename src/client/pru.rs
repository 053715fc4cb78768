//! A single PRU core.
//!
//! [`Pru`] mirrors the core's lifecycle state locally, checks every lifecycle operation
//! against it before contacting the daemon, and only moves to the new state once the
//! daemon has replied with success.
//!
//! | Operation | Valid from | On success | Otherwise |
//! |---|---|---|---|
//! | [`Pru::enable()`] | Stopped | Running | Absent: [`Error::NoDevice`], Running/Halted: [`Error::Already`] |
//! | [`Pru::disable()`] | Running, Halted | Stopped | Absent: [`Error::NoDevice`], Stopped: [`Error::Already`] |
//! | [`Pru::pause()`] | Running | Halted | Absent/Stopped: [`Error::NoDevice`], Halted: [`Error::Already`] |
//! | [`Pru::resume()`] | Halted | Running | Absent/Stopped: [`Error::NoDevice`], Running: [`Error::Already`] |
//! | [`Pru::reset()`] | any | Running | see method |
//! | [`Pru::load()`] | Stopped, Running, Halted | Running | Absent: [`Error::NoDevice`], otherwise see method |
//!
//! A rejected operation sends nothing to the daemon.

// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

use std::path::Path;
use std::time::Duration;

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};

use crate::channel::{Channel, reply};
use crate::client::{MAX_MESSAGE_LEN, MessageKind, PruId, Region, RpmsgChannel};
use crate::command::Command;
use crate::io::Connector;
use crate::{Error, Result};

/// Lifecycle state of a PRU core
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum PruState {
    /// Subsystem not booted, so there is no device to control
    #[default]
    Absent,
    /// Not executing.  Enabling starts from the first instruction.
    Stopped,
    /// Executing
    Running,
    /// Execution paused.  Resuming continues from where it stopped.
    Halted,
}

/// One of the two PRU cores.
///
/// Obtained from [`crate::Pruss`], which creates both cores and owns them for its
/// lifetime.  Each core has its own private channel to the daemon.
pub struct Pru<C: Connector> {
    id: PruId,
    state: PruState,
    rpmsg: RpmsgChannel,
    channel: Channel<C>,
}

impl<C: Connector> Pru<C> {
    pub(crate) fn new(id: PruId, connector: C) -> Self {
        Self {
            id,
            state: PruState::Absent,
            rpmsg: RpmsgChannel::default_for(id),
            channel: Channel::new(connector),
        }
    }

    /// Which core this is
    pub fn id(&self) -> PruId {
        self.id
    }

    /// Locally mirrored lifecycle state.  Never queries the daemon.
    pub fn state(&self) -> PruState {
        self.state
    }

    /// RPMsg channel identity used by message operations
    pub fn rpmsg_channel(&self) -> &RpmsgChannel {
        &self.rpmsg
    }

    /// Start the core from its first instruction.
    pub fn enable(&mut self) -> Result<()> {
        match self.state {
            PruState::Absent => Err(Error::NoDevice),
            PruState::Running | PruState::Halted => Err(Error::Already),
            PruState::Stopped => self.transition(Command::Enable(self.id), PruState::Running),
        }
    }

    /// Stop the core.
    pub fn disable(&mut self) -> Result<()> {
        match self.state {
            PruState::Absent => Err(Error::NoDevice),
            PruState::Stopped => Err(Error::Already),
            PruState::Running | PruState::Halted => {
                self.transition(Command::Disable(self.id), PruState::Stopped)
            }
        }
    }

    /// Stop the core, then start it again from its first instruction.
    ///
    /// The enable step is always attempted, whatever the outcome of the disable step.
    /// Succeeds if the core ends up running.  Otherwise returns the enable error, unless
    /// that is only [`Error::Already`] because the disable step failed, in which case the
    /// disable error is returned.
    pub fn reset(&mut self) -> Result<()> {
        let disabled = self.disable();
        let enabled = self.enable();
        match (disabled, enabled) {
            (_, Ok(())) => Ok(()),
            (Err(e), Err(Error::Already)) if e != Error::Already => Err(e),
            (_, Err(e)) => Err(e),
        }
    }

    /// Pause execution, such that [`Self::resume()`] continues from the same point.
    pub fn pause(&mut self) -> Result<()> {
        match self.state {
            PruState::Absent | PruState::Stopped => Err(Error::NoDevice),
            PruState::Halted => Err(Error::Already),
            PruState::Running => self.transition(Command::Pause(self.id), PruState::Halted),
        }
    }

    /// Resume execution after [`Self::pause()`].
    pub fn resume(&mut self) -> Result<()> {
        match self.state {
            PruState::Absent | PruState::Stopped => Err(Error::NoDevice),
            PruState::Running => Err(Error::Already),
            PruState::Halted => self.transition(Command::Resume(self.id), PruState::Running),
        }
    }

    /// Install firmware on the core and start it.
    ///
    /// `firmware` may be relative to the current directory: it is resolved to an absolute
    /// path before being sent, as the daemon runs elsewhere.  A path that can't be resolved
    /// is rejected with [`Error::InvalidArgument`] and nothing is sent.
    ///
    /// An [`PruState::Absent`] core is rejected with [`Error::NoDevice`] and nothing is
    /// sent.  Otherwise the core is disabled first.  If installing fails, that error is
    /// returned and the core is left disabled.  Otherwise the core is enabled, and the
    /// result of that is returned, unless the disable was refused by the daemon and left
    /// the core running, in which case the disable error is returned.
    pub fn load(&mut self, firmware: impl AsRef<Path>) -> Result<()> {
        let path = resolve_firmware(firmware.as_ref())?;
        if self.state == PruState::Absent {
            return Err(Error::NoDevice);
        }

        let disabled = self.disable();
        if let Err(e) = &disabled {
            trace!("{}: disable before load: {e}", self.id);
        }

        let reply = self.channel.send_command(&Command::Load {
            pru: self.id,
            firmware: &path,
        })?;
        reply::status(&reply)?;
        debug!("{}: installed {path}", self.id);

        match (disabled, self.enable()) {
            (Err(e), Err(Error::Already)) if e != Error::Already => Err(e),
            (_, enabled) => enabled,
        }
    }

    /// Fetch the contents of the core's register dump.
    ///
    /// General purpose registers are only included by the kernel while the core is not
    /// running.  The dump is returned verbatim.
    pub fn show_registers(&mut self) -> Result<String> {
        let reply = self.channel.send_command(&Command::GetRegs(self.id))?;
        reply::payload(reply)
    }

    /// Use a different RPMsg channel for subsequent message operations, for example
    /// `rpmsg_pru` port 31 when the firmware uses that rather than the `pruss_api` driver.
    ///
    /// `port` must not be negative, and `name` must be a single non-empty word.  Nothing
    /// changes if either is rejected.
    pub fn set_channel(&mut self, port: i32, name: &str) -> Result<()> {
        let port = u32::try_from(port).map_err(|_| Error::InvalidArgument("RPMsg port"))?;
        check_word(name, "RPMsg channel name")?;

        self.rpmsg = RpmsgChannel::new(name, port);
        debug!("{}: RPMsg channel now {}", self.id, self.rpmsg);
        Ok(())
    }

    /// Restore the default RPMsg channel, `pruss_api_pru` with this core's index as the
    /// port.
    pub fn reset_channel(&mut self) {
        self.rpmsg = RpmsgChannel::default_for(self.id);
    }

    /// Send a text message to the firmware over the RPMsg channel.
    ///
    /// The firmware must be running, as it creates the channel.  `text` must fit in an
    /// RPMsg payload ([`MAX_MESSAGE_LEN`] bytes, else [`Error::PayloadTooLarge`]), and must
    /// be a single, non-empty line.
    pub fn send_string_message(&mut self, text: &str) -> Result<()> {
        if text.len() > MAX_MESSAGE_LEN {
            return Err(Error::PayloadTooLarge(text.len()));
        }
        check_line(text)?;
        self.send_message(MessageKind::Text, text)
    }

    /// Send an integer over the RPMsg channel, which the daemon writes in binary form.
    ///
    /// Firmware generally can't afford to parse strings, so this is the simpler way to
    /// pass it numeric data.
    pub fn send_raw_message(&mut self, value: u32) -> Result<()> {
        self.send_message(MessageKind::Raw, &value.to_string())
    }

    /// Fetch the next message queued on the RPMsg channel, or `None` if there is none.
    ///
    /// Never blocks waiting for a message, see [`Self::wait_for_event()`].  A reply that is
    /// a negative error code, such as the RPMsg device not existing, is returned as
    /// [`Error::Remote`] rather than as a message.
    pub fn receive_message(&mut self) -> Result<Option<String>> {
        let reply = self.channel.send_command(&Command::GetMessage {
            channel: &self.rpmsg,
        })?;
        reply::message(reply)
    }

    /// Block until the RPMsg channel has data to read, or `timeout` elapses.
    ///
    /// The daemon does the waiting, so the call blocks for as long as it does: forever if
    /// `timeout` is `None`, as there is no way to cancel a wait.  The timeout is passed in
    /// whole seconds, rounded up.  If it elapses the daemon's error is returned, see
    /// [`Error::is_timeout()`].
    pub fn wait_for_event(&mut self, timeout: Option<Duration>) -> Result<()> {
        let timeout_secs = timeout.map(|t| t.as_secs() + u64::from(t.subsec_nanos() > 0));
        let reply = self.channel.send_command(&Command::EventWait {
            channel: &self.rpmsg,
            timeout_secs,
        })?;
        reply::status(&reply)
    }

    /// Read the byte at `offset` in `region`.
    ///
    /// ```no_run
    /// # use pruss_ctl::{Pruss, PrussConfig, Region};
    /// # let mut pruss = Pruss::open(&PrussConfig::default())?;
    /// let pru0 = pruss.pru0_mut();
    /// let a = pru0.memory_read(Region::Shared, 0x10)?;
    /// let b = pru0.memory_read("dram0", 0x10)?;
    /// # Ok::<(), pruss_ctl::Error>(())
    /// ```
    pub fn memory_read<R>(&mut self, region: R, offset: u32) -> Result<u8>
    where
        R: TryInto<Region>,
        Error: From<R::Error>,
    {
        let region = region.try_into()?;
        let reply = self
            .channel
            .send_command(&Command::MemRead { region, offset })?;
        reply::byte(&reply)
    }

    /// Write `value` to the byte at `offset` in `region`.
    pub fn memory_write<R>(&mut self, region: R, offset: u32, value: u8) -> Result<()>
    where
        R: TryInto<Region>,
        Error: From<R::Error>,
    {
        let region = region.try_into()?;
        let reply = self.channel.send_command(&Command::MemWrite {
            region,
            offset,
            value,
        })?;
        reply::status(&reply)
    }

    pub(crate) fn set_state(&mut self, state: PruState) {
        self.state = state;
    }
}

// Internal functions
impl<C: Connector> Pru<C> {
    fn transition(&mut self, command: Command<'_>, target: PruState) -> Result<()> {
        let reply = self.channel.send_command(&command)?;
        reply::status(&reply)?;

        debug!("{}: {:?} -> {target:?}", self.id, self.state);
        self.state = target;
        Ok(())
    }

    fn send_message(&mut self, kind: MessageKind, payload: &str) -> Result<()> {
        let reply = self.channel.send_command(&Command::SendMessage {
            kind,
            channel: &self.rpmsg,
            payload,
        })?;
        reply::status(&reply)
    }
}

// Helper functions

fn resolve_firmware(firmware: &Path) -> Result<String> {
    let path = firmware.canonicalize().map_err(|e| {
        debug!("Can't resolve firmware {}: {e}", firmware.display());
        Error::InvalidArgument("firmware path")
    })?;
    let path = path
        .into_os_string()
        .into_string()
        .map_err(|_| Error::InvalidArgument("firmware path"))?;
    check_line(&path)?;
    Ok(path)
}

fn check_line(text: &str) -> Result<()> {
    if text.is_empty() {
        Err(Error::InvalidArgument("text must not be empty"))
    } else if text.contains(['\n', '\r', '\0']) {
        Err(Error::InvalidArgument("text must be a single line"))
    } else {
        Ok(())
    }
}

fn check_word(text: &str, what: &'static str) -> Result<()> {
    if text.is_empty() || text.contains(|c: char| c.is_whitespace() || c.is_control()) {
        Err(Error::InvalidArgument(what))
    } else {
        Ok(())
    }
}
