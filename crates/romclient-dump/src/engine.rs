//! ROM dump state machine
//!
//! [`RomDump`] is driven by calling [`RomDump::step`] repeatedly, from a timer
//! or a plain loop. Each call does the work of one state, so at most one
//! firmware exchange happens per call and the host stays responsive.
//!
//! ```text
//! INIT -> READY -> DUMP_BEGIN -> DUMP -> DUMP_END ----------> RESET -> READY
//!                      |          |  \                          ^
//!                      |          |   DUMP_TIMEOUT -> DUMP_FAIL-+
//!                      +----------+------------------^    ^
//!                                         DUMP_ABORT -----+
//! ```

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use romclient_core::bankswitch::{BankSwitch, ReadOp, ReadPlan};
use romclient_core::protocol::Packet;
use romclient_core::rom::Rom;
use romclient_serial::{FwLink, LinkError, Transport};

use crate::error::{DumpError, Result};
use crate::events::{DumpEvents, LogEvents};
use crate::save::save_dump;

/// Tick budget used when counting polling steps
pub const DEFAULT_TIMEOUT_TICKS: u32 = 10;

/// Wall-clock budget for a whole dump
pub const DEFAULT_DUMP_TIMEOUT: Duration = Duration::from_secs(10);

/// State machine states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Initial state, left on the first step
    Init,
    /// Idle, a dump may be requested
    Ready,
    /// Lock settings and synchronize with the firmware
    DumpBegin,
    /// Reading the cartridge
    Dump,
    /// All reads done
    DumpEnd,
    /// Abort requested by the caller
    DumpAbort,
    /// Dump failed
    DumpFail,
    /// Dump ran out of time
    DumpTimeout,
    /// Release the lock and go back to ready
    Reset,
}

/// Outcome of a single [`RomDump::step`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Poll {
    /// Nothing to do
    Idle,
    /// A dump is in progress
    Busy,
    /// The dump completed and the image is available
    Finished,
    /// The dump failed, timed out or was aborted
    Aborted,
}

/// How long a dump may take
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DumpTimeout {
    /// Number of `step` calls spent in the dump state
    Ticks(u32),
    /// Monotonic time from the start of the dump
    Deadline(Duration),
}

impl Default for DumpTimeout {
    fn default() -> Self {
        DumpTimeout::Deadline(DEFAULT_DUMP_TIMEOUT)
    }
}

#[derive(Debug, Clone, Copy)]
enum Countdown {
    Ticks(u32),
    Deadline(Instant),
}

impl Countdown {
    fn start(timeout: DumpTimeout) -> Self {
        match timeout {
            DumpTimeout::Ticks(n) => Countdown::Ticks(n),
            DumpTimeout::Deadline(d) => Countdown::Deadline(Instant::now() + d),
        }
    }

    fn expired(&self) -> bool {
        match *self {
            Countdown::Ticks(n) => n == 0,
            Countdown::Deadline(deadline) => Instant::now() >= deadline,
        }
    }

    fn tick(&mut self) {
        if let Countdown::Ticks(n) = self {
            *n = n.saturating_sub(1);
        }
    }
}

/// ROM dump engine
///
/// Owns the firmware link and the image being assembled. Port, bank-switching
/// and output settings can only be changed while no dump holds the lock.
pub struct RomDump<T: Transport, E: DumpEvents = LogEvents> {
    link: FwLink<T>,
    events: E,
    state: State,
    bankswitch: BankSwitch,
    timeout: DumpTimeout,
    countdown: Option<Countdown>,
    plan: ReadPlan,
    next_op: usize,
    /// Request sent but not yet answered
    outstanding: Option<Packet>,
    rom: Rom,
    data_length: usize,
    locked: bool,
    output: Option<PathBuf>,
    last_rom: Option<Vec<u8>>,
    last_artifact: Option<PathBuf>,
    failure: Option<DumpError>,
}

impl<T: Transport> RomDump<T, LogEvents> {
    /// Create an engine that reports through the `log` crate
    pub fn new(link: FwLink<T>) -> Self {
        Self::with_events(link, LogEvents)
    }
}

impl<T: Transport, E: DumpEvents> RomDump<T, E> {
    /// Create an engine with a custom event handler
    pub fn with_events(link: FwLink<T>, events: E) -> Self {
        Self {
            link,
            events,
            state: State::Init,
            bankswitch: BankSwitch::None,
            timeout: DumpTimeout::default(),
            countdown: None,
            plan: ReadPlan::new(0),
            next_op: 0,
            outstanding: None,
            rom: Rom::new(),
            data_length: 0,
            locked: false,
            output: None,
            last_rom: None,
            last_artifact: None,
            failure: None,
        }
    }

    /// Current state
    pub fn state(&self) -> State {
        self.state
    }

    /// Whether a dump is between start and return to ready
    pub fn is_busy(&self) -> bool {
        !matches!(self.state, State::Init | State::Ready)
    }

    /// Whether settings are locked by a running dump
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Firmware link
    pub fn link(&self) -> &FwLink<T> {
        &self.link
    }

    /// Replace the firmware link, returning the previous one
    pub fn replace_link(&mut self, link: FwLink<T>) -> Result<FwLink<T>> {
        self.check_unlocked()?;
        Ok(std::mem::replace(&mut self.link, link))
    }

    /// Event handler
    pub fn events(&self) -> &E {
        &self.events
    }

    /// Selected bank-switching scheme
    pub fn bankswitch(&self) -> BankSwitch {
        self.bankswitch
    }

    /// Select the bank-switching scheme for the next dump
    pub fn set_bankswitch(&mut self, bankswitch: BankSwitch) -> Result<()> {
        self.check_unlocked()?;
        self.bankswitch = bankswitch;
        Ok(())
    }

    /// Set the timeout for the next dump
    pub fn set_timeout(&mut self, timeout: DumpTimeout) -> Result<()> {
        self.check_unlocked()?;
        self.timeout = timeout;
        Ok(())
    }

    /// Set the file completed dumps are saved to
    pub fn set_output(&mut self, output: Option<PathBuf>) -> Result<()> {
        self.check_unlocked()?;
        self.output = output;
        Ok(())
    }

    /// Image being assembled
    pub fn rom(&self) -> &Rom {
        &self.rom
    }

    /// Contents of the last successful dump
    pub fn last_rom(&self) -> Option<&[u8]> {
        self.last_rom.as_deref()
    }

    /// File the last successful dump was saved to
    pub fn last_artifact_path(&self) -> Option<&Path> {
        self.last_artifact.as_deref()
    }

    /// Bytes received so far and total image size
    pub fn progress(&self) -> (usize, usize) {
        (self.data_length, self.plan.rom_size())
    }

    /// Steps left before a tick based timeout fires
    pub fn remaining_ticks(&self) -> Option<u32> {
        match self.countdown {
            Some(Countdown::Ticks(n)) => Some(n),
            _ => None,
        }
    }

    /// Take the reason the last dump failed
    pub fn take_failure(&mut self) -> Option<DumpError> {
        self.failure.take()
    }

    fn check_unlocked(&self) -> Result<()> {
        if self.locked {
            return Err(DumpError::Locked);
        }
        Ok(())
    }

    /// Start a dump with the current settings
    ///
    /// Only accepted in [`State::Ready`]. An unsupported bank-switching scheme
    /// is rejected here, before anything is locked.
    pub fn request_dump(&mut self) -> Result<()> {
        if self.state != State::Ready {
            return Err(DumpError::Busy);
        }

        self.plan = self
            .bankswitch
            .read_plan()
            .map_err(|_| DumpError::Unsupported(self.bankswitch.name()))?;
        self.failure = None;
        self.state = State::DumpBegin;
        Ok(())
    }

    /// Ask a running dump to stop
    ///
    /// Takes effect on the next step. Returns false if no dump is running.
    pub fn abort(&mut self) -> bool {
        if matches!(self.state, State::DumpBegin | State::Dump) {
            self.state = State::DumpAbort;
            true
        } else {
            false
        }
    }

    /// Advance the state machine by one state
    pub fn step(&mut self) -> Poll {
        match self.state {
            State::Init => {
                self.state = State::Ready;
                Poll::Idle
            }
            State::Ready => Poll::Idle,
            State::DumpBegin => {
                self.begin();
                Poll::Busy
            }
            State::Dump => {
                self.dump();
                Poll::Busy
            }
            State::DumpEnd => self.end(),
            State::DumpTimeout => {
                self.events.log("Operation timed out.");
                let received = format!("Total bytes received {}", self.data_length);
                self.events.debug(&received);
                self.failure = Some(DumpError::Timeout);
                self.state = State::DumpFail;
                Poll::Busy
            }
            State::DumpAbort => {
                self.events.log("Dump operation aborted.");
                self.failure = Some(DumpError::Aborted);
                self.state = State::DumpFail;
                Poll::Busy
            }
            State::DumpFail => {
                self.events.log("ROM dump failed.");
                self.rom.set_valid(false);
                self.outstanding = None;
                self.unlock();
                self.events.aborted();
                self.state = State::Reset;
                Poll::Aborted
            }
            State::Reset => {
                self.unlock();
                self.state = State::Ready;
                Poll::Idle
            }
        }
    }

    /// Drive a requested dump until the engine is ready again
    ///
    /// Fails with [`DumpError::NotStarted`] if no dump was requested.
    pub fn finish(&mut self) -> Result<Vec<u8>> {
        if !self.is_busy() {
            return Err(DumpError::NotStarted);
        }

        let mut outcome = Poll::Idle;
        while self.is_busy() {
            match self.step() {
                poll @ (Poll::Finished | Poll::Aborted) => outcome = poll,
                _ => {}
            }
        }

        match (outcome, &self.last_rom) {
            (Poll::Finished, Some(rom)) => Ok(rom.clone()),
            _ => Err(self.failure.take().unwrap_or(DumpError::Aborted)),
        }
    }

    fn lock(&mut self) {
        if !self.locked {
            self.locked = true;
            self.events.lock();
        }
    }

    fn unlock(&mut self) {
        if self.locked {
            self.locked = false;
            self.events.unlock();
        }
    }

    fn fail(&mut self, error: DumpError) {
        self.events.log(&error.to_string());
        self.failure = Some(error);
        self.state = State::DumpFail;
    }

    fn begin(&mut self) {
        self.events.log("Starting ROM dump");
        self.lock();

        self.data_length = 0;
        self.next_op = 0;
        self.outstanding = None;
        if let Err(e) = self.rom.set_size(self.plan.rom_size()) {
            self.fail(e.into());
            return;
        }
        self.countdown = Some(Countdown::start(self.timeout));

        // Drop replies left over from an earlier dump
        match self.link.clear().and_then(|()| self.link.synchronize()) {
            Ok(()) => self.state = State::Dump,
            Err(e) => {
                self.events.debug(&format!("Write failed. Reason: {}", e));
                self.fail(e.into());
            }
        }
    }

    fn dump(&mut self) {
        let Some(countdown) = self.countdown.as_mut() else {
            self.state = State::DumpTimeout;
            return;
        };
        if countdown.expired() {
            self.state = State::DumpTimeout;
            return;
        }
        countdown.tick();

        match self.execute_next() {
            Ok(()) if self.next_op >= self.plan.len() => self.state = State::DumpEnd,
            Ok(()) => {}
            Err(e) => self.fail(e),
        }
    }

    /// Run the next step of the read plan
    ///
    /// A read that got no reply at all stays outstanding and is picked up
    /// again on the next call without being resent.
    fn execute_next(&mut self) -> Result<()> {
        let Some(&op) = self.plan.ops().get(self.next_op) else {
            return Ok(());
        };

        let request = match self.outstanding.take() {
            Some(request) => request,
            None => {
                let request = op.request();
                self.link.send(&request)?;
                request
            }
        };

        let reply = match self.link.receive(&request) {
            Ok(reply) => reply,
            Err(LinkError::NoReply) => {
                self.events.debug(&format!(
                    "No reply yet for read at 0x{:04X}",
                    request.address()
                ));
                self.outstanding = Some(request);
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        if let ReadOp::Block { offset, .. } = op {
            self.rom.write(offset, reply.payload())?;
            self.data_length += reply.payload().len();
        }
        self.next_op += 1;
        Ok(())
    }

    fn end(&mut self) -> Poll {
        self.rom.set_valid(true);
        let data = match self.rom.snapshot() {
            Ok(data) => data,
            Err(e) => {
                self.fail(e.into());
                return Poll::Busy;
            }
        };

        self.events.log(&format!(
            "ROM dump complete ({} bytes, {})",
            data.len(),
            self.bankswitch
        ));
        self.events.finished(&data);

        self.last_artifact = None;
        if let Some(path) = self.output.clone() {
            match save_dump(&path, &self.rom) {
                Ok(()) => {
                    self.events
                        .log(&format!("Saved ROM dump to {}", path.display()));
                    self.last_artifact = Some(path);
                }
                Err(e) => {
                    log::error!("romdump: {}", e);
                    self.events.log(&e.to_string());
                    self.failure = Some(e);
                }
            }
        }

        self.last_rom = Some(data);
        self.state = State::Reset;
        Poll::Finished
    }
}
