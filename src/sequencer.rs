//! Press sequencer: drives a virtual keyboard through its lifecycle.
//!
//! ```text
//! Uninitialized -> Registered -> Created -> Armed -> Emitting -> Settling -> Destroyed
//! ```
//!
//! The device is created after every key in the sequence has been
//! registered and is destroyed exactly once on every path out of
//! [`PressSequencer::run`], including emission failures and termination
//! requests.

use crate::device::{DeviceEvent, DeviceGuard, DeviceIdentity, InputBackend, VirtualKeyboard};
use crate::error::{EmitKeyError, Result};
use crate::sequence::PressSequence;
use crate::trigger::{Notifications, Termination};
use evdev::Key;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default wait after creating the device and before destroying it.
pub const DEFAULT_SETTLE: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceState {
    Uninitialized,
    Registered,
    Created,
    Armed,
    Emitting,
    Settling,
    Destroyed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmissionMode {
    /// Emit one round after the create settle delay, then exit.
    Immediate,
    /// Emit one round per trigger until a termination request.
    WaitForTrigger,
}

/// Settle delays around the device's lifetime.
///
/// These give udev and input listeners time to pick up a new device and
/// to read the last events before the device goes away. They are a best
/// effort heuristic, not a synchronisation guarantee.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    pub create_settle: Duration,
    pub destroy_settle: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            create_settle: DEFAULT_SETTLE,
            destroy_settle: DEFAULT_SETTLE,
        }
    }
}

impl Timing {
    pub fn zero() -> Self {
        Self {
            create_settle: Duration::ZERO,
            destroy_settle: Duration::ZERO,
        }
    }
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    Terminated(Termination),
}

impl Outcome {
    pub fn exit_code(self) -> u8 {
        match self {
            Self::Completed => 0,
            Self::Terminated(kind) => kind.exit_code(),
        }
    }
}

pub struct PressSequencer {
    sequence: PressSequence,
    mode: EmissionMode,
    timing: Timing,
    identity: DeviceIdentity,
    state: DeviceState,
    rounds: u64,
}

impl PressSequencer {
    pub fn new(sequence: PressSequence, mode: EmissionMode) -> Self {
        Self {
            sequence,
            mode,
            timing: Timing::default(),
            identity: DeviceIdentity::default(),
            state: DeviceState::Uninitialized,
            rounds: 0,
        }
    }

    pub fn with_timing(mut self, timing: Timing) -> Self {
        self.timing = timing;
        self
    }

    pub fn with_identity(mut self, identity: DeviceIdentity) -> Self {
        self.identity = identity;
        self
    }

    pub fn state(&self) -> DeviceState {
        self.state
    }

    /// Number of emission rounds started so far.
    pub fn rounds(&self) -> u64 {
        self.rounds
    }

    /// Create the device, emit according to the mode, then settle and
    /// destroy the device.
    ///
    /// A backend failure during creation is returned as is; there is
    /// nothing to destroy in that case.
    pub async fn run<B: InputBackend>(
        &mut self,
        backend: &mut B,
        mut notifications: Notifications,
    ) -> Result<Outcome> {
        for key in self.sequence.distinct_keys() {
            backend.register_capability(key);
        }
        self.transition(DeviceState::Registered);

        let mut device = DeviceGuard::new(backend.create(&self.identity)?);
        self.transition(DeviceState::Created);

        let outcome = match self.mode {
            EmissionMode::Immediate => self.run_immediate(&mut device, &mut notifications).await,
            EmissionMode::WaitForTrigger => {
                self.run_triggered(&mut device, &mut notifications).await
            }
        };

        self.transition(DeviceState::Settling);
        tokio::time::sleep(self.timing.destroy_settle).await;
        let destroyed = device.destroy();
        self.transition(DeviceState::Destroyed);

        match (outcome, destroyed) {
            (Ok(outcome), Ok(())) => Ok(outcome),
            (Ok(_), Err(e)) => Err(e),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(destroy_err)) => {
                warn!("Failed to destroy virtual device: {}", destroy_err);
                Err(e)
            }
        }
    }

    async fn run_immediate<D: VirtualKeyboard>(
        &mut self,
        device: &mut DeviceGuard<D>,
        notifications: &mut Notifications,
    ) -> Result<Outcome> {
        let Notifications {
            triggers,
            terminations,
        } = notifications;

        self.transition(DeviceState::Armed);
        info!(
            "Pressing {} key(s) on '{}'",
            self.sequence.len(),
            self.identity.name
        );
        let settle = self.timing.create_settle;
        let emission = async {
            tokio::time::sleep(settle).await;
            self.emit_round(device).await
        };
        tokio::pin!(emission);

        loop {
            tokio::select! {
                biased;
                Some(kind) = terminations.recv() => return Ok(Outcome::Terminated(kind)),
                result = &mut emission => return result.map(|()| Outcome::Completed),
                Some(()) = triggers.recv() => debug!("Trigger ignored in immediate mode"),
            }
        }
    }

    async fn run_triggered<D: VirtualKeyboard>(
        &mut self,
        device: &mut DeviceGuard<D>,
        notifications: &mut Notifications,
    ) -> Result<Outcome> {
        // Drop triggers queued before the device existed.
        let mut stale = 0;
        while notifications.triggers.try_recv().is_ok() {
            stale += 1;
        }
        if stale > 0 {
            debug!("Discarded {} trigger(s) received before arming", stale);
        }

        self.transition(DeviceState::Armed);
        info!(
            "Waiting for SIGUSR1 (pid {}), Ctrl+C to stop",
            std::process::id()
        );

        loop {
            tokio::select! {
                biased;
                Some(kind) = notifications.terminations.recv() => {
                    return Ok(Outcome::Terminated(kind));
                }
                Some(()) = notifications.triggers.recv() => {
                    tokio::select! {
                        biased;
                        Some(kind) = notifications.terminations.recv() => {
                            info!("Round interrupted by {} request", kind);
                            return Ok(Outcome::Terminated(kind));
                        }
                        result = self.emit_round(device) => result?,
                    }
                    self.transition(DeviceState::Armed);
                }
                else => {
                    return Err(EmitKeyError::trigger_source(
                        "trigger and termination sources closed",
                    ));
                }
            }
        }
    }

    /// Emit every press of the sequence in order. Suspension only happens
    /// between presses, so cancelling a round never leaves a key held.
    async fn emit_round<D: VirtualKeyboard>(&mut self, device: &mut DeviceGuard<D>) -> Result<()> {
        self.transition(DeviceState::Emitting);
        self.rounds += 1;
        debug!("Emitting round {}", self.rounds);

        let presses = self.sequence.presses();
        for (index, press) in presses.iter().enumerate() {
            press_key(device, press.code)?;
            if index + 1 < presses.len() {
                tokio::time::sleep(press.delay_after()).await;
            }
        }

        info!("Emitted {} key press(es)", presses.len());
        Ok(())
    }

    fn transition(&mut self, next: DeviceState) {
        debug!("Device state {:?} -> {:?}", self.state, next);
        self.state = next;
    }
}

fn press_key<D: VirtualKeyboard>(device: &mut DeviceGuard<D>, code: Key) -> Result<()> {
    device.inject(DeviceEvent::key_down(code))?;
    device.inject(DeviceEvent::SynReport)?;
    device.inject(DeviceEvent::key_up(code))?;
    device.inject(DeviceEvent::SynReport)
}
