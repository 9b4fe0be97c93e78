//! External trigger and termination notifications.
//!
//! Signal handlers never touch the device. They only enqueue a
//! notification that the sequencing task picks up and handles serially.
//! Triggers travel through a single-slot channel, so at most one round is
//! pending while another is being emitted; further triggers are coalesced.

use crate::error::{EmitKeyError, Result};
use std::fmt;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Why the process was asked to stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// SIGINT.
    Interrupt,
    /// SIGTERM.
    Terminate,
}

impl Termination {
    /// Exit status for this termination cause (128 + signal number).
    pub fn exit_code(self) -> u8 {
        match self {
            Self::Interrupt => 130,
            Self::Terminate => 143,
        }
    }
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Interrupt => write!(f, "interrupt"),
            Self::Terminate => write!(f, "terminate"),
        }
    }
}

/// Receiving half, owned by the sequencer.
pub struct Notifications {
    pub(crate) triggers: mpsc::Receiver<()>,
    pub(crate) terminations: mpsc::Receiver<Termination>,
}

/// Sending half, owned by whatever observes the outside world.
#[derive(Clone)]
pub struct NotificationSender {
    triggers: mpsc::Sender<()>,
    terminations: mpsc::Sender<Termination>,
}

impl Notifications {
    pub fn channel() -> (NotificationSender, Notifications) {
        let (trigger_tx, trigger_rx) = mpsc::channel(1);
        let (termination_tx, termination_rx) = mpsc::channel(1);
        (
            NotificationSender {
                triggers: trigger_tx,
                terminations: termination_tx,
            },
            Notifications {
                triggers: trigger_rx,
                terminations: termination_rx,
            },
        )
    }
}

impl NotificationSender {
    /// Request one emission round. Returns `false` if a round is already
    /// pending or the sequencer is gone.
    pub fn trigger(&self) -> bool {
        self.triggers.try_send(()).is_ok()
    }

    /// Ask the sequencer to tear down. Only the first request matters.
    pub fn terminate(&self, kind: Termination) {
        let _ = self.terminations.try_send(kind);
    }
}

/// Install SIGUSR1 (trigger), SIGINT and SIGTERM handlers and forward them
/// as notifications. Must be called from within a tokio runtime.
pub fn listen_for_signals() -> Result<Notifications> {
    let install = |kind: SignalKind, name: &str| {
        signal(kind).map_err(|e| {
            EmitKeyError::trigger_source(format!("failed to install {name} handler: {e}"))
        })
    };

    let mut usr1 = install(SignalKind::user_defined1(), "SIGUSR1")?;
    let mut interrupt = install(SignalKind::interrupt(), "SIGINT")?;
    let mut terminate = install(SignalKind::terminate(), "SIGTERM")?;

    let (sender, notifications) = Notifications::channel();

    tokio::spawn(async move {
        loop {
            tokio::select! {
                Some(()) = usr1.recv() => {
                    if sender.trigger() {
                        debug!("SIGUSR1 received, round queued");
                    } else {
                        debug!("SIGUSR1 received while a round is pending, coalesced");
                    }
                }
                Some(()) = interrupt.recv() => {
                    info!("SIGINT received");
                    sender.terminate(Termination::Interrupt);
                }
                Some(()) = terminate.recv() => {
                    info!("SIGTERM received");
                    sender.terminate(Termination::Terminate);
                }
                else => break,
            }
        }
    });

    Ok(notifications)
}
