//! # emit-key
//!
//! Press keys on a virtual uinput keyboard, either once or every time the
//! process receives SIGUSR1.
//!
//! ## Features
//!
//! - Case-insensitive key names (`F1`–`F12`, `a`–`z`, `0`–`9`, editing and
//!   arrow keys)
//! - Timed sequences such as `a,b:500000,enter` (delays in microseconds)
//! - One-shot or signal-triggered emission, repeatable on every trigger
//! - Guaranteed device teardown on completion, SIGINT and SIGTERM
//! - JSON configuration file support
//!
//! ## Example
//!
//! ```no_run
//! use emit_key::{EmissionMode, Notifications, PressSequence, PressSequencer, UinputBackend};
//!
//! # async fn demo() -> emit_key::Result<()> {
//! let sequence = PressSequence::parse("a,b:500000,enter")?;
//! let mut sequencer = PressSequencer::new(sequence, EmissionMode::Immediate);
//! let (_sender, notifications) = Notifications::channel();
//!
//! let outcome = sequencer.run(&mut UinputBackend::new(), notifications).await?;
//! assert_eq!(outcome.exit_code(), 0);
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod cli;
pub mod config;
pub mod device;
pub mod error;
pub mod sequence;
pub mod sequencer;
pub mod trigger;

pub use config::Config;
pub use device::{DeviceEvent, DeviceIdentity, InputBackend, UinputBackend, VirtualKeyboard};
pub use error::{EmitKeyError, Result};
pub use sequence::{KeyPress, PressSequence};
pub use sequencer::{DeviceState, EmissionMode, Outcome, PressSequencer, Timing};
pub use trigger::{NotificationSender, Notifications, Termination};
