//! Press sequence parsing.
//!
//! A sequence is written as a comma-separated list of `KEY` or
//! `KEY:DELAY_US` tokens, for example `"a,b:500000,enter"`. The delay is
//! the pause in microseconds before the next press.

use crate::catalog;
use crate::error::{EmitKeyError, Result};
use evdev::Key;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

/// Delay between consecutive presses when a token does not give one.
pub const DEFAULT_DELAY_MICROS: u64 = 100_000;

/// One press in a sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyPress {
    pub code: Key,
    /// Pause before the next press. Unused for the last press.
    pub delay_after_micros: u64,
}

impl KeyPress {
    pub fn new(code: Key, delay_after_micros: u64) -> Self {
        Self {
            code,
            delay_after_micros,
        }
    }

    pub fn delay_after(&self) -> Duration {
        Duration::from_micros(self.delay_after_micros)
    }
}

/// A non-empty, ordered list of key presses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PressSequence {
    presses: Vec<KeyPress>,
}

impl PressSequence {
    /// Parse a sequence specification.
    ///
    /// Any unknown key name fails the whole parse. A delay that is not a
    /// non-negative integer is treated as `0`.
    pub fn parse(spec: &str) -> Result<Self> {
        let mut presses = Vec::new();

        for token in spec.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            let (name, delay) = match token.split_once(':') {
                Some((name, delay)) => (name, Some(delay)),
                None => (token, None),
            };

            let code = catalog::lookup(name)?;
            let delay_after_micros = match delay {
                Some(raw) => parse_delay(raw),
                None => DEFAULT_DELAY_MICROS,
            };

            presses.push(KeyPress::new(code, delay_after_micros));
        }

        if presses.is_empty() {
            return Err(EmitKeyError::empty_sequence(spec));
        }

        Ok(Self { presses })
    }

    pub fn presses(&self) -> &[KeyPress] {
        &self.presses
    }

    pub fn len(&self) -> usize {
        self.presses.len()
    }

    /// Never true for a parsed sequence.
    pub fn is_empty(&self) -> bool {
        self.presses.is_empty()
    }

    /// Distinct key codes in the order they first appear.
    pub fn distinct_keys(&self) -> Vec<Key> {
        let mut keys: Vec<Key> = Vec::with_capacity(self.presses.len());
        for press in &self.presses {
            if !keys.contains(&press.code) {
                keys.push(press.code);
            }
        }
        keys
    }
}

impl FromStr for PressSequence {
    type Err = EmitKeyError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

fn parse_delay(raw: &str) -> u64 {
    let raw = raw.trim();
    match raw.parse::<u64>() {
        Ok(micros) => micros,
        Err(_) => {
            warn!("Delay '{}' is not a number of microseconds, using 0", raw);
            0
        }
    }
}
