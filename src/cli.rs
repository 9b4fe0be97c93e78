//! Command line interface.

use crate::config::{parse_duration, Config};
use crate::error::{EmitKeyError, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(
    name = "emit-key",
    version,
    about = "Emit key presses through a virtual uinput keyboard",
    long_about = "Creates a virtual keyboard and presses one or more keys on it, either \
                  right away or every time the process receives SIGUSR1.\n\n\
                  Key sequences are comma separated, each entry optionally followed by \
                  ':<microseconds>' to set the pause before the next key, e.g. \
                  'a,b:500000,enter'."
)]
pub struct Cli {
    /// Key name or comma-separated `name[:delay_us]` sequence [default: F12]
    #[arg(short = 'k', long = "keys", value_name = "SPEC")]
    pub keys: Option<String>,

    /// Wait for SIGUSR1 and emit the sequence on every signal
    #[arg(short = 's', long = "wait-for-signal")]
    pub wait_for_signal: bool,

    /// JSON configuration file; command line flags take precedence
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Pause after creating the device before the first press [default: 1s]
    #[arg(long, value_name = "DURATION", value_parser = parse_duration)]
    pub create_settle: Option<Duration>,

    /// Pause before destroying the device [default: 1s]
    #[arg(long, value_name = "DURATION", value_parser = parse_duration)]
    pub destroy_settle: Option<Duration>,

    /// Name of the virtual device [default: "Emit key"]
    #[arg(long, value_name = "NAME")]
    pub device_name: Option<String>,

    /// Print the supported key names and exit
    #[arg(long)]
    pub list_keys: bool,

    /// Enable debug logging
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

impl Cli {
    /// Parse arguments without exiting the process. Help and version
    /// requests come back as errors too; see [`is_informational`].
    pub fn parse_from_args<I, T>(args: I) -> std::result::Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Self::try_parse_from(args)
    }

    /// Build the effective configuration: file values first, then flags.
    pub fn into_config(self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };

        if let Some(keys) = self.keys {
            config.keys = keys;
        }
        if self.wait_for_signal {
            config.wait_for_signal = true;
        }
        if let Some(settle) = self.create_settle {
            config.create_settle = settle;
        }
        if let Some(settle) = self.destroy_settle {
            config.destroy_settle = settle;
        }
        if let Some(name) = self.device_name {
            config.device_name = name;
        }
        if self.verbose {
            config.verbose = true;
        }

        config.validate()?;
        Ok(config)
    }
}

/// Whether a clap error is a help/version request rather than bad usage.
pub fn is_informational(err: &clap::Error) -> bool {
    matches!(
        err.kind(),
        clap::error::ErrorKind::DisplayHelp
            | clap::error::ErrorKind::DisplayVersion
            | clap::error::ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
    )
}

impl From<clap::Error> for EmitKeyError {
    fn from(err: clap::Error) -> Self {
        EmitKeyError::usage(err.to_string())
    }
}
