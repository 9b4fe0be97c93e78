//! Custom error types for emit-key.
//!
//! Every error in this module is fatal for the process: it is printed to
//! standard error and the process exits with status 1. Termination
//! requests are not errors and live in [`crate::trigger`].

use thiserror::Error;

/// Main error type for emit-key operations.
#[derive(Error, Debug)]
pub enum EmitKeyError {
    /// The key name is not in the catalog.
    #[error("unknown key '{0}'")]
    UnknownKey(String),

    /// The sequence specification contained no key tokens.
    #[error("key sequence '{0}' contains no keys")]
    EmptySequence(String),

    /// The virtual input device backend failed.
    #[error("input device error while trying to {action}: {reason}")]
    Backend { action: String, reason: String },

    /// Bad command line usage.
    #[error("{0}")]
    Usage(String),

    /// Configuration validation error.
    #[error("configuration error: {0}")]
    ConfigValidation(String),

    /// Error reading or parsing a configuration file.
    #[error("failed to load config from '{path}': {reason}")]
    ConfigLoad { path: String, reason: String },

    /// Error parsing a duration string.
    #[error("invalid duration '{value}': {reason}")]
    InvalidDuration { value: String, reason: String },

    /// The trigger source could not be installed or went away.
    #[error("trigger source error: {0}")]
    TriggerSource(String),
}

/// Result type alias for emit-key operations.
pub type Result<T> = std::result::Result<T, EmitKeyError>;

impl EmitKeyError {
    /// Create a new UnknownKey error.
    pub fn unknown_key(name: impl Into<String>) -> Self {
        Self::UnknownKey(name.into())
    }

    /// Create a new EmptySequence error.
    pub fn empty_sequence(spec: impl Into<String>) -> Self {
        Self::EmptySequence(spec.into())
    }

    /// Create a new Backend error.
    pub fn backend(action: impl Into<String>, reason: impl ToString) -> Self {
        Self::Backend {
            action: action.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a new Usage error.
    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage(message.into())
    }

    /// Create a new ConfigValidation error.
    pub fn config_validation(message: impl Into<String>) -> Self {
        Self::ConfigValidation(message.into())
    }

    /// Create a new ConfigLoad error.
    pub fn config_load(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConfigLoad {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a new InvalidDuration error.
    pub fn invalid_duration(value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidDuration {
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create a new TriggerSource error.
    pub fn trigger_source(message: impl Into<String>) -> Self {
        Self::TriggerSource(message.into())
    }

    /// Process exit status reported for this error.
    ///
    /// All errors share status 1; 130 and 143 are reserved for
    /// termination requests.
    pub fn exit_code(&self) -> u8 {
        1
    }
}
