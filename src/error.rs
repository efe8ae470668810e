//! Crate-level error type.

use thiserror::Error;

use crate::config::loader::ConfigError;

/// Errors that stop or restart the monitoring loop.
#[derive(Debug, Error)]
pub enum GuardError {
    /// A programming-level invariant was violated: overlapping episodes,
    /// an adapter outcome for an unknown intent, or a switch stuck past
    /// its timeout.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// The monitor actor has stopped and no longer accepts requests.
    #[error("Monitor is not running")]
    MonitorStopped,

    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Socket or file error during startup.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl GuardError {
    pub fn invalid_state(message: impl Into<String>) -> Self {
        GuardError::InvalidState(message.into())
    }

    pub fn is_invalid_state(&self) -> bool {
        matches!(self, GuardError::InvalidState(_))
    }
}

/// Result type for monitoring operations.
pub type GuardResult<T> = Result<T, GuardError>;
