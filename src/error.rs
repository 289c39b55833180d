use thiserror::Error;

use crate::domain::Phase;

/// Unified error type for git-release operations
#[derive(Error, Debug)]
pub enum ReleaseError {
    /// Unknown template placeholder, unknown branch/channel, malformed step declaration
    #[error("Configuration error: {0}")]
    Config(String),

    /// The computed version does not exceed the prior version on its channel
    #[error("Version consistency error: {computed} does not exceed {prior} on channel '{channel}'")]
    VersionConsistency {
        computed: String,
        prior: String,
        channel: String,
    },

    #[error("Step '{step}' failed during {phase}: {reason}")]
    StepExecution {
        step: String,
        phase: Phase,
        reason: String,
    },

    #[error("Run cancelled: {0}")]
    Cancelled(String),

    #[error("Release lock held: {0}")]
    Locked(String),

    #[error("Git operation failed: {0}")]
    Git(#[from] git2::Error),

    #[error("Remote operation failed: {0}")]
    Remote(String),

    #[error("Version parsing error: {0}")]
    Version(String),

    #[error("Command failed: {0}")]
    Command(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for Results in git-release
pub type Result<T> = std::result::Result<T, ReleaseError>;

impl ReleaseError {
    /// Create a configuration error with context
    pub fn config(msg: impl Into<String>) -> Self {
        ReleaseError::Config(msg.into())
    }

    /// Create a version error with context
    pub fn version(msg: impl Into<String>) -> Self {
        ReleaseError::Version(msg.into())
    }

    /// Create a remote error with context
    pub fn remote(msg: impl Into<String>) -> Self {
        ReleaseError::Remote(msg.into())
    }

    /// Create a command error with context
    pub fn command(msg: impl Into<String>) -> Self {
        ReleaseError::Command(msg.into())
    }

    pub fn step(step: impl Into<String>, phase: Phase, reason: impl Into<String>) -> Self {
        ReleaseError::StepExecution {
            step: step.into(),
            phase,
            reason: reason.into(),
        }
    }

    /// True for errors that are raised before any side effect happens.
    pub fn is_pre_flight(&self) -> bool {
        matches!(
            self,
            ReleaseError::Config(_) | ReleaseError::VersionConsistency { .. }
        )
    }
}

impl From<toml::de::Error> for ReleaseError {
    fn from(err: toml::de::Error) -> Self {
        ReleaseError::Config(format!("malformed configuration: {}", err))
    }
}
