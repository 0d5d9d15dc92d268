use std::io;
use std::process::ExitStatus;

use thiserror::Error;

/// Rejected user input, reported before any network activity.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("invalid port '{value}': {reason}")]
    InvalidPort { value: String, reason: &'static str },

    #[error("invalid timeout duration '{value}': {reason}")]
    InvalidTimeout { value: String, reason: String },
}

impl ValidationError {
    /// Extra line telling the user which formats are accepted.
    pub fn guidance(&self) -> Option<&'static str> {
        match self {
            ValidationError::InvalidPort { .. } => None,
            ValidationError::InvalidTimeout { .. } => {
                Some("Use format like: 30s, 5m, 1h, 90m, or just a number for seconds (e.g., 30)")
            }
        }
    }
}

/// Failure of the optional client launch after a successful wait.
///
/// These never change the exit status: the host was reachable.
#[derive(Error, Debug)]
pub enum HandoffError {
    #[error("error getting current user: {0}")]
    Identity(String),

    #[error("error creating RDP file: {0}")]
    Descriptor(#[source] io::Error),

    #[error("error launching {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("{program} exited with {status}")]
    Exited { program: String, status: ExitStatus },
}

#[derive(Error, Debug)]
pub enum WaitupError {
    #[error("{0}")]
    Usage(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

pub type Result<T> = std::result::Result<T, WaitupError>;
