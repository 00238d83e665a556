//! Unified error types for plangate with fail-open philosophy.
//!
//! All errors follow the fail-open principle: infrastructure errors must
//! never strand the agent. When errors occur, we log warnings and return
//! safe defaults rather than propagating failures that would block work
//! the gate was never asked to judge.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for plangate operations.
#[derive(Error, Debug)]
pub enum PlangateError {
    /// I/O errors from session file operations.
    #[error("storage error at {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// JSON or TOML parsing/serialization errors.
    #[error("serialization error: {message}")]
    Serde { message: String },

    /// Review state machine violations (invalid transitions).
    #[error("invalid state: {message}")]
    InvalidState { message: String },

    /// Session not found in storage.
    #[error("session not found: {session_id}")]
    SessionNotFound { session_id: String },

    /// Configuration loading errors.
    #[error("config error: {message}")]
    Config { message: String },
}

/// A specialized Result type for plangate operations.
pub type Result<T> = std::result::Result<T, PlangateError>;

impl PlangateError {
    /// Create a storage error from an I/O error.
    pub fn storage(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }

    /// Create a serialization error.
    pub fn serde(message: impl Into<String>) -> Self {
        Self::Serde {
            message: message.into(),
        }
    }

    /// Create an invalid state error.
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    /// Create a session not found error.
    pub fn session_not_found(session_id: impl Into<String>) -> Self {
        Self::SessionNotFound {
            session_id: session_id.into(),
        }
    }

    /// Create a config error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Check if this error should trigger fail-open behavior.
    ///
    /// All plangate errors are infrastructure errors that should not
    /// block the agent. This method returns true for all error types.
    pub fn is_fail_open(&self) -> bool {
        true
    }
}

impl From<io::Error> for PlangateError {
    fn from(err: io::Error) -> Self {
        Self::Storage {
            path: PathBuf::new(),
            source: err,
        }
    }
}

impl From<serde_json::Error> for PlangateError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serde {
            message: err.to_string(),
        }
    }
}

/// Trait for fail-open error handling.
///
/// Provides methods for handling errors according to plangate's
/// fail-open philosophy: log the error and return a safe default.
pub trait FailOpen<T> {
    /// Handle an error by logging a warning and returning the default value.
    fn fail_open_default(self, context: &str) -> T
    where
        T: Default;

    /// Handle an error by logging a warning and returning the provided fallback.
    fn fail_open_with(self, context: &str, fallback: T) -> T;
}

impl<T> FailOpen<T> for Result<T> {
    fn fail_open_default(self, context: &str) -> T
    where
        T: Default,
    {
        match self {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!("{}: {} (fail-open: using default)", context, err);
                T::default()
            }
        }
    }

    fn fail_open_with(self, context: &str, fallback: T) -> T {
        match self {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!("{}: {} (fail-open: using fallback)", context, err);
                fallback
            }
        }
    }
}

/// Exit codes for the plangate CLI.
///
/// These exit codes are used by hook handlers to communicate decisions
/// to Claude Code.
pub mod exit_codes {
    /// Exit code indicating approval (allow the action to proceed).
    pub const APPROVE: i32 = 0;

    /// Exit code for ordinary command failures.
    pub const ERROR: i32 = 1;

    /// Exit code indicating block (plan must be revised).
    pub const BLOCK: i32 = 2;

    /// Exit code indicating crash (fail-open, treated as approve).
    pub const CRASH: i32 = 3;
}
