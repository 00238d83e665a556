//! Clear command for Plangate.
//!
//! Deletes stored review state, either for one session or for all of
//! them. Clearing a session restarts its review from round one.

use serde::{Deserialize, Serialize};

use crate::storage::SessionStore;

/// Options for the clear command.
#[derive(Debug, Clone, Default)]
pub struct ClearOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
    /// Clear all sessions.
    pub all: bool,
}

/// Output format for the clear command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClearOutput {
    /// Whether the command was successful.
    pub success: bool,
    /// Number of sessions cleared.
    pub cleared: usize,
    /// IDs of the cleared sessions, when known.
    pub cleared_ids: Vec<String>,
    /// Error message if command failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ClearOutput {
    /// Create a successful output.
    pub fn success(cleared: usize, cleared_ids: Vec<String>) -> Self {
        Self {
            success: true,
            cleared,
            cleared_ids,
            error: None,
        }
    }

    /// Create a failed output.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            cleared: 0,
            cleared_ids: Vec::new(),
            error: Some(error.into()),
        }
    }
}

/// The clear command implementation.
pub struct ClearCommand<S: SessionStore> {
    store: S,
}

impl<S: SessionStore> ClearCommand<S> {
    /// Create a new clear command.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Run the clear command.
    pub fn run(&self, session_id: Option<&str>, options: &ClearOptions) -> ClearOutput {
        match (session_id, options.all) {
            (Some(id), _) => self.clear_one(id),
            (None, true) => self.clear_all(),
            (None, false) => {
                ClearOutput::failure("Specify a session ID or use --all to clear everything")
            }
        }
    }

    /// Clear a single session by ID.
    ///
    /// Stale records are still listed and still clearable; only a
    /// session with no record at all is reported as unknown.
    fn clear_one(&self, session_id: &str) -> ClearOutput {
        let known = match self.store.list() {
            Ok(sessions) => sessions.iter().any(|s| s.session_id == session_id),
            Err(e) => return ClearOutput::failure(format!("Failed to list sessions: {}", e)),
        };
        if !known {
            return ClearOutput::failure(format!("Session '{}' not found", session_id));
        }

        match self.store.delete(session_id) {
            Ok(()) => ClearOutput::success(1, vec![session_id.to_string()]),
            Err(e) => ClearOutput::failure(format!("Failed to clear session: {}", e)),
        }
    }

    /// Clear all sessions and their markers.
    fn clear_all(&self) -> ClearOutput {
        match self.store.clear_all() {
            Ok(cleared) => ClearOutput::success(cleared, Vec::new()),
            Err(e) => ClearOutput::failure(format!("Failed to clear sessions: {}", e)),
        }
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &ClearOutput, options: &ClearOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string())
        } else if !output.success {
            format!(
                "Clear failed: {}",
                output.error.as_deref().unwrap_or("unknown error")
            )
        } else if output.cleared == 0 {
            "No review sessions to clear.".to_string()
        } else if output.cleared_ids.is_empty() {
            format!("Cleared {} review session(s).", output.cleared)
        } else {
            format!("Cleared session {}.", output.cleared_ids.join(", "))
        }
    }
}
