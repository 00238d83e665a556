//! Sessions command for Plangate.
//!
//! Lists stored review sessions with their round progress and status,
//! useful for seeing what the gate is tracking and for finding session
//! IDs to pass to `plangate clear`.

use serde::{Deserialize, Serialize};

use crate::core::SessionState;
use crate::error::Result;
use crate::storage::SessionStore;

/// Options for the sessions command.
#[derive(Debug, Clone, Default)]
pub struct SessionsOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
    /// Maximum number of sessions to show.
    pub limit: usize,
}

/// Summary of a single session for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    /// Session ID.
    pub id: String,
    /// Review status.
    pub status: String,
    /// Rounds consumed by the current plan.
    pub round: u32,
    /// Most recent total score.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<u8>,
    /// Plan under review: the file path, or "(inline)" for plans taken
    /// from tool input or the transcript.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<String>,
    /// Last updated timestamp (ISO 8601).
    pub updated_at: String,
}

impl From<&SessionState> for SessionSummary {
    fn from(session: &SessionState) -> Self {
        let plan = session.plan_identity.as_ref().map(|identity| {
            identity
                .path
                .as_ref()
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "(inline)".to_string())
        });
        Self {
            id: session.session_id.clone(),
            status: format!("{:?}", session.status),
            round: session.round_count,
            score: session.last_score,
            plan,
            updated_at: session.last_updated.to_rfc3339(),
        }
    }
}

/// Output format for the sessions command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionsOutput {
    /// Whether the command was successful.
    pub success: bool,
    /// List of session summaries.
    pub sessions: Vec<SessionSummary>,
    /// Total count of sessions returned.
    pub count: usize,
    /// Error message if command failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SessionsOutput {
    /// Create a successful output.
    pub fn success(sessions: Vec<SessionSummary>) -> Self {
        let count = sessions.len();
        Self {
            success: true,
            sessions,
            count,
            error: None,
        }
    }

    /// Create a failed output.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            sessions: vec![],
            count: 0,
            error: Some(error.into()),
        }
    }

    /// Format as human-readable text.
    pub fn format_text(&self) -> String {
        if !self.success {
            return format!(
                "Sessions failed: {}",
                self.error.as_deref().unwrap_or("unknown error")
            );
        }

        if self.sessions.is_empty() {
            return "No review sessions found.".to_string();
        }

        let mut lines = vec![format!("Review sessions ({} found):", self.count)];
        lines.push(String::new());

        // Header
        lines.push(format!(
            "{:<36}  {:<10}  {:<5}  {:<5}  {:<20}  {}",
            "ID", "STATUS", "ROUND", "SCORE", "UPDATED", "PLAN"
        ));
        lines.push("-".repeat(100));

        for session in &self.sessions {
            let score = session
                .score
                .map(|s| s.to_string())
                .unwrap_or_else(|| "-".to_string());
            let plan = session.plan.as_deref().unwrap_or("-");
            // Truncate timestamp to date and time (YYYY-MM-DDTHH:MM:SS)
            let updated: String = session.updated_at.chars().take(19).collect();
            lines.push(format!(
                "{:<36}  {:<10}  {:<5}  {:<5}  {:<20}  {}",
                session.id, session.status, session.round, score, updated, plan
            ));
        }

        lines.join("\n")
    }
}

/// The sessions command implementation.
pub struct SessionsCommand<S: SessionStore> {
    store: S,
}

impl<S: SessionStore> SessionsCommand<S> {
    /// Create a new sessions command.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Run the sessions command.
    pub fn run(&self, options: &SessionsOptions) -> SessionsOutput {
        match self.list_sessions(options.limit) {
            Ok(sessions) => {
                let summaries: Vec<SessionSummary> =
                    sessions.iter().map(SessionSummary::from).collect();
                SessionsOutput::success(summaries)
            }
            Err(e) => SessionsOutput::failure(format!("Failed to list sessions: {}", e)),
        }
    }

    /// List sessions from the store, newest first.
    fn list_sessions(&self, limit: usize) -> Result<Vec<SessionState>> {
        let mut sessions = self.store.list()?;
        sessions.truncate(limit);
        Ok(sessions)
    }
}
