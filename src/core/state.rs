//! Session and review state types for Plangate.
//!
//! One record per Claude Code session tracks which plan is under review,
//! how many rounds it has consumed, and the most recent score and feedback.
//! Records live in the session store and survive across hook invocations,
//! which each run as a separate short-lived process.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Inactivity window in seconds after which a session's review state is
/// considered stale and treated as absent.
pub const STALE_AFTER_SECONDS: i64 = 1800;

/// Identity of a plan under review.
///
/// Two identities are equal only when both the path and the fingerprint
/// match; a changed fingerprint under the same path is a new plan.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlanIdentity {
    /// Plan file path, present when the plan came from the plan directory.
    pub path: Option<PathBuf>,
    /// Content fingerprint: the first heading (or opening line) plus a short
    /// prefix hash. Stable across minor revisions, changes when the plan is
    /// fundamentally rewritten.
    pub fingerprint: String,
}

impl PlanIdentity {
    /// Create a plan identity.
    pub fn new(path: Option<PathBuf>, fingerprint: impl Into<String>) -> Self {
        Self {
            path,
            fingerprint: fingerprint.into(),
        }
    }

    /// Identity for a plan read from a file.
    pub fn from_file(path: impl Into<PathBuf>, fingerprint: impl Into<String>) -> Self {
        Self::new(Some(path.into()), fingerprint)
    }

    /// Identity for an inline plan (tool input or transcript).
    pub fn inline(fingerprint: impl Into<String>) -> Self {
        Self::new(None, fingerprint)
    }
}

/// Review lifecycle status for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    /// Plan under active review.
    #[default]
    Active,
    /// Plan met the threshold. Passing deletes the record, so this value
    /// is only ever observed in flight.
    Passed,
    /// Round budget exhausted; the user decides. Persisted so that
    /// re-presenting the same plan does not restart the review.
    Escalated,
}

impl ReviewStatus {
    /// Check if reviewing is over for the current plan.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ReviewStatus::Passed | ReviewStatus::Escalated)
    }
}

/// Per-session review state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionState {
    /// Unique session identifier (UUID v4 from Claude Code).
    pub session_id: String,
    /// Identity of the plan currently under review.
    pub plan_identity: Option<PlanIdentity>,
    /// Review rounds consumed by the current plan identity.
    pub round_count: u32,
    /// Total score from the most recent scored round.
    pub last_score: Option<u8>,
    /// Feedback text from the most recent round.
    pub last_feedback: Option<String>,
    /// When the record was last written.
    pub last_updated: DateTime<Utc>,
    /// Review lifecycle status.
    pub status: ReviewStatus,
}

impl SessionState {
    /// Create fresh state for a session. No plan yet, zero rounds.
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            plan_identity: None,
            round_count: 0,
            last_score: None,
            last_feedback: None,
            last_updated: Utc::now(),
            status: ReviewStatus::Active,
        }
    }

    /// Check whether the record was last written before the staleness
    /// window, measured against `now`.
    pub fn is_stale_at(&self, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(self.last_updated).num_seconds() > STALE_AFTER_SECONDS
    }

    /// Check whether the record is stale right now.
    pub fn is_stale(&self) -> bool {
        self.is_stale_at(Utc::now())
    }

    /// Advance the round counter for a presented plan.
    ///
    /// The same identity is a revision and increments the counter. A
    /// different path or fingerprint is a new plan: the count restarts at
    /// round 1 and prior score, feedback, and status are discarded.
    pub fn advance_round(&mut self, identity: PlanIdentity) {
        if self.plan_identity.as_ref() == Some(&identity) {
            self.round_count += 1;
        } else {
            self.round_count = 1;
            self.last_score = None;
            self.last_feedback = None;
            self.status = ReviewStatus::Active;
        }
        self.plan_identity = Some(identity);
        self.last_updated = Utc::now();
    }

    /// Record the outcome of a review round.
    ///
    /// `score` is absent for rounds that never produced one (stress
    /// rejections).
    pub fn record_feedback(&mut self, score: Option<u8>, feedback: impl Into<String>) {
        self.last_score = score;
        self.last_feedback = Some(feedback.into());
        self.last_updated = Utc::now();
    }

    /// Refresh the last_updated timestamp.
    pub fn touch(&mut self) {
        self.last_updated = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn identity(path: Option<&str>, fingerprint: &str) -> PlanIdentity {
        PlanIdentity::new(path.map(PathBuf::from), fingerprint)
    }

    #[test]
    fn test_session_state_new() {
        let state = SessionState::new("test-id");

        assert_eq!(state.session_id, "test-id");
        assert!(state.plan_identity.is_none());
        assert_eq!(state.round_count, 0);
        assert!(state.last_score.is_none());
        assert!(state.last_feedback.is_none());
        assert_eq!(state.status, ReviewStatus::Active);
    }

    #[test]
    fn test_advance_round_first_plan() {
        let mut state = SessionState::new("s1");
        state.advance_round(identity(Some("/p/plan.md"), "# Plan|abcd1234"));

        assert_eq!(state.round_count, 1);
        assert_eq!(
            state.plan_identity,
            Some(identity(Some("/p/plan.md"), "# Plan|abcd1234"))
        );
    }

    #[test]
    fn test_advance_round_same_identity_increments() {
        let mut state = SessionState::new("s1");
        let id = identity(Some("/p/plan.md"), "# Plan|abcd1234");

        state.advance_round(id.clone());
        state.advance_round(id.clone());
        state.advance_round(id);

        assert_eq!(state.round_count, 3);
    }

    #[test]
    fn test_advance_round_changed_fingerprint_resets() {
        let mut state = SessionState::new("s1");
        state.advance_round(identity(Some("/p/plan.md"), "# Plan|abcd1234"));
        state.record_feedback(Some(5), "needs work");
        state.advance_round(identity(Some("/p/plan.md"), "# Plan|ffff0000"));

        // Same path, rewritten content: a new plan
        assert_eq!(state.round_count, 1);
        assert!(state.last_score.is_none());
        assert!(state.last_feedback.is_none());
    }

    #[test]
    fn test_advance_round_changed_path_resets() {
        let mut state = SessionState::new("s1");
        state.advance_round(identity(Some("/p/plan.md"), "# Plan|abcd1234"));
        state.advance_round(identity(Some("/p/other.md"), "# Plan|abcd1234"));

        assert_eq!(state.round_count, 1);
    }

    #[test]
    fn test_advance_round_inline_then_file_resets() {
        let mut state = SessionState::new("s1");
        state.advance_round(identity(None, "# Plan|abcd1234"));
        assert_eq!(state.round_count, 1);

        state.advance_round(identity(None, "# Plan|abcd1234"));
        assert_eq!(state.round_count, 2);

        // The same fingerprint arriving with a path is a different identity
        state.advance_round(identity(Some("/p/plan.md"), "# Plan|abcd1234"));
        assert_eq!(state.round_count, 1);
    }

    #[test]
    fn test_advance_round_reset_clears_terminal_status() {
        let mut state = SessionState::new("s1");
        state.advance_round(identity(None, "# Old|11111111"));
        state.status = ReviewStatus::Escalated;

        state.advance_round(identity(None, "# New|22222222"));

        assert_eq!(state.status, ReviewStatus::Active);
        assert_eq!(state.round_count, 1);
    }

    #[test]
    fn test_record_feedback() {
        let mut state = SessionState::new("s1");
        state.record_feedback(Some(6), "tighten step 3");

        assert_eq!(state.last_score, Some(6));
        assert_eq!(state.last_feedback.as_deref(), Some("tighten step 3"));
    }

    #[test]
    fn test_record_feedback_without_score() {
        let mut state = SessionState::new("s1");
        state.record_feedback(None, "stress-test prompt");

        assert!(state.last_score.is_none());
        assert_eq!(state.last_feedback.as_deref(), Some("stress-test prompt"));
    }

    #[test]
    fn test_is_stale_at_boundary() {
        let state = SessionState::new("s1");
        let written = state.last_updated;

        // Inside the window
        assert!(!state.is_stale_at(written + Duration::seconds(STALE_AFTER_SECONDS - 1)));
        // Exactly at the window: not yet stale (strictly greater)
        assert!(!state.is_stale_at(written + Duration::seconds(STALE_AFTER_SECONDS)));
        // Past the window
        assert!(state.is_stale_at(written + Duration::seconds(STALE_AFTER_SECONDS + 1)));
    }

    #[test]
    fn test_is_stale_after_thirty_one_minutes() {
        let state = SessionState::new("s1");
        let later = state.last_updated + Duration::minutes(31);
        assert!(state.is_stale_at(later));
    }

    #[test]
    fn test_touch_refreshes_timestamp() {
        let mut state = SessionState::new("s1");
        let old = state.last_updated;

        std::thread::sleep(std::time::Duration::from_millis(10));
        state.touch();

        assert!(state.last_updated > old);
    }

    #[test]
    fn test_review_status_is_terminal() {
        assert!(!ReviewStatus::Active.is_terminal());
        assert!(ReviewStatus::Passed.is_terminal());
        assert!(ReviewStatus::Escalated.is_terminal());
    }

    #[test]
    fn test_review_status_serialization() {
        let statuses = vec![
            ReviewStatus::Active,
            ReviewStatus::Passed,
            ReviewStatus::Escalated,
        ];

        for status in statuses {
            let json = serde_json::to_string(&status).unwrap();
            let deserialized: ReviewStatus = serde_json::from_str(&json).unwrap();
            assert_eq!(status, deserialized);
        }

        // Wire format is snake_case
        assert_eq!(
            serde_json::to_string(&ReviewStatus::Escalated).unwrap(),
            "\"escalated\""
        );
    }

    #[test]
    fn test_session_state_serialization() {
        let mut state = SessionState::new("round-trip");
        state.advance_round(identity(Some("/p/plan.md"), "# Plan|abcd1234"));
        state.record_feedback(Some(8), "solid");

        let json = serde_json::to_string_pretty(&state).unwrap();
        let deserialized: SessionState = serde_json::from_str(&json).unwrap();

        assert_eq!(state, deserialized);
    }

    #[test]
    fn test_inline_identity_serialization() {
        let state = SessionState {
            plan_identity: Some(identity(None, "Refactor storage|9f8e7d6c")),
            ..SessionState::new("inline")
        };

        let json = serde_json::to_string(&state).unwrap();
        let deserialized: SessionState = serde_json::from_str(&json).unwrap();

        assert_eq!(state, deserialized);
    }
}
