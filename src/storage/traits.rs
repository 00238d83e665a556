//! Session storage traits for Plangate.
//!
//! The `SessionStore` trait covers everything a hook invocation needs
//! to persist between processes: the per-session review record plus two
//! small per-session markers (the plan-file marker written by
//! PostToolUse and the recent-evaluation marker that keeps the Stop
//! hook from re-reviewing a just-scored plan).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::core::SessionState;
use crate::error::Result;

/// How long a recent-evaluation marker suppresses a repeat review of
/// the same content, in seconds.
pub const RECENT_EVAL_TTL_SECONDS: i64 = 60;

/// Trait for session storage backends.
///
/// Each hook invocation is a separate short-lived process, so the store
/// is the only channel review state travels through. Staleness is part
/// of the `get` contract: a record whose `last_updated` is older than
/// the staleness window is reported as absent (without deleting it), so
/// callers always see either live state or nothing.
pub trait SessionStore: Send + Sync {
    /// Retrieve live review state for a session.
    ///
    /// Returns `Ok(None)` when no record exists, when the record is
    /// stale, or when it cannot be read or parsed. Corruption restarts
    /// the session's review rather than failing the hook.
    fn get(&self, session_id: &str) -> Result<Option<SessionState>>;

    /// Save review state, creating or replacing the session's record.
    fn put(&self, state: &SessionState) -> Result<()>;

    /// Delete a session's record and plan-file marker.
    ///
    /// Returns `Ok(())` even if nothing existed. The recent-evaluation
    /// marker survives so the Stop hook does not re-review a plan whose
    /// record was just cleared by a pass.
    fn delete(&self, session_id: &str) -> Result<()>;

    /// List all stored records, most recently written first.
    ///
    /// Diagnostic view: stale records are included, unlike `get`.
    fn list(&self) -> Result<Vec<SessionState>>;

    /// Delete every record and marker. Returns the number of session
    /// records removed.
    fn clear_all(&self) -> Result<usize>;

    /// Record the plan file most recently written in this session.
    fn record_plan_marker(&self, session_id: &str, path: &Path) -> Result<()>;

    /// Path of the session's most recently written plan file, if any.
    fn plan_marker(&self, session_id: &str) -> Result<Option<PathBuf>>;

    /// Record that this content was just scored for this session.
    fn mark_evaluated(&self, session_id: &str, content_hash: &str) -> Result<()>;

    /// Check if the same content was scored for this session within the
    /// last [`RECENT_EVAL_TTL_SECONDS`].
    fn recently_evaluated(&self, session_id: &str, content_hash: &str) -> Result<bool>;

    /// Check if live review state exists for a session.
    fn exists(&self, session_id: &str) -> Result<bool> {
        Ok(self.get(session_id)?.is_some())
    }
}

/// Blanket implementation of SessionStore for Arc-wrapped stores so
/// handlers and tests can share one store.
impl<T: SessionStore + ?Sized> SessionStore for Arc<T> {
    fn get(&self, session_id: &str) -> Result<Option<SessionState>> {
        (**self).get(session_id)
    }

    fn put(&self, state: &SessionState) -> Result<()> {
        (**self).put(state)
    }

    fn delete(&self, session_id: &str) -> Result<()> {
        (**self).delete(session_id)
    }

    fn list(&self) -> Result<Vec<SessionState>> {
        (**self).list()
    }

    fn clear_all(&self) -> Result<usize> {
        (**self).clear_all()
    }

    fn record_plan_marker(&self, session_id: &str, path: &Path) -> Result<()> {
        (**self).record_plan_marker(session_id, path)
    }

    fn plan_marker(&self, session_id: &str) -> Result<Option<PathBuf>> {
        (**self).plan_marker(session_id)
    }

    fn mark_evaluated(&self, session_id: &str, content_hash: &str) -> Result<()> {
        (**self).mark_evaluated(session_id, content_hash)
    }

    fn recently_evaluated(&self, session_id: &str, content_hash: &str) -> Result<bool> {
        (**self).recently_evaluated(session_id, content_hash)
    }
}

/// Conformance checks shared by SessionStore implementations.
#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::core::PlanIdentity;

    /// Verify the basic record lifecycle against a store.
    pub fn test_session_store_crud<S: SessionStore>(store: &S) {
        let mut state = SessionState::new("conformance-1");
        state.advance_round(PlanIdentity::inline("# Plan|aaaa1111"));
        state.record_feedback(Some(5), "needs work");

        // Initially absent
        assert!(!store.exists("conformance-1").unwrap());
        assert!(store.get("conformance-1").unwrap().is_none());

        // Put then get round-trips
        store.put(&state).unwrap();
        assert!(store.exists("conformance-1").unwrap());
        let loaded = store.get("conformance-1").unwrap().unwrap();
        assert_eq!(loaded.round_count, 1);
        assert_eq!(loaded.last_score, Some(5));
        assert_eq!(loaded.plan_identity, state.plan_identity);

        // List includes it
        let listed = store.list().unwrap();
        assert!(listed.iter().any(|s| s.session_id == "conformance-1"));

        // Delete is idempotent
        store.delete("conformance-1").unwrap();
        assert!(!store.exists("conformance-1").unwrap());
        store.delete("conformance-1").unwrap();
    }

    /// Verify marker behavior against a store.
    pub fn test_session_store_markers<S: SessionStore>(store: &S) {
        let plan = Path::new("/p/.claude/plans/plan.md");

        // No markers yet
        assert!(store.plan_marker("conformance-2").unwrap().is_none());
        assert!(!store.recently_evaluated("conformance-2", "cafe0123").unwrap());

        // Plan marker round-trips per session
        store.record_plan_marker("conformance-2", plan).unwrap();
        assert_eq!(
            store.plan_marker("conformance-2").unwrap().as_deref(),
            Some(plan)
        );
        assert!(store.plan_marker("conformance-other").unwrap().is_none());

        // Recent-evaluation marker matches on content
        store.mark_evaluated("conformance-2", "cafe0123").unwrap();
        assert!(store.recently_evaluated("conformance-2", "cafe0123").unwrap());
        assert!(!store.recently_evaluated("conformance-2", "beef4567").unwrap());
        assert!(!store.recently_evaluated("conformance-other", "cafe0123").unwrap());

        // Deleting the session drops the plan marker but keeps the
        // recent-evaluation marker
        store.delete("conformance-2").unwrap();
        assert!(store.plan_marker("conformance-2").unwrap().is_none());
        assert!(store.recently_evaluated("conformance-2", "cafe0123").unwrap());
    }
}
