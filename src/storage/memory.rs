//! In-memory session storage for testing.
//!
//! Thread-safe implementation of the `SessionStore` trait backed by
//! `RwLock<HashMap>` maps, used by hook runner and CLI tests so they
//! never touch the real sessions directory. Honors the same `get`
//! contract as the file store: stale records read as absent.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use chrono::{DateTime, Utc};

use crate::core::SessionState;
use crate::error::Result;
use crate::storage::traits::{SessionStore, RECENT_EVAL_TTL_SECONDS};

/// In-memory session store for testing.
///
/// Sessions and markers live in memory and are lost when the store is
/// dropped.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, SessionState>>,
    plan_markers: RwLock<HashMap<String, PathBuf>>,
    recent_evals: RwLock<HashMap<String, (String, DateTime<Utc>)>>,
}

impl MemorySessionStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored session records.
    pub fn len(&self) -> usize {
        self.sessions.read().unwrap().len()
    }

    /// Check if the store holds no session records.
    pub fn is_empty(&self) -> bool {
        self.sessions.read().unwrap().is_empty()
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, session_id: &str) -> Result<Option<SessionState>> {
        let sessions = self.sessions.read().unwrap();
        Ok(sessions
            .get(session_id)
            .filter(|state| !state.is_stale())
            .cloned())
    }

    fn put(&self, state: &SessionState) -> Result<()> {
        let mut sessions = self.sessions.write().unwrap();
        sessions.insert(state.session_id.clone(), state.clone());
        Ok(())
    }

    fn delete(&self, session_id: &str) -> Result<()> {
        self.sessions.write().unwrap().remove(session_id);
        self.plan_markers.write().unwrap().remove(session_id);
        Ok(())
    }

    fn list(&self) -> Result<Vec<SessionState>> {
        let sessions = self.sessions.read().unwrap();
        let mut records: Vec<SessionState> = sessions.values().cloned().collect();
        records.sort_by(|a, b| b.last_updated.cmp(&a.last_updated));
        Ok(records)
    }

    fn clear_all(&self) -> Result<usize> {
        let mut sessions = self.sessions.write().unwrap();
        let removed = sessions.len();
        sessions.clear();
        self.plan_markers.write().unwrap().clear();
        self.recent_evals.write().unwrap().clear();
        Ok(removed)
    }

    fn record_plan_marker(&self, session_id: &str, path: &Path) -> Result<()> {
        self.plan_markers
            .write()
            .unwrap()
            .insert(session_id.to_string(), path.to_path_buf());
        Ok(())
    }

    fn plan_marker(&self, session_id: &str) -> Result<Option<PathBuf>> {
        Ok(self.plan_markers.read().unwrap().get(session_id).cloned())
    }

    fn mark_evaluated(&self, session_id: &str, content_hash: &str) -> Result<()> {
        self.recent_evals
            .write()
            .unwrap()
            .insert(session_id.to_string(), (content_hash.to_string(), Utc::now()));
        Ok(())
    }

    fn recently_evaluated(&self, session_id: &str, content_hash: &str) -> Result<bool> {
        let recent = self.recent_evals.read().unwrap();
        let Some((hash, evaluated_at)) = recent.get(session_id) else {
            return Ok(false);
        };
        if hash != content_hash {
            return Ok(false);
        }
        let age = Utc::now().signed_duration_since(*evaluated_at).num_seconds();
        Ok((0..RECENT_EVAL_TTL_SECONDS).contains(&age))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::PlanIdentity;
    use chrono::Duration;
    use std::sync::Arc;

    fn reviewed_state(session_id: &str) -> SessionState {
        let mut state = SessionState::new(session_id);
        state.advance_round(PlanIdentity::inline("# Plan|aaaa1111"));
        state.record_feedback(Some(6), "cover the migration path");
        state
    }

    #[test]
    fn test_conformance_crud() {
        let store = MemorySessionStore::new();
        crate::storage::traits::tests::test_session_store_crud(&store);
    }

    #[test]
    fn test_conformance_markers() {
        let store = MemorySessionStore::new();
        crate::storage::traits::tests::test_session_store_markers(&store);
    }

    #[test]
    fn test_len_and_is_empty() {
        let store = MemorySessionStore::new();
        assert!(store.is_empty());

        store.put(&reviewed_state("s-1")).unwrap();
        store.put(&reviewed_state("s-2")).unwrap();
        assert_eq!(store.len(), 2);
        assert!(!store.is_empty());
    }

    #[test]
    fn test_get_stale_record_reads_as_absent() {
        let store = MemorySessionStore::new();
        let mut state = reviewed_state("s-1");
        state.last_updated = Utc::now() - Duration::minutes(31);
        store.put(&state).unwrap();

        assert!(store.get("s-1").unwrap().is_none());
        // Still held, and still listed
        assert_eq!(store.len(), 1);
        assert_eq!(store.list().unwrap().len(), 1);
    }

    #[test]
    fn test_list_sorted_most_recent_first() {
        let store = MemorySessionStore::new();
        let mut older = reviewed_state("older");
        older.last_updated = Utc::now() - Duration::minutes(5);
        store.put(&older).unwrap();
        store.put(&reviewed_state("newer")).unwrap();

        let listed = store.list().unwrap();
        assert_eq!(listed[0].session_id, "newer");
        assert_eq!(listed[1].session_id, "older");
    }

    #[test]
    fn test_clear_all_counts_sessions() {
        let store = MemorySessionStore::new();
        store.put(&reviewed_state("s-1")).unwrap();
        store.put(&reviewed_state("s-2")).unwrap();
        store.mark_evaluated("s-1", "cafe0123").unwrap();

        assert_eq!(store.clear_all().unwrap(), 2);
        assert!(store.is_empty());
        assert!(!store.recently_evaluated("s-1", "cafe0123").unwrap());
    }

    #[test]
    fn test_thread_safety() {
        let store = Arc::new(MemorySessionStore::new());
        let mut handles = Vec::new();

        for i in 0..10 {
            let store = Arc::clone(&store);
            handles.push(std::thread::spawn(move || {
                let state = reviewed_state(&format!("s-{i}"));
                store.put(&state).unwrap();
                assert!(store.get(&format!("s-{i}")).unwrap().is_some());
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.len(), 10);
    }

    #[test]
    fn test_arc_wrapped_store_implements_trait() {
        let store: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new());
        store.put(&reviewed_state("s-1")).unwrap();
        assert!(store.exists("s-1").unwrap());
        store.delete("s-1").unwrap();
        assert!(!store.exists("s-1").unwrap());
    }
}
