//! File-based session storage.
//!
//! One JSON file per session under the Plangate sessions directory,
//! written atomically (hidden temp file, fsync, rename) so a hook
//! process killed mid-write never leaves a torn record. Markers live
//! beside the record as `{id}.plan` and `{id}.recent` files; `list`
//! only picks up `.json` records, so markers never show up as sessions.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config;
use crate::core::SessionState;
use crate::error::{PlangateError, Result};
use crate::storage::traits::{SessionStore, RECENT_EVAL_TTL_SECONDS};

/// Plan-file marker contents.
#[derive(Debug, Serialize, Deserialize)]
struct PlanMarker {
    plan_file_path: PathBuf,
    recorded_at: DateTime<Utc>,
}

/// Recent-evaluation marker contents.
#[derive(Debug, Serialize, Deserialize)]
struct RecentEvaluation {
    content_hash: String,
    evaluated_at: DateTime<Utc>,
}

/// File-based session store.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    sessions_dir: PathBuf,
}

impl FileSessionStore {
    /// Create a store rooted at the default Plangate sessions directory.
    pub fn new() -> Result<Self> {
        let sessions_dir = config::sessions_dir().ok_or_else(|| {
            PlangateError::config("Could not determine sessions directory (no home directory)")
        })?;
        Self::with_dir(sessions_dir)
    }

    /// Create a store rooted at a specific directory, creating it if needed.
    pub fn with_dir(sessions_dir: impl Into<PathBuf>) -> Result<Self> {
        let sessions_dir = sessions_dir.into();
        fs::create_dir_all(&sessions_dir)
            .map_err(|e| PlangateError::storage(&sessions_dir, e))?;
        Ok(Self { sessions_dir })
    }

    /// Directory holding the session records.
    pub fn sessions_dir(&self) -> &Path {
        &self.sessions_dir
    }

    /// Session ids come from hook stdin, so only a conservative
    /// character set may reach the filesystem.
    fn safe_id(session_id: &str) -> String {
        let safe: String = session_id
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        if safe.is_empty() {
            "unknown".to_string()
        } else {
            safe
        }
    }

    fn session_path(&self, session_id: &str) -> PathBuf {
        self.sessions_dir
            .join(format!("{}.json", Self::safe_id(session_id)))
    }

    fn temp_path(&self, session_id: &str) -> PathBuf {
        self.sessions_dir
            .join(format!(".{}.json.tmp", Self::safe_id(session_id)))
    }

    fn plan_marker_path(&self, session_id: &str) -> PathBuf {
        self.sessions_dir
            .join(format!("{}.plan", Self::safe_id(session_id)))
    }

    fn recent_marker_path(&self, session_id: &str) -> PathBuf {
        self.sessions_dir
            .join(format!("{}.recent", Self::safe_id(session_id)))
    }

    /// Write then rename so readers only ever see complete records.
    fn atomic_write(&self, session_id: &str, state: &SessionState) -> Result<()> {
        let json = serde_json::to_string_pretty(state)?;
        let temp = self.temp_path(session_id);
        let target = self.session_path(session_id);

        let mut file = File::create(&temp).map_err(|e| PlangateError::storage(&temp, e))?;
        file.write_all(json.as_bytes())
            .map_err(|e| PlangateError::storage(&temp, e))?;
        file.sync_all().map_err(|e| PlangateError::storage(&temp, e))?;
        fs::rename(&temp, &target).map_err(|e| PlangateError::storage(&target, e))?;
        Ok(())
    }

    fn remove_if_exists(&self, path: &Path) -> Result<()> {
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(PlangateError::storage(path, e)),
        }
    }
}

impl SessionStore for FileSessionStore {
    fn get(&self, session_id: &str) -> Result<Option<SessionState>> {
        let path = self.session_path(session_id);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "unreadable session record");
                return Ok(None);
            }
        };
        let state: SessionState = match serde_json::from_str(&content) {
            Ok(state) => state,
            Err(e) => {
                // A corrupt record restarts the review instead of
                // failing the hook.
                tracing::warn!(path = %path.display(), error = %e, "corrupt session record");
                return Ok(None);
            }
        };
        if state.is_stale() {
            tracing::debug!(session_id, "session record is stale");
            return Ok(None);
        }
        Ok(Some(state))
    }

    fn put(&self, state: &SessionState) -> Result<()> {
        self.atomic_write(&state.session_id, state)
    }

    fn delete(&self, session_id: &str) -> Result<()> {
        self.remove_if_exists(&self.session_path(session_id))?;
        self.remove_if_exists(&self.plan_marker_path(session_id))?;
        // Leftover temp file from an interrupted write
        self.remove_if_exists(&self.temp_path(session_id))
    }

    fn list(&self) -> Result<Vec<SessionState>> {
        let entries = match fs::read_dir(&self.sessions_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(PlangateError::storage(&self.sessions_dir, e)),
        };

        let mut records: Vec<(SystemTime, SessionState)> = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with('.'))
            {
                continue;
            }
            // Unreadable or unparseable records are skipped, not fatal
            let Ok(content) = fs::read_to_string(&path) else {
                continue;
            };
            let Ok(state) = serde_json::from_str::<SessionState>(&content) else {
                continue;
            };
            let modified = entry
                .metadata()
                .and_then(|m| m.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            records.push((modified, state));
        }

        records.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(records.into_iter().map(|(_, state)| state).collect())
    }

    fn clear_all(&self) -> Result<usize> {
        let entries = match fs::read_dir(&self.sessions_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(PlangateError::storage(&self.sessions_dir, e)),
        };

        let mut removed = 0;
        for entry in entries.flatten() {
            let path = entry.path();
            let hidden = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with('.'));
            match path.extension().and_then(|e| e.to_str()) {
                Some("json") if !hidden => {
                    self.remove_if_exists(&path)?;
                    removed += 1;
                }
                Some("plan") | Some("recent") | Some("tmp") => {
                    self.remove_if_exists(&path)?;
                }
                _ => {}
            }
        }
        Ok(removed)
    }

    fn record_plan_marker(&self, session_id: &str, path: &Path) -> Result<()> {
        let marker = PlanMarker {
            plan_file_path: path.to_path_buf(),
            recorded_at: Utc::now(),
        };
        let json = serde_json::to_string(&marker)?;
        let marker_path = self.plan_marker_path(session_id);
        fs::write(&marker_path, json).map_err(|e| PlangateError::storage(&marker_path, e))
    }

    fn plan_marker(&self, session_id: &str) -> Result<Option<PathBuf>> {
        let path = self.plan_marker_path(session_id);
        let Ok(content) = fs::read_to_string(&path) else {
            return Ok(None);
        };
        match serde_json::from_str::<PlanMarker>(&content) {
            Ok(marker) => Ok(Some(marker.plan_file_path)),
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "unparseable plan marker");
                Ok(None)
            }
        }
    }

    fn mark_evaluated(&self, session_id: &str, content_hash: &str) -> Result<()> {
        let marker = RecentEvaluation {
            content_hash: content_hash.to_string(),
            evaluated_at: Utc::now(),
        };
        let json = serde_json::to_string(&marker)?;
        let marker_path = self.recent_marker_path(session_id);
        fs::write(&marker_path, json).map_err(|e| PlangateError::storage(&marker_path, e))
    }

    fn recently_evaluated(&self, session_id: &str, content_hash: &str) -> Result<bool> {
        let path = self.recent_marker_path(session_id);
        let Ok(content) = fs::read_to_string(&path) else {
            return Ok(false);
        };
        let Ok(marker) = serde_json::from_str::<RecentEvaluation>(&content) else {
            return Ok(false);
        };
        if marker.content_hash != content_hash {
            return Ok(false);
        }
        let age = Utc::now()
            .signed_duration_since(marker.evaluated_at)
            .num_seconds();
        Ok((0..RECENT_EVAL_TTL_SECONDS).contains(&age))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::PlanIdentity;
    use chrono::Duration;
    use tempfile::TempDir;

    fn create_test_store() -> (FileSessionStore, TempDir) {
        let temp = TempDir::new().unwrap();
        let store = FileSessionStore::with_dir(temp.path().join("sessions")).unwrap();
        (store, temp)
    }

    fn reviewed_state(session_id: &str) -> SessionState {
        let mut state = SessionState::new(session_id);
        state.advance_round(PlanIdentity::from_file(
            "/p/.claude/plans/plan.md",
            "# Plan|aaaa1111",
        ));
        state.record_feedback(Some(5), "tighten the rollout steps");
        state
    }

    // ==========================================================
    // Conformance
    // ==========================================================

    #[test]
    fn test_conformance_crud() {
        let (store, _temp) = create_test_store();
        crate::storage::traits::tests::test_session_store_crud(&store);
    }

    #[test]
    fn test_conformance_markers() {
        let (store, _temp) = create_test_store();
        crate::storage::traits::tests::test_session_store_markers(&store);
    }

    // ==========================================================
    // Records on disk
    // ==========================================================

    #[test]
    fn test_with_dir_creates_directory() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("nested").join("sessions");
        let store = FileSessionStore::with_dir(&dir).unwrap();
        assert!(dir.is_dir());
        assert_eq!(store.sessions_dir(), dir);
    }

    #[test]
    fn test_put_writes_one_json_file_per_session() {
        let (store, _temp) = create_test_store();
        store.put(&reviewed_state("s-1")).unwrap();
        store.put(&reviewed_state("s-2")).unwrap();

        assert!(store.sessions_dir().join("s-1.json").is_file());
        assert!(store.sessions_dir().join("s-2.json").is_file());
        // No leftover temp files after a successful write
        assert!(!store.sessions_dir().join(".s-1.json.tmp").exists());
    }

    #[test]
    fn test_put_replaces_existing_record() {
        let (store, _temp) = create_test_store();
        let mut state = reviewed_state("s-1");
        store.put(&state).unwrap();

        state.record_feedback(Some(8), "good revision");
        store.put(&state).unwrap();

        let loaded = store.get("s-1").unwrap().unwrap();
        assert_eq!(loaded.last_score, Some(8));
        assert_eq!(loaded.last_feedback.as_deref(), Some("good revision"));
    }

    #[test]
    fn test_get_missing_session_returns_none() {
        let (store, _temp) = create_test_store();
        assert!(store.get("nope").unwrap().is_none());
    }

    #[test]
    fn test_get_corrupt_record_returns_none_without_deleting() {
        let (store, _temp) = create_test_store();
        let path = store.sessions_dir().join("s-1.json");
        fs::write(&path, "{ not json").unwrap();

        assert!(store.get("s-1").unwrap().is_none());
        // The record stays on disk for inspection
        assert!(path.is_file());
    }

    #[test]
    fn test_get_stale_record_returns_none_without_deleting() {
        let (store, _temp) = create_test_store();
        let mut state = reviewed_state("s-1");
        state.last_updated = Utc::now() - Duration::minutes(31);
        store.put(&state).unwrap();

        assert!(store.get("s-1").unwrap().is_none());
        assert!(store.sessions_dir().join("s-1.json").is_file());
    }

    #[test]
    fn test_get_within_staleness_window_returns_record() {
        let (store, _temp) = create_test_store();
        let mut state = reviewed_state("s-1");
        state.last_updated = Utc::now() - Duration::minutes(29);
        store.put(&state).unwrap();

        assert!(store.get("s-1").unwrap().is_some());
    }

    #[test]
    fn test_unsafe_session_id_is_sanitized() {
        let (store, _temp) = create_test_store();
        let state = reviewed_state("../../etc/passwd");
        store.put(&state).unwrap();

        // The record lands inside the sessions directory
        assert!(store
            .sessions_dir()
            .join("______etc_passwd.json")
            .is_file());
        assert!(store.get("../../etc/passwd").unwrap().is_some());
    }

    // ==========================================================
    // Listing
    // ==========================================================

    #[test]
    fn test_list_empty_store() {
        let (store, _temp) = create_test_store();
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_list_includes_stale_records() {
        let (store, _temp) = create_test_store();
        let mut stale = reviewed_state("old");
        stale.last_updated = Utc::now() - Duration::hours(2);
        store.put(&stale).unwrap();
        store.put(&reviewed_state("fresh")).unwrap();

        let listed = store.list().unwrap();
        assert_eq!(listed.len(), 2);
    }

    #[test]
    fn test_list_skips_markers_and_junk() {
        let (store, _temp) = create_test_store();
        store.put(&reviewed_state("s-1")).unwrap();
        store
            .record_plan_marker("s-1", Path::new("/p/.claude/plans/plan.md"))
            .unwrap();
        store.mark_evaluated("s-1", "cafe0123").unwrap();
        fs::write(store.sessions_dir().join("notes.txt"), "hi").unwrap();
        fs::write(store.sessions_dir().join("broken.json"), "{").unwrap();

        let listed = store.list().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].session_id, "s-1");
    }

    #[test]
    fn test_list_sorted_most_recent_first() {
        let (store, _temp) = create_test_store();
        store.put(&reviewed_state("older")).unwrap();
        // Backdate the first file's mtime so ordering does not depend
        // on write timing
        let older = store.sessions_dir().join("older.json");
        let past = SystemTime::now() - std::time::Duration::from_secs(120);
        let file = File::options().append(true).open(&older).unwrap();
        file.set_modified(past).unwrap();
        drop(file);
        store.put(&reviewed_state("newer")).unwrap();

        let listed = store.list().unwrap();
        assert_eq!(listed[0].session_id, "newer");
        assert_eq!(listed[1].session_id, "older");
    }

    // ==========================================================
    // Deletion
    // ==========================================================

    #[test]
    fn test_delete_removes_record_and_plan_marker() {
        let (store, _temp) = create_test_store();
        store.put(&reviewed_state("s-1")).unwrap();
        store
            .record_plan_marker("s-1", Path::new("/p/.claude/plans/plan.md"))
            .unwrap();

        store.delete("s-1").unwrap();
        assert!(!store.sessions_dir().join("s-1.json").exists());
        assert!(!store.sessions_dir().join("s-1.plan").exists());
    }

    #[test]
    fn test_clear_all_counts_sessions_and_removes_markers() {
        let (store, _temp) = create_test_store();
        store.put(&reviewed_state("s-1")).unwrap();
        store.put(&reviewed_state("s-2")).unwrap();
        store
            .record_plan_marker("s-1", Path::new("/p/.claude/plans/plan.md"))
            .unwrap();
        store.mark_evaluated("s-2", "cafe0123").unwrap();

        let removed = store.clear_all().unwrap();
        assert_eq!(removed, 2);
        assert!(store.list().unwrap().is_empty());
        assert!(store.plan_marker("s-1").unwrap().is_none());
        assert!(!store.recently_evaluated("s-2", "cafe0123").unwrap());
    }

    #[test]
    fn test_clear_all_empty_store() {
        let (store, _temp) = create_test_store();
        assert_eq!(store.clear_all().unwrap(), 0);
    }

    // ==========================================================
    // Markers
    // ==========================================================

    #[test]
    fn test_record_plan_marker_overwrites_previous() {
        let (store, _temp) = create_test_store();
        store
            .record_plan_marker("s-1", Path::new("/p/.claude/plans/first.md"))
            .unwrap();
        store
            .record_plan_marker("s-1", Path::new("/p/.claude/plans/second.md"))
            .unwrap();

        assert_eq!(
            store.plan_marker("s-1").unwrap().as_deref(),
            Some(Path::new("/p/.claude/plans/second.md"))
        );
    }

    #[test]
    fn test_corrupt_plan_marker_treated_as_absent() {
        let (store, _temp) = create_test_store();
        fs::write(store.sessions_dir().join("s-1.plan"), "not json").unwrap();
        assert!(store.plan_marker("s-1").unwrap().is_none());
    }

    #[test]
    fn test_expired_recent_marker_no_longer_matches() {
        let (store, _temp) = create_test_store();
        let marker = RecentEvaluation {
            content_hash: "cafe0123".to_string(),
            evaluated_at: Utc::now() - Duration::seconds(RECENT_EVAL_TTL_SECONDS + 5),
        };
        fs::write(
            store.sessions_dir().join("s-1.recent"),
            serde_json::to_string(&marker).unwrap(),
        )
        .unwrap();

        assert!(!store.recently_evaluated("s-1", "cafe0123").unwrap());
    }

    #[test]
    fn test_recent_marker_within_window_matches() {
        let (store, _temp) = create_test_store();
        let marker = RecentEvaluation {
            content_hash: "cafe0123".to_string(),
            evaluated_at: Utc::now() - Duration::seconds(RECENT_EVAL_TTL_SECONDS - 10),
        };
        fs::write(
            store.sessions_dir().join("s-1.recent"),
            serde_json::to_string(&marker).unwrap(),
        )
        .unwrap();

        assert!(store.recently_evaluated("s-1", "cafe0123").unwrap());
    }
}
