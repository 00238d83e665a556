//! Plan text acquisition for hook events.
//!
//! The gate sees a plan through one of three doors, tried in order of
//! reliability:
//!
//! 1. **Plan file**: a markdown file under `.claude/plans/`, located via
//!    the session's plan-file marker or a directory scan. Anything found
//!    here is unconditionally a plan.
//! 2. **Tool input**: the `plan` field of an ExitPlanMode call.
//! 3. **Transcript tail**: the last assistant message of the session
//!    transcript, for the Stop hook. Heuristic territory, so the
//!    detector decides whether it is plan-shaped at all.

use serde_json::Value;
use std::fs;
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::core::PlanIdentity;
use crate::plan::fingerprint::fingerprint;
use crate::util::{read_to_string_with_limit, MAX_PLAN_FILE_SIZE, MAX_TRANSCRIPT_SIZE};

/// Where a plan candidate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanSource {
    /// A file under `.claude/plans/`.
    PlanFile,
    /// The `plan` field of an ExitPlanMode tool call.
    ToolInput,
    /// The last assistant message in the session transcript.
    Transcript,
}

impl PlanSource {
    /// Short name for log lines.
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanSource::PlanFile => "plan_file",
            PlanSource::ToolInput => "tool_input",
            PlanSource::Transcript => "transcript",
        }
    }
}

/// A plan candidate with its provenance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredPlan {
    /// The plan text.
    pub text: String,
    /// Backing file, present only for [`PlanSource::PlanFile`].
    pub path: Option<PathBuf>,
    /// Which door the plan came through.
    pub source: PlanSource,
}

impl DiscoveredPlan {
    /// A plan taken from ExitPlanMode tool input.
    pub fn from_tool_input(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            path: None,
            source: PlanSource::ToolInput,
        }
    }

    /// A plan taken from the transcript tail.
    pub fn from_transcript(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            path: None,
            source: PlanSource::Transcript,
        }
    }

    /// Derive the review identity for this candidate.
    pub fn identity(&self) -> PlanIdentity {
        PlanIdentity::new(self.path.clone(), fingerprint(&self.text))
    }
}

/// Check whether a written file should be tracked as the session's plan.
///
/// Plan files live under `.claude/plans/` and are markdown.
pub fn is_plan_file_path(path: &str) -> bool {
    path.contains("/.claude/plans/") && path.ends_with(".md")
}

/// Locate the plan file for the current session.
///
/// The marker path recorded by the PostToolUse hook is tried first; when
/// it is missing or unreadable, the newest markdown file under
/// `<cwd>/.claude/plans/` is used instead. Returns `None` when neither
/// door yields usable text.
pub fn find_plan_file(marker: Option<&Path>, cwd: Option<&Path>) -> Option<DiscoveredPlan> {
    if let Some(path) = marker {
        if let Some(text) = read_plan_file(path) {
            return Some(DiscoveredPlan {
                text,
                path: Some(path.to_path_buf()),
                source: PlanSource::PlanFile,
            });
        }
        tracing::debug!("plan marker {} unusable, falling back to scan", path.display());
    }

    let plans_dir = cwd?.join(".claude").join("plans");
    let latest = latest_markdown(&plans_dir)?;
    let text = read_plan_file(&latest)?;
    Some(DiscoveredPlan {
        text,
        path: Some(latest),
        source: PlanSource::PlanFile,
    })
}

/// Read a plan file, returning `None` when it is missing, oversized, or
/// blank. A plan larger than the cap is not a plan.
pub fn read_plan_file(path: &Path) -> Option<String> {
    let text = read_to_string_with_limit(path, MAX_PLAN_FILE_SIZE).ok()?;
    if text.trim().is_empty() {
        return None;
    }
    Some(text)
}

/// Most recently modified `.md` file in `dir`, if any.
fn latest_markdown(dir: &Path) -> Option<PathBuf> {
    let entries = fs::read_dir(dir).ok()?;
    let mut newest: Option<(SystemTime, PathBuf)> = None;

    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some("md") {
            continue;
        }
        let Ok(metadata) = entry.metadata() else {
            continue;
        };
        let Ok(modified) = metadata.modified() else {
            continue;
        };
        if newest.as_ref().is_none_or(|(when, _)| modified > *when) {
            newest = Some((modified, path));
        }
    }

    newest.map(|(_, path)| path)
}

/// Extract the last assistant message text from a JSONL transcript.
///
/// Transcript entries carry `role` and `content`; content is either a
/// string or a list of content blocks whose `text` parts are joined with
/// newlines. Malformed lines are skipped. Returns an empty string when
/// the transcript is missing, oversized, or holds no assistant text.
pub fn last_assistant_text(transcript_path: &Path) -> String {
    let Ok(metadata) = fs::metadata(transcript_path) else {
        return String::new();
    };
    if metadata.len() > MAX_TRANSCRIPT_SIZE {
        tracing::warn!(
            "transcript {} exceeds {} bytes, skipping",
            transcript_path.display(),
            MAX_TRANSCRIPT_SIZE
        );
        return String::new();
    }

    let Ok(file) = fs::File::open(transcript_path) else {
        return String::new();
    };

    let mut last_text: Option<String> = None;
    for line in std::io::BufReader::new(file).lines() {
        let Ok(line) = line else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Ok(entry) = serde_json::from_str::<Value>(line) else {
            continue;
        };
        if entry.get("role").and_then(Value::as_str) != Some("assistant") {
            continue;
        }

        match entry.get("content") {
            Some(Value::String(text)) => last_text = Some(text.clone()),
            Some(Value::Array(blocks)) => {
                let parts: Vec<&str> = blocks
                    .iter()
                    .filter_map(|block| match block {
                        Value::String(text) => Some(text.as_str()),
                        Value::Object(map)
                            if map.get("type").and_then(Value::as_str) == Some("text") =>
                        {
                            Some(map.get("text").and_then(Value::as_str).unwrap_or(""))
                        }
                        _ => None,
                    })
                    .collect();
                if !parts.is_empty() {
                    last_text = Some(parts.join("\n"));
                }
            }
            // An assistant entry with no content clears the tail.
            None => last_text = Some(String::new()),
            Some(_) => {}
        }
    }

    last_text.unwrap_or_default()
}
