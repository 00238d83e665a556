//! Hook input types for Claude Code integration.
//!
//! These types model the JSON that Claude Code writes to a hook's
//! stdin. Unknown fields are ignored so newer protocol versions do not
//! break older binaries.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Common input fields shared by all hook events.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HookInput {
    /// Unique session identifier.
    pub session_id: String,
    /// Path to the conversation transcript (JSONL).
    pub transcript_path: PathBuf,
    /// Project working directory.
    pub cwd: PathBuf,
    /// Permission mode active when the hook fired ("default", "plan", ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permission_mode: Option<String>,
}

impl HookInput {
    /// Create a new hook input.
    pub fn new(
        session_id: impl Into<String>,
        transcript_path: impl Into<PathBuf>,
        cwd: impl Into<PathBuf>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            transcript_path: transcript_path.into(),
            cwd: cwd.into(),
            permission_mode: None,
        }
    }

    /// Set the permission mode.
    pub fn with_permission_mode(mut self, mode: impl Into<String>) -> Self {
        self.permission_mode = Some(mode.into());
        self
    }
}

/// Input for the pre-tool-use hook.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PreToolUseInput {
    /// Common hook input fields.
    #[serde(flatten)]
    pub common: HookInput,
    /// The name of the tool about to run.
    pub tool_name: String,
    /// The tool input (as JSON value).
    #[serde(default)]
    pub tool_input: serde_json::Value,
}

impl PreToolUseInput {
    /// Create a new pre-tool-use input.
    pub fn new(
        common: HookInput,
        tool_name: impl Into<String>,
        tool_input: serde_json::Value,
    ) -> Self {
        Self {
            common,
            tool_name: tool_name.into(),
            tool_input,
        }
    }

    /// The `plan` field of an ExitPlanMode invocation, if present.
    pub fn plan_text(&self) -> Option<&str> {
        self.tool_input.get("plan").and_then(|v| v.as_str())
    }
}

/// Input for the post-tool-use hook.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PostToolUseInput {
    /// Common hook input fields.
    #[serde(flatten)]
    pub common: HookInput,
    /// The name of the tool that ran.
    pub tool_name: String,
    /// The tool input (as JSON value).
    #[serde(default)]
    pub tool_input: serde_json::Value,
    /// The tool response (as JSON value).
    #[serde(default)]
    pub tool_response: serde_json::Value,
}

impl PostToolUseInput {
    /// Create a new post-tool-use input.
    pub fn new(
        common: HookInput,
        tool_name: impl Into<String>,
        tool_input: serde_json::Value,
    ) -> Self {
        Self {
            common,
            tool_name: tool_name.into(),
            tool_input,
            tool_response: serde_json::Value::Null,
        }
    }

    /// The `file_path` field of a Write or Edit invocation, if present.
    pub fn file_path(&self) -> Option<&str> {
        self.tool_input.get("file_path").and_then(|v| v.as_str())
    }
}

/// Input for the stop hook.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StopInput {
    /// Common hook input fields.
    #[serde(flatten)]
    pub common: HookInput,
    /// True when this turn was already continued by a stop hook.
    #[serde(default)]
    pub stop_hook_active: bool,
    /// The assistant's final message, when Claude Code provides it
    /// directly. Absent on older versions; the transcript is the
    /// fallback.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_assistant_message: Option<String>,
}

impl StopInput {
    /// Create a new stop input.
    pub fn new(common: HookInput) -> Self {
        Self {
            common,
            stop_hook_active: false,
            last_assistant_message: None,
        }
    }
}

/// Parse hook input from JSON.
pub fn parse_input<T: for<'de> Deserialize<'de>>(json: &str) -> crate::error::Result<T> {
    serde_json::from_str(json).map_err(|e| {
        crate::error::PlangateError::serde(format!("Failed to parse hook input: {}", e))
    })
}
