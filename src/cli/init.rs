//! Init command for Plangate.
//!
//! Scaffolds the Plangate configuration files and directories and
//! prints the hook wiring for `.claude/settings.json`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{plangate_home, project_plangate_dir, sessions_dir};

/// Options for the init command.
#[derive(Debug, Clone, Default)]
pub struct InitOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
    /// Force overwrite existing files.
    pub force: bool,
}

/// Output format for the init command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitOutput {
    /// Whether initialization was successful.
    pub success: bool,
    /// Files and directories created.
    pub created: Vec<String>,
    /// Files that already existed (skipped).
    pub skipped: Vec<String>,
    /// Error message if initialization failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl InitOutput {
    /// Create a successful output.
    pub fn success(created: Vec<String>, skipped: Vec<String>) -> Self {
        Self {
            success: true,
            created,
            skipped,
            error: None,
        }
    }

    /// Create a failed output with partial success information.
    ///
    /// This reports what was created before the failure occurred, so the user
    /// knows what partial state may have been left behind.
    pub fn failure(error: impl Into<String>, created: Vec<String>, skipped: Vec<String>) -> Self {
        Self {
            success: false,
            created,
            skipped,
            error: Some(error.into()),
        }
    }
}

/// Default config.toml content.
const DEFAULT_CONFIG: &str = r#"# Plangate Configuration
#
# This file configures the Plangate plan review gate. Values here
# override ~/.plangate/config.toml; environment variables (PLANGATE_*)
# override both.

[gate]
# Master switch for plan review
enabled = true
# Minimum total score (0-10) a plan needs from round 2 on
threshold = 7
# Review rounds before the gate escalates to the user
max_rounds = 3
# Approve when the scorer itself fails
fail_open = true

[scorer]
# Oracle CLI executable: a bare name resolved via PATH, or an absolute path
path = "codex"
# Wall-clock budget for a single scorer invocation
timeout_seconds = 90
# Uncomment to pin the oracle model
# model = "gpt-5"

[stress]
# Reject the first plan of every session unscored, forcing one
# self-review pass before the oracle sees it
enabled = false

[detection]
# Heuristic score (1-20) a turn-end message must reach to be reviewed
min_score = 6

[debug]
# Diagnostic logging to stderr
verbose = false
"#;

/// Hook wiring for `.claude/settings.json`.
const HOOK_SETTINGS: &str = r#"{
  "hooks": {
    "PreToolUse": [
      {
        "matcher": "ExitPlanMode",
        "hooks": [{ "type": "command", "command": "plangate hook pre-tool-use" }]
      }
    ],
    "PostToolUse": [
      {
        "matcher": "Write|Edit",
        "hooks": [{ "type": "command", "command": "plangate hook post-tool-use" }]
      }
    ],
    "Stop": [
      {
        "hooks": [{ "type": "command", "command": "plangate hook stop" }]
      }
    ]
  }
}"#;

/// The init command implementation.
pub struct InitCommand {
    cwd: PathBuf,
}

impl InitCommand {
    /// Create a new init command.
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self { cwd: cwd.into() }
    }

    /// Run the init command.
    pub fn run(&self, options: &InitOptions) -> InitOutput {
        let mut created = Vec::new();
        let mut skipped = Vec::new();

        // Create project .plangate directory
        let plangate_dir = project_plangate_dir(&self.cwd);
        match self.ensure_dir(&plangate_dir) {
            Ok(true) => created.push(plangate_dir.display().to_string()),
            Ok(false) => skipped.push(plangate_dir.display().to_string()),
            Err(e) => return InitOutput::failure(e, created, skipped),
        }

        // Create project config.toml
        let config_path = plangate_dir.join("config.toml");
        match self.ensure_file(&config_path, DEFAULT_CONFIG, options.force) {
            Ok(true) => created.push(config_path.display().to_string()),
            Ok(false) => skipped.push(config_path.display().to_string()),
            Err(e) => return InitOutput::failure(e, created, skipped),
        }

        // Create user-level ~/.plangate directory
        if let Some(home) = plangate_home() {
            match self.ensure_dir(&home) {
                Ok(true) => created.push(home.display().to_string()),
                Ok(false) => skipped.push(home.display().to_string()),
                Err(e) => return InitOutput::failure(e, created, skipped),
            }
        }

        // Create sessions directory
        if let Some(sessions) = sessions_dir() {
            match self.ensure_dir(&sessions) {
                Ok(true) => created.push(sessions.display().to_string()),
                Ok(false) => skipped.push(sessions.display().to_string()),
                Err(e) => return InitOutput::failure(e, created, skipped),
            }
        }

        InitOutput::success(created, skipped)
    }

    /// Ensure a directory exists.
    /// Returns Ok(true) if created, Ok(false) if already exists.
    fn ensure_dir(&self, path: &Path) -> Result<bool, String> {
        if path.exists() {
            if path.is_dir() {
                return Ok(false);
            } else {
                return Err(format!("{} exists but is not a directory", path.display()));
            }
        }

        fs::create_dir_all(path)
            .map_err(|e| format!("Failed to create directory {}: {}", path.display(), e))?;

        Ok(true)
    }

    /// Ensure a file exists with the given content.
    /// Returns Ok(true) if created, Ok(false) if already exists.
    fn ensure_file(&self, path: &Path, content: &str, force: bool) -> Result<bool, String> {
        if path.exists() && !force {
            return Ok(false);
        }

        fs::write(path, content)
            .map_err(|e| format!("Failed to write file {}: {}", path.display(), e))?;

        Ok(true)
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &InitOutput, options: &InitOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string())
        } else {
            self.format_human_readable(output)
        }
    }

    /// Format output as human-readable text.
    fn format_human_readable(&self, output: &InitOutput) -> String {
        if !output.success {
            let mut lines = Vec::new();
            lines.push(format!(
                "Init failed: {}",
                output.error.as_deref().unwrap_or("unknown error")
            ));

            // Report what was partially created before the failure
            if !output.created.is_empty() {
                lines.push(String::new());
                lines.push("Partially created before failure:".to_string());
                for path in &output.created {
                    lines.push(format!("  {}", path));
                }
            }

            if !output.skipped.is_empty() {
                lines.push(String::new());
                lines.push("Already existed (skipped):".to_string());
                for path in &output.skipped {
                    lines.push(format!("  {}", path));
                }
            }

            return lines.join("\n") + "\n";
        }

        let mut lines = Vec::new();

        if !output.created.is_empty() {
            lines.push("Created:".to_string());
            for path in &output.created {
                lines.push(format!("  {}", path));
            }
        }

        if !output.skipped.is_empty() {
            lines.push("Already exists (skipped):".to_string());
            for path in &output.skipped {
                lines.push(format!("  {}", path));
            }
        }

        lines.push(String::new());
        lines.push("Plangate initialized. Wire the hooks into .claude/settings.json:".to_string());
        lines.push(String::new());
        lines.push(HOOK_SETTINGS.to_string());

        lines.join("\n") + "\n"
    }
}
