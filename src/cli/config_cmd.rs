//! Config command for Plangate.
//!
//! Prints the resolved configuration along with where each layer came
//! from, so a surprising gate decision can be traced to the file or
//! environment variable responsible.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

use crate::config::{plangate_home, project_plangate_dir, Config};

/// Environment variables the config loader honors, in the order they
/// are applied.
const ENV_VARS: &[&str] = &[
    "PLANGATE_HOME",
    "PLANGATE_ENABLED",
    "PLANGATE_THRESHOLD",
    "PLANGATE_MAX_ROUNDS",
    "PLANGATE_MODEL",
    "PLANGATE_FAIL_OPEN",
    "PLANGATE_RUBRIC",
    "PLANGATE_SCORER_PATH",
    "PLANGATE_VERBOSE",
    "PLANGATE_TIMEOUT_SECONDS",
    "PLANGATE_STRESS_TEST",
    "PLANGATE_STRESS_TEST_PROMPT",
    "PLANGATE_CONTEXT",
];

/// Options for the config command.
#[derive(Debug, Clone, Default)]
pub struct ConfigOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
}

/// One configuration file layer and whether it contributed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSource {
    /// Layer name ("user" or "project").
    pub level: String,
    /// Path of the config file for this layer.
    pub path: String,
    /// Whether the file exists.
    pub exists: bool,
}

/// Output format for the config command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigOutput {
    /// Whether the command was successful.
    pub success: bool,
    /// The fully resolved configuration.
    pub config: Config,
    /// File layers, lowest precedence first.
    pub sources: Vec<ConfigSource>,
    /// Environment variables currently set that override the files.
    pub env_overrides: Vec<String>,
    /// Error message if command failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// The config command implementation.
pub struct ConfigCommand {
    cwd: PathBuf,
}

impl ConfigCommand {
    /// Create a new config command.
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self { cwd: cwd.into() }
    }

    /// Run the config command.
    pub fn run(&self, _options: &ConfigOptions) -> ConfigOutput {
        let config = Config::load_from_cwd(&self.cwd);

        let mut sources = Vec::new();
        if let Some(home) = plangate_home() {
            let path = home.join("config.toml");
            sources.push(ConfigSource {
                level: "user".to_string(),
                exists: path.is_file(),
                path: path.display().to_string(),
            });
        }
        let project_path = project_plangate_dir(&self.cwd).join("config.toml");
        sources.push(ConfigSource {
            level: "project".to_string(),
            exists: project_path.is_file(),
            path: project_path.display().to_string(),
        });

        let env_overrides = ENV_VARS
            .iter()
            .filter(|name| env::var(name).is_ok())
            .map(|name| name.to_string())
            .collect();

        ConfigOutput {
            success: true,
            config,
            sources,
            env_overrides,
            error: None,
        }
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &ConfigOutput, options: &ConfigOptions) -> String {
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
    fn format_human_readable(&self, output: &ConfigOutput) -> String {
        let mut lines = vec!["Resolved configuration:".to_string(), String::new()];

        match toml::to_string_pretty(&output.config) {
            Ok(rendered) => lines.push(rendered),
            Err(e) => lines.push(format!("(could not render config: {})", e)),
        }

        lines.push("Sources (later layers win):".to_string());
        lines.push("  defaults  built in".to_string());
        for source in &output.sources {
            let state = if source.exists { "loaded" } else { "absent" };
            lines.push(format!("  {:<8}  {} ({})", source.level, source.path, state));
        }
        if output.env_overrides.is_empty() {
            lines.push("  env       none set".to_string());
        } else {
            lines.push(format!("  env       {}", output.env_overrides.join(", ")));
        }

        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    #[serial]
    fn test_config_run_reports_sources() {
        let temp = TempDir::new().unwrap();
        let cmd = ConfigCommand::new(temp.path());

        let output = cmd.run(&ConfigOptions::default());

        assert!(output.success);
        let project = output
            .sources
            .iter()
            .find(|s| s.level == "project")
            .unwrap();
        assert!(!project.exists);
        assert!(project.path.ends_with(".plangate/config.toml"));
    }

    #[test]
    #[serial]
    fn test_config_reflects_project_file() {
        let temp = TempDir::new().unwrap();
        let plangate_dir = temp.path().join(".plangate");
        fs::create_dir_all(&plangate_dir).unwrap();
        fs::write(
            plangate_dir.join("config.toml"),
            "[gate]\nthreshold = 9\n",
        )
        .unwrap();

        let cmd = ConfigCommand::new(temp.path());
        let output = cmd.run(&ConfigOptions::default());

        assert_eq!(output.config.gate.threshold, 9);
        let project = output
            .sources
            .iter()
            .find(|s| s.level == "project")
            .unwrap();
        assert!(project.exists);
    }

    #[test]
    #[serial]
    fn test_config_lists_env_overrides() {
        let temp = TempDir::new().unwrap();
        std::env::set_var("PLANGATE_THRESHOLD", "8");

        let cmd = ConfigCommand::new(temp.path());
        let output = cmd.run(&ConfigOptions::default());

        std::env::remove_var("PLANGATE_THRESHOLD");

        assert!(output
            .env_overrides
            .contains(&"PLANGATE_THRESHOLD".to_string()));
        assert_eq!(output.config.gate.threshold, 8);
    }

    #[test]
    #[serial]
    fn test_format_human_readable() {
        let temp = TempDir::new().unwrap();
        let cmd = ConfigCommand::new(temp.path());
        let output = cmd.run(&ConfigOptions::default());

        let text = cmd.format_output(&output, &ConfigOptions::default());

        assert!(text.contains("Resolved configuration:"));
        assert!(text.contains("[gate]"));
        assert!(text.contains("threshold"));
        assert!(text.contains("Sources (later layers win):"));
        assert!(text.contains("defaults"));
    }

    #[test]
    #[serial]
    fn test_format_json() {
        let temp = TempDir::new().unwrap();
        let cmd = ConfigCommand::new(temp.path());
        let output = cmd.run(&ConfigOptions::default());
        let options = ConfigOptions {
            json: true,
            ..Default::default()
        };

        let formatted = cmd.format_output(&output, &options);

        assert!(formatted.contains("\"success\": true"));
        assert!(formatted.contains("\"gate\""));
        assert!(formatted.contains("\"sources\""));
    }

    #[test]
    fn test_format_quiet() {
        let cmd = ConfigCommand::new("/tmp");
        let output = ConfigOutput {
            success: true,
            config: Config::default(),
            sources: Vec::new(),
            env_overrides: Vec::new(),
            error: None,
        };
        let options = ConfigOptions {
            quiet: true,
            ..Default::default()
        };

        assert!(cmd.format_output(&output, &options).is_empty());
    }
}
