//! Plangate - Plan Review Gate for Claude Code
//!
//! CLI entry point with global panic handler.

use std::io::{Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use plangate::config::{self, plangate_home, Config};
use plangate::error::exit_codes;
use plangate::hooks::{to_json, HookRunner, HookType};
use plangate::scorer::CliScorer;
use plangate::storage::FileSessionStore;

// =============================================================================
// Version
// =============================================================================

/// Get the version string.
///
/// - Release builds (on a git tag): "0.3.0"
/// - Development builds: "0.3.0-dev (abc1234)"
/// - Dirty working directory: "0.3.0-dev (abc1234-dirty)"
fn version() -> &'static str {
    const VERSION: &str = env!("CARGO_PKG_VERSION");
    const GIT_HASH: &str = env!("PLANGATE_GIT_HASH");
    const IS_RELEASE: &str = env!("PLANGATE_IS_RELEASE");

    // Use a static to avoid repeated allocations
    static VERSION_STRING: std::sync::OnceLock<String> = std::sync::OnceLock::new();

    VERSION_STRING.get_or_init(|| {
        if IS_RELEASE == "true" {
            VERSION.to_string()
        } else {
            format!("{VERSION}-dev ({GIT_HASH})")
        }
    })
}

// =============================================================================
// CLI Definition
// =============================================================================

/// Plangate - Plan Review Gate for Claude Code
#[derive(Parser)]
#[command(name = "plangate")]
#[command(author, version = version(), about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// [Internal] Run a hook (JSON stdin/stdout). Called by Claude Code hooks
    Hook {
        /// The hook event type
        #[arg(value_enum)]
        event: HookEvent,
    },

    /// [User] List stored review sessions
    Sessions {
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
        /// Maximum number of sessions to show
        #[arg(long, short, default_value = "20")]
        limit: usize,
    },

    /// [User] Clear stored review state
    Clear {
        /// Session ID to clear
        session_id: Option<String>,
        /// Clear all sessions
        #[arg(long)]
        all: bool,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },

    /// [User] Print the resolved configuration and its sources
    Config {
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },

    /// [User] Initialize Plangate configuration
    Init {
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
        /// Force overwrite existing files
        #[arg(long, short)]
        force: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum HookEvent {
    PreToolUse,
    PostToolUse,
    Stop,
}

impl From<HookEvent> for HookType {
    fn from(event: HookEvent) -> Self {
        match event {
            HookEvent::PreToolUse => HookType::PreToolUse,
            HookEvent::PostToolUse => HookType::PostToolUse,
            HookEvent::Stop => HookType::Stop,
        }
    }
}

// =============================================================================
// Main Entry Point
// =============================================================================

fn main() -> ExitCode {
    // Set up panic handler
    setup_panic_handler();

    // Run the CLI
    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("plangate error: {}", e);
            ExitCode::from(exit_codes::APPROVE as u8) // Fail-open
        }
    }
}

/// Set up the global panic handler.
///
/// On panic, logs to ~/.plangate/crash.log and exits with code 3.
/// This ensures crashes don't block the user (fail-open philosophy).
fn setup_panic_handler() {
    std::panic::set_hook(Box::new(|info| {
        // Log to stderr
        eprintln!("plangate panic: {}", info);

        // Try to log to crash file
        if let Some(home) = plangate_home() {
            let crash_log = home.join("crash.log");
            if let Ok(mut file) = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&crash_log)
            {
                let timestamp = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
                let _ = writeln!(file, "[{}] {}", timestamp, info);
            }
        }

        // Exit with crash code (fail-open)
        std::process::exit(exit_codes::CRASH);
    }));
}

/// Run the CLI and return the exit code.
fn run() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let cwd = std::env::current_dir()?;

    match cli.command {
        Commands::Hook { event } => run_hook(event.into()),
        Commands::Sessions { json, quiet, limit } => run_sessions(json, quiet, limit),
        Commands::Clear {
            session_id,
            all,
            json,
            quiet,
        } => run_clear(session_id.as_deref(), all, json, quiet),
        Commands::Config { json, quiet } => run_config(json, quiet, &cwd),
        Commands::Init { json, quiet, force } => run_init(json, quiet, force, &cwd),
    }
}

/// Install the stderr tracing subscriber.
///
/// `RUST_LOG` wins when set; otherwise verbose mode lowers the filter
/// to debug for plangate's own events.
fn init_logging(verbose: bool) {
    let default_filter = if verbose { "plangate=debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .try_init();
}

/// Pull the session cwd out of raw hook input without a full parse.
fn peek_cwd(input: &str) -> Option<PathBuf> {
    #[derive(serde::Deserialize)]
    struct CwdOnly {
        cwd: PathBuf,
    }
    serde_json::from_str::<CwdOnly>(input)
        .ok()
        .map(|peeked| peeked.cwd)
}

// =============================================================================
// Command Implementations
// =============================================================================

fn run_hook(hook_type: HookType) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let mut input = String::new();
    if let Err(e) = std::io::stdin()
        .take(plangate::util::MAX_FILE_SIZE)
        .read_to_string(&mut input)
    {
        eprintln!("plangate: failed to read hook input: {e}");
    }

    // Hook stdin carries the session cwd; config resolution follows the
    // project being planned, not wherever Claude Code spawned us.
    let cwd = peek_cwd(&input);
    let config = match &cwd {
        Some(cwd) => Config::load_from_cwd(cwd),
        None => Config::load(),
    };
    init_logging(config.debug.verbose);

    let store = match FileSessionStore::new() {
        Ok(store) => store,
        Err(e) => {
            tracing::warn!(error = %e, "session store unavailable, approving");
            return Ok(ExitCode::from(exit_codes::APPROVE as u8));
        }
    };

    let schema_path = config::scorer_schema_path()
        .unwrap_or_else(|| store.sessions_dir().join("scorer_schema.json"));
    let mut scorer = CliScorer::new(config.scorer.clone(), schema_path);
    if let Some(cwd) = cwd {
        scorer = scorer.with_cwd(cwd);
    }

    let runner = HookRunner::new(store, scorer, config);
    let response = runner.run_with_input(hook_type, &input);

    if !response.is_empty() {
        println!("{}", to_json(&response)?);
    }

    Ok(ExitCode::from(response.exit_code() as u8))
}

/// Convert a success boolean to an exit code.
fn success_to_exit_code(success: bool) -> ExitCode {
    if success {
        ExitCode::from(exit_codes::APPROVE as u8)
    } else {
        ExitCode::from(exit_codes::ERROR as u8)
    }
}

fn run_sessions(
    json: bool,
    quiet: bool,
    limit: usize,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    use plangate::cli::sessions::{SessionsCommand, SessionsOptions};

    init_logging(false);
    let store = FileSessionStore::new()?;

    let cmd = SessionsCommand::new(store);
    let options = SessionsOptions { json, quiet, limit };

    let output = cmd.run(&options);

    if !quiet {
        if json {
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!("{}", output.format_text());
        }
    }

    Ok(success_to_exit_code(output.success))
}

fn run_clear(
    session_id: Option<&str>,
    all: bool,
    json: bool,
    quiet: bool,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    use plangate::cli::clear::{ClearCommand, ClearOptions};

    init_logging(false);
    let store = FileSessionStore::new()?;

    let cmd = ClearCommand::new(store);
    let options = ClearOptions { json, quiet, all };

    let output = cmd.run(session_id, &options);
    let formatted = cmd.format_output(&output, &options);

    if !formatted.is_empty() {
        println!("{}", formatted);
    }

    Ok(success_to_exit_code(output.success))
}

fn run_config(json: bool, quiet: bool, cwd: &std::path::Path) -> Result<ExitCode, Box<dyn std::error::Error>> {
    use plangate::cli::config_cmd::{ConfigCommand, ConfigOptions};

    init_logging(false);

    let cmd = ConfigCommand::new(cwd);
    let options = ConfigOptions { json, quiet };

    let output = cmd.run(&options);
    let formatted = cmd.format_output(&output, &options);

    if !formatted.is_empty() {
        println!("{}", formatted);
    }

    Ok(success_to_exit_code(output.success))
}

fn run_init(
    json: bool,
    quiet: bool,
    force: bool,
    cwd: &std::path::Path,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    use plangate::cli::init::{InitCommand, InitOptions};

    init_logging(false);

    let cmd = InitCommand::new(cwd);
    let options = InitOptions { json, quiet, force };

    let output = cmd.run(&options);
    let formatted = cmd.format_output(&output, &options);

    if !formatted.is_empty() {
        println!("{}", formatted);
    }

    Ok(success_to_exit_code(output.success))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(exit_codes::APPROVE, 0);
        assert_eq!(exit_codes::ERROR, 1);
        assert_eq!(exit_codes::BLOCK, 2);
        assert_eq!(exit_codes::CRASH, 3);
    }

    #[test]
    fn test_success_to_exit_code() {
        assert_eq!(
            success_to_exit_code(true),
            ExitCode::from(exit_codes::APPROVE as u8)
        );
        assert_eq!(
            success_to_exit_code(false),
            ExitCode::from(exit_codes::ERROR as u8)
        );
    }

    #[test]
    fn test_version_starts_with_crate_version() {
        assert!(version().starts_with(env!("CARGO_PKG_VERSION")));
    }

    #[test]
    fn test_hook_event_conversion() {
        assert_eq!(HookType::from(HookEvent::PreToolUse), HookType::PreToolUse);
        assert_eq!(
            HookType::from(HookEvent::PostToolUse),
            HookType::PostToolUse
        );
        assert_eq!(HookType::from(HookEvent::Stop), HookType::Stop);
    }

    #[test]
    fn test_peek_cwd() {
        let input = r#"{"session_id": "s-1", "cwd": "/work/project"}"#;
        assert_eq!(peek_cwd(input), Some(PathBuf::from("/work/project")));
        assert_eq!(peek_cwd("not json"), None);
        assert_eq!(peek_cwd(r#"{"session_id": "s-1"}"#), None);
    }

    #[test]
    fn test_cli_parse_hook() {
        let cli = Cli::parse_from(["plangate", "hook", "pre-tool-use"]);
        match cli.command {
            Commands::Hook { event } => {
                assert!(matches!(event, HookEvent::PreToolUse));
            }
            _ => panic!("Expected Hook command"),
        }
    }

    #[test]
    fn test_cli_parse_sessions() {
        let cli = Cli::parse_from(["plangate", "sessions", "--limit", "50", "--json"]);
        match cli.command {
            Commands::Sessions { json, limit, .. } => {
                assert!(json);
                assert_eq!(limit, 50);
            }
            _ => panic!("Expected Sessions command"),
        }
    }

    #[test]
    fn test_cli_parse_clear_by_id() {
        let cli = Cli::parse_from(["plangate", "clear", "abc-123"]);
        match cli.command {
            Commands::Clear {
                session_id, all, ..
            } => {
                assert_eq!(session_id, Some("abc-123".to_string()));
                assert!(!all);
            }
            _ => panic!("Expected Clear command"),
        }
    }

    #[test]
    fn test_cli_parse_clear_all() {
        let cli = Cli::parse_from(["plangate", "clear", "--all", "--json"]);
        match cli.command {
            Commands::Clear {
                session_id,
                all,
                json,
                ..
            } => {
                assert_eq!(session_id, None);
                assert!(all);
                assert!(json);
            }
            _ => panic!("Expected Clear command"),
        }
    }

    #[test]
    fn test_cli_parse_config() {
        let cli = Cli::parse_from(["plangate", "config", "--json"]);
        match cli.command {
            Commands::Config { json, .. } => {
                assert!(json);
            }
            _ => panic!("Expected Config command"),
        }
    }

    #[test]
    fn test_cli_parse_init() {
        let cli = Cli::parse_from(["plangate", "init", "--force", "--json"]);
        match cli.command {
            Commands::Init { force, json, .. } => {
                assert!(force);
                assert!(json);
            }
            _ => panic!("Expected Init command"),
        }
    }
}
