//! Configuration loading for Plangate.
//!
//! Configuration follows a precedence chain:
//! 1. Environment variables (highest priority)
//! 2. Project config (`.plangate/config.toml`)
//! 3. User config (`~/.plangate/config.toml`)
//! 4. Defaults (lowest priority)
//!
//! All configuration is optional. The gate runs with sensible defaults when
//! no config exists, and out-of-range values are clamped rather than
//! rejected: a hook that refuses to run because of a typo in a config file
//! would silently disable the review gate.

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::error::{PlangateError, Result};

/// Main configuration struct for Plangate.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Review gate behavior.
    pub gate: GateConfig,
    /// External scorer invocation.
    pub scorer: ScorerConfig,
    /// Stress-test mode.
    pub stress: StressConfig,
    /// Plan detection heuristics.
    pub detection: DetectionConfig,
    /// Diagnostic output.
    pub debug: DebugConfig,
}

/// Review gate behavior configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GateConfig {
    /// Master switch. When false, every hook event passes through untouched.
    pub enabled: bool,
    /// Minimum total score (0-10) a plan needs to pass.
    pub threshold: u8,
    /// Review rounds granted before the gate escalates to the user.
    pub max_rounds: u32,
    /// On scorer failure, pass the plan through instead of rejecting it.
    pub fail_open: bool,
}

/// Maximum valid threshold value (the rubric scale tops out at 10).
pub const MAX_THRESHOLD: u8 = 10;

/// Minimum valid max_rounds value (at least one review round must run).
pub const MIN_MAX_ROUNDS: u32 = 1;

/// Maximum valid max_rounds value.
pub const MAX_MAX_ROUNDS: u32 = 100;

/// Effective max_rounds floor while stress mode is on. The stress rejection
/// consumes round 1 unconditionally, so a single-round budget would leave no
/// round for a real review.
pub const MIN_STRESS_ROUNDS: u32 = 2;

impl GateConfig {
    /// Check if a threshold value is within the rubric scale.
    pub fn is_valid_threshold(value: u8) -> bool {
        value <= MAX_THRESHOLD
    }

    /// Check if a max_rounds value is within the accepted range.
    pub fn is_valid_max_rounds(value: u32) -> bool {
        (MIN_MAX_ROUNDS..=MAX_MAX_ROUNDS).contains(&value)
    }
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold: 7,
            max_rounds: 3,
            fail_open: true,
        }
    }
}

/// External scorer invocation configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScorerConfig {
    /// Scorer executable: a bare name resolved via PATH or an absolute path.
    pub path: String,
    /// Model override passed to the scorer as `-m <model>`.
    pub model: Option<String>,
    /// Wall-clock budget for a single scorer invocation.
    pub timeout_seconds: u64,
    /// Custom rubric text. Empty means the built-in rubric.
    pub rubric: String,
    /// Free-text project context appended to the evaluation prompt.
    pub context: String,
}

/// Minimum valid timeout value in seconds.
pub const MIN_TIMEOUT_SECONDS: u64 = 1;

/// Maximum valid timeout value in seconds.
pub const MAX_TIMEOUT_SECONDS: u64 = 600;

/// Built-in scoring rubric, used when no custom rubric is configured.
pub const DEFAULT_RUBRIC: &str = "\
Score the plan on these 5 criteria (0-2 each, 10 max):

1. **Completeness** (0-2): Does the plan address all stated requirements? Are there gaps?
2. **Correctness** (0-2): Is the technical approach sound? Any flaws or misunderstandings?
3. **Sequencing** (0-2): Are steps ordered logically? Are dependencies respected?
4. **Risk Awareness** (0-2): Does the plan identify edge cases, failure modes, or risks?
5. **Clarity** (0-2): Are steps specific and actionable? Could a developer follow them?

The overall score MUST equal the sum of the 5 breakdown scores.
Be strict: a score of 7+ means the plan is ready to execute as-is.";

impl ScorerConfig {
    /// Check if a timeout value is within the accepted range.
    pub fn is_valid_timeout(value: u64) -> bool {
        (MIN_TIMEOUT_SECONDS..=MAX_TIMEOUT_SECONDS).contains(&value)
    }

    /// Check if a scorer path is free of parent-directory traversal.
    pub fn is_valid_path(value: &str) -> bool {
        !Path::new(value)
            .components()
            .any(|c| matches!(c, Component::ParentDir))
    }

    /// Effective rubric text: the configured override or the built-in rubric.
    pub fn rubric_text(&self) -> &str {
        if self.rubric.is_empty() {
            DEFAULT_RUBRIC
        } else {
            &self.rubric
        }
    }
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            path: "codex".to_string(),
            model: None,
            timeout_seconds: 90,
            rubric: String::new(),
            context: String::new(),
        }
    }
}

/// Stress-test mode configuration.
///
/// When enabled, the first plan of every session is rejected without
/// invoking the scorer, forcing one unconditional deep-revision pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StressConfig {
    /// Reject the first plan of each session without invoking the scorer.
    pub enabled: bool,
    /// Feedback text for the stress rejection. Empty means the built-in
    /// prompt.
    pub prompt: String,
}

/// Built-in stress-test rejection prompt, used when no custom prompt is
/// configured.
pub const DEFAULT_STRESS_PROMPT: &str = "\
Before this plan goes to review, stress-test it yourself:

- Challenge every assumption: what breaks if a dependency, API, or data shape is not what you expect?
- Walk each step as if executing it: name the files you would touch and what could go wrong in each.
- Look for missing error handling, rollback paths, and edge cases.
- Cut anything speculative; tighten anything vague.

Revise the plan to survive that scrutiny, then resubmit.";

impl StressConfig {
    /// Effective stress prompt: the configured text or the built-in prompt.
    pub fn prompt_text(&self) -> &str {
        if self.prompt.is_empty() {
            DEFAULT_STRESS_PROMPT
        } else {
            &self.prompt
        }
    }
}

/// Plan detection heuristics configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DetectionConfig {
    /// Heuristic score a text must reach to be treated as a plan.
    pub min_score: u32,
}

/// Minimum valid detection score.
pub const MIN_DETECTION_SCORE: u32 = 1;

/// Maximum valid detection score (the detector's weights cannot sum higher).
pub const MAX_DETECTION_SCORE: u32 = 20;

impl DetectionConfig {
    /// Check if a min_score value is within the detector's weight range.
    pub fn is_valid_min_score(value: u32) -> bool {
        (MIN_DETECTION_SCORE..=MAX_DETECTION_SCORE).contains(&value)
    }
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self { min_score: 6 }
    }
}

/// Diagnostic output configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Emit diagnostic logging to stderr.
    pub verbose: bool,
}

impl Config {
    /// Load configuration with full precedence chain.
    ///
    /// Precedence (highest to lowest):
    /// 1. Environment variables
    /// 2. Project config (`.plangate/config.toml` at the project root)
    /// 3. User config (`~/.plangate/config.toml`)
    /// 4. Defaults
    pub fn load() -> Self {
        // Fail-open: if cwd is unavailable, return defaults with env overrides
        // rather than trying path operations with an empty PathBuf
        match env::current_dir() {
            Ok(cwd) => Self::load_from_cwd(&cwd),
            Err(_) => {
                let mut config = Config::default();
                // Still apply user config and env overrides
                if let Some(user_config) = Self::load_user_config() {
                    config = config.merge(user_config);
                }
                config.apply_env_overrides();
                config.validate();
                config
            }
        }
    }

    /// Load configuration with a specific working directory.
    pub fn load_from_cwd(cwd: &Path) -> Self {
        // Start with defaults
        let mut config = Config::default();

        // Layer 4 → 3: Apply user config
        if let Some(user_config) = Self::load_user_config() {
            config = config.merge(user_config);
        }

        // Layer 3 → 2: Apply project config
        if let Some(project_config) = Self::load_project_config(cwd) {
            config = config.merge(project_config);
        }

        // Layer 2 → 1: Apply environment variables
        config.apply_env_overrides();

        // Clamp whatever the layers produced
        config.validate();

        config
    }

    /// Load config with fail-open behavior.
    ///
    /// Loading already degrades to defaults internally at every layer, so
    /// this is the entry point hooks use.
    pub fn load_fail_open() -> Self {
        Self::load()
    }

    /// Load user config from `~/.plangate/config.toml`.
    fn load_user_config() -> Option<Config> {
        let home = plangate_home()?;
        let config_path = home.join("config.toml");
        Self::load_from_file(&config_path).ok()
    }

    /// Load project config from `<project root>/.plangate/config.toml`.
    fn load_project_config(cwd: &Path) -> Option<Config> {
        let config_path = project_plangate_dir(cwd).join("config.toml");
        Self::load_from_file(&config_path).ok()
    }

    /// Load config from a specific file path.
    fn load_from_file(path: &Path) -> Result<Config> {
        let content = fs::read_to_string(path).map_err(|e| PlangateError::storage(path, e))?;
        toml::from_str(&content).map_err(|e| PlangateError::config(e.to_string()))
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self) {
        // PLANGATE_ENABLED
        if let Ok(val) = env::var("PLANGATE_ENABLED") {
            match parse_bool(&val) {
                Some(b) => self.gate.enabled = b,
                None => eprintln!(
                    "Warning: Invalid PLANGATE_ENABLED value '{}'. \
                    Expected true/false, 1/0, yes/no, or on/off. Using default '{}'.",
                    val, self.gate.enabled
                ),
            }
        }

        // PLANGATE_THRESHOLD
        if let Ok(val) = env::var("PLANGATE_THRESHOLD") {
            match val.parse::<u8>() {
                Ok(n) => self.gate.threshold = n,
                Err(_) => eprintln!(
                    "Warning: Invalid PLANGATE_THRESHOLD value '{}'. \
                    Expected an integer between 0 and {}. Using default '{}'.",
                    val, MAX_THRESHOLD, self.gate.threshold
                ),
            }
        }

        // PLANGATE_MAX_ROUNDS
        if let Ok(val) = env::var("PLANGATE_MAX_ROUNDS") {
            match val.parse::<u32>() {
                Ok(n) => self.gate.max_rounds = n,
                Err(_) => eprintln!(
                    "Warning: Invalid PLANGATE_MAX_ROUNDS value '{}'. \
                    Expected a positive integer. Using default '{}'.",
                    val, self.gate.max_rounds
                ),
            }
        }

        // PLANGATE_MODEL (empty clears the override)
        if let Ok(val) = env::var("PLANGATE_MODEL") {
            self.scorer.model = if val.is_empty() { None } else { Some(val) };
        }

        // PLANGATE_FAIL_OPEN
        if let Ok(val) = env::var("PLANGATE_FAIL_OPEN") {
            match parse_bool(&val) {
                Some(b) => self.gate.fail_open = b,
                None => eprintln!(
                    "Warning: Invalid PLANGATE_FAIL_OPEN value '{}'. \
                    Expected true/false, 1/0, yes/no, or on/off. Using default '{}'.",
                    val, self.gate.fail_open
                ),
            }
        }

        // PLANGATE_RUBRIC (empty keeps the built-in rubric)
        if let Ok(val) = env::var("PLANGATE_RUBRIC") {
            self.scorer.rubric = val;
        }

        // PLANGATE_SCORER_PATH (traversal check happens in validate)
        if let Ok(val) = env::var("PLANGATE_SCORER_PATH") {
            self.scorer.path = val;
        }

        // PLANGATE_VERBOSE
        if let Ok(val) = env::var("PLANGATE_VERBOSE") {
            match parse_bool(&val) {
                Some(b) => self.debug.verbose = b,
                None => eprintln!(
                    "Warning: Invalid PLANGATE_VERBOSE value '{}'. \
                    Expected true/false, 1/0, yes/no, or on/off. Using default '{}'.",
                    val, self.debug.verbose
                ),
            }
        }

        // PLANGATE_TIMEOUT_SECONDS
        if let Ok(val) = env::var("PLANGATE_TIMEOUT_SECONDS") {
            match val.parse::<u64>() {
                Ok(n) => self.scorer.timeout_seconds = n,
                Err(_) => eprintln!(
                    "Warning: Invalid PLANGATE_TIMEOUT_SECONDS value '{}'. \
                    Expected a positive integer. Using default '{}'.",
                    val, self.scorer.timeout_seconds
                ),
            }
        }

        // PLANGATE_STRESS_TEST
        if let Ok(val) = env::var("PLANGATE_STRESS_TEST") {
            match parse_bool(&val) {
                Some(b) => self.stress.enabled = b,
                None => eprintln!(
                    "Warning: Invalid PLANGATE_STRESS_TEST value '{}'. \
                    Expected true/false, 1/0, yes/no, or on/off. Using default '{}'.",
                    val, self.stress.enabled
                ),
            }
        }

        // PLANGATE_STRESS_TEST_PROMPT (empty keeps the built-in prompt)
        if let Ok(val) = env::var("PLANGATE_STRESS_TEST_PROMPT") {
            self.stress.prompt = val;
        }

        // PLANGATE_CONTEXT
        if let Ok(val) = env::var("PLANGATE_CONTEXT") {
            self.scorer.context = val;
        }
    }

    /// Clamp out-of-range values after all layers are applied.
    ///
    /// Resolution is total: any combination of malformed sources still
    /// yields a usable config, never an abort.
    fn validate(&mut self) {
        if !GateConfig::is_valid_threshold(self.gate.threshold) {
            tracing::warn!(
                "gate.threshold {} above maximum, clamping to {}",
                self.gate.threshold,
                MAX_THRESHOLD
            );
            self.gate.threshold = MAX_THRESHOLD;
        }

        if !GateConfig::is_valid_max_rounds(self.gate.max_rounds) {
            let clamped = self.gate.max_rounds.clamp(MIN_MAX_ROUNDS, MAX_MAX_ROUNDS);
            tracing::warn!(
                "gate.max_rounds {} out of range, clamping to {}",
                self.gate.max_rounds,
                clamped
            );
            self.gate.max_rounds = clamped;
        }

        if !ScorerConfig::is_valid_timeout(self.scorer.timeout_seconds) {
            let clamped = self
                .scorer
                .timeout_seconds
                .clamp(MIN_TIMEOUT_SECONDS, MAX_TIMEOUT_SECONDS);
            tracing::warn!(
                "scorer.timeout_seconds {} out of range, clamping to {}",
                self.scorer.timeout_seconds,
                clamped
            );
            self.scorer.timeout_seconds = clamped;
        }

        if !ScorerConfig::is_valid_path(&self.scorer.path) {
            let default_path = ScorerConfig::default().path;
            tracing::warn!(
                "scorer.path '{}' contains a parent-directory segment, using default '{}'",
                self.scorer.path,
                default_path
            );
            self.scorer.path = default_path;
        }

        if !DetectionConfig::is_valid_min_score(self.detection.min_score) {
            let clamped = self
                .detection
                .min_score
                .clamp(MIN_DETECTION_SCORE, MAX_DETECTION_SCORE);
            tracing::warn!(
                "detection.min_score {} out of range, clamping to {}",
                self.detection.min_score,
                clamped
            );
            self.detection.min_score = clamped;
        }

        // The stress rejection consumes round 1 unconditionally; the revised
        // plan must still get a scored round before escalation.
        if self.stress.enabled && self.gate.max_rounds < MIN_STRESS_ROUNDS {
            tracing::warn!(
                "stress mode with gate.max_rounds {}, raising to {}",
                self.gate.max_rounds,
                MIN_STRESS_ROUNDS
            );
            self.gate.max_rounds = MIN_STRESS_ROUNDS;
        }
    }

    /// Merge another config into this one.
    ///
    /// The `other` config takes precedence. All non-default fields from
    /// `other` are applied to `self`, enabling proper layering of the
    /// precedence chain. Merging is field-by-field, not section-by-section,
    /// so explicit defaults in one file do not block overrides from another.
    ///
    /// # Limitation
    ///
    /// A later layer cannot explicitly set a field back to its default to
    /// mask a customized value from an earlier layer; distinguishing "not
    /// set" from "set to the default" would require `Option<T>` for every
    /// field. Each layer only needs to state its customizations.
    fn merge(mut self, other: Config) -> Self {
        // Gate: merge field by field
        let default_gate = GateConfig::default();
        if other.gate.enabled != default_gate.enabled {
            self.gate.enabled = other.gate.enabled;
        }
        if other.gate.threshold != default_gate.threshold {
            self.gate.threshold = other.gate.threshold;
        }
        if other.gate.max_rounds != default_gate.max_rounds {
            self.gate.max_rounds = other.gate.max_rounds;
        }
        if other.gate.fail_open != default_gate.fail_open {
            self.gate.fail_open = other.gate.fail_open;
        }

        // Scorer: merge field by field
        let default_scorer = ScorerConfig::default();
        if other.scorer.path != default_scorer.path {
            self.scorer.path = other.scorer.path;
        }
        if other.scorer.model.is_some() {
            self.scorer.model = other.scorer.model;
        }
        if other.scorer.timeout_seconds != default_scorer.timeout_seconds {
            self.scorer.timeout_seconds = other.scorer.timeout_seconds;
        }
        if other.scorer.rubric != default_scorer.rubric {
            self.scorer.rubric = other.scorer.rubric;
        }
        if other.scorer.context != default_scorer.context {
            self.scorer.context = other.scorer.context;
        }

        // Stress: merge field by field
        let default_stress = StressConfig::default();
        if other.stress.enabled != default_stress.enabled {
            self.stress.enabled = other.stress.enabled;
        }
        if other.stress.prompt != default_stress.prompt {
            self.stress.prompt = other.stress.prompt;
        }

        // Detection
        if other.detection.min_score != DetectionConfig::default().min_score {
            self.detection.min_score = other.detection.min_score;
        }

        // Debug
        if other.debug.verbose != DebugConfig::default().verbose {
            self.debug.verbose = other.debug.verbose;
        }

        self
    }

    /// Save configuration to the project config file.
    ///
    /// Writes to `.plangate/config.toml` in the given directory.
    /// Creates the `.plangate` directory if it doesn't exist.
    /// Uses atomic write (write to temp file, then rename) for safety.
    pub fn save_project(&self, cwd: &Path) -> Result<()> {
        let plangate_dir = cwd.join(".plangate");

        if !plangate_dir.exists() {
            fs::create_dir_all(&plangate_dir)
                .map_err(|e| PlangateError::storage(&plangate_dir, e))?;
        }

        let config_path = plangate_dir.join("config.toml");

        let content =
            toml::to_string_pretty(self).map_err(|e| PlangateError::config(e.to_string()))?;

        // Atomic write: write to temp file, then rename
        let temp_path = plangate_dir.join(".config.toml.tmp");
        fs::write(&temp_path, &content).map_err(|e| PlangateError::storage(&temp_path, e))?;

        let file = fs::File::open(&temp_path).map_err(|e| PlangateError::storage(&temp_path, e))?;
        file.sync_all()
            .map_err(|e| PlangateError::storage(&temp_path, e))?;
        drop(file);

        fs::rename(&temp_path, &config_path)
            .map_err(|e| PlangateError::storage(&config_path, e))?;

        Ok(())
    }
}

/// Parse a boolean from the common environment variable spellings.
///
/// Accepts truthy `true`/`1`/`yes`/`on` and falsy `false`/`0`/`no`/`off`,
/// case-insensitive. Returns `None` for anything else.
fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Get the Plangate home directory.
///
/// Checks the `PLANGATE_HOME` environment variable first, then falls back
/// to `~/.plangate`.
///
/// # Validation
///
/// If `PLANGATE_HOME` is set, it must be:
/// - Non-empty
/// - An absolute path (or we canonicalize it)
///
/// Invalid values are ignored and we fall back to the default.
pub fn plangate_home() -> Option<PathBuf> {
    if let Ok(home) = env::var("PLANGATE_HOME") {
        if home.is_empty() {
            tracing::warn!("PLANGATE_HOME is empty, using default");
        } else {
            let path = PathBuf::from(&home);
            if path.is_absolute() {
                return Some(path);
            }
            // For relative paths, try to canonicalize
            if let Ok(canonical) = path.canonicalize() {
                return Some(canonical);
            }
            tracing::warn!("PLANGATE_HOME is relative and doesn't exist, using as-is");
            return Some(path);
        }
    }

    if let Some(home) = dirs::home_dir() {
        return Some(home.join(".plangate"));
    }

    // Fallback for containerized/minimal environments without HOME
    let fallback_path = fallback_plangate_home();
    tracing::warn!(
        "HOME not set, using fallback location: {}",
        fallback_path.display()
    );
    Some(fallback_path)
}

/// Get fallback plangate home path when HOME is unavailable.
#[cfg(unix)]
fn fallback_plangate_home() -> PathBuf {
    use std::os::unix::fs::MetadataExt;
    // Get UID for unique temp directory
    let uid = std::fs::metadata("/").map(|m| m.uid()).unwrap_or(0);
    PathBuf::from(format!("/tmp/plangate-{}", uid))
}

/// Get fallback plangate home path when HOME is unavailable.
#[cfg(not(unix))]
fn fallback_plangate_home() -> PathBuf {
    std::env::temp_dir().join("plangate")
}

/// Find the project root for a given working directory.
///
/// Walks up the directory tree with the following precedence:
///
/// 1. **Existing `.plangate/` directory** - the first ancestor holding one
///    wins, allowing explicit placement of the project config.
/// 2. **Git repository root** - via `git rev-parse --show-toplevel`, which
///    handles worktrees and submodules.
/// 3. **Fallback to cwd** - when neither exists (not a git repo, or git is
///    not installed).
pub fn find_project_root(cwd: &Path) -> PathBuf {
    // 1. Walk up looking for an existing .plangate/ (explicit placement wins)
    for ancestor in cwd.ancestors() {
        if ancestor.join(".plangate").is_dir() {
            return ancestor.to_path_buf();
        }
    }

    // 2. Ask git for the repo root
    if let Ok(output) = std::process::Command::new("git")
        .args(["rev-parse", "--show-toplevel"])
        .current_dir(cwd)
        .output()
    {
        if output.status.success() {
            if let Ok(path) = String::from_utf8(output.stdout) {
                let trimmed = path.trim();
                if !trimmed.is_empty() {
                    return PathBuf::from(trimmed);
                }
            }
        }
    }

    // 3. Fall back to cwd
    cwd.to_path_buf()
}

/// Get the sessions directory.
///
/// Returns `<plangate_home>/sessions/`.
pub fn sessions_dir() -> Option<PathBuf> {
    plangate_home().map(|h| h.join("sessions"))
}

/// Get the scorer output schema path.
///
/// Returns `<plangate_home>/scorer_schema.json`.
pub fn scorer_schema_path() -> Option<PathBuf> {
    plangate_home().map(|h| h.join("scorer_schema.json"))
}

/// Get the project plangate directory for a given working directory.
///
/// Finds the project root first (existing `.plangate/` or the git repo
/// root), then returns its `.plangate/` subdirectory. See
/// [`find_project_root`].
pub fn project_plangate_dir(cwd: &Path) -> PathBuf {
    find_project_root(cwd).join(".plangate")
}
