//! Plangate - Plan Review Gate for Claude Code
//!
//! Plangate intercepts implementation plans at hook boundaries, scores
//! them with an external oracle CLI, and blocks weak plans with
//! actionable feedback across a bounded number of review rounds.

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod hooks;
pub mod plan;
pub mod scorer;
pub mod storage;
pub mod util;

pub use config::Config;
pub use core::{Decision, Gate, PlanIdentity, ReviewStatus, SessionState, Verdict};
pub use error::{PlangateError, Result};
pub use hooks::{HookResponse, HookRunner, HookType};
pub use plan::{detect, find_plan_file, DiscoveredPlan};
pub use scorer::{CliScorer, EvaluationResult, Scorer, ScorerFailure};
pub use storage::{FileSessionStore, MemorySessionStore, SessionStore};

// CLI commands
pub use cli::{ClearCommand, ConfigCommand, InitCommand, SessionsCommand};
