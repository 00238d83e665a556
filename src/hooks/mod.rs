//! Hook integration for Claude Code.
//!
//! This module provides types and handlers for the three hook events
//! Plangate wires into a session:
//!
//! - **pre-tool-use**: ExitPlanMode interception, the primary review path
//! - **post-tool-use**: plan file tracking
//! - **stop**: turn-end interception for plans presented outside plan mode

pub mod input;
pub mod output;
pub mod runner;

pub use input::{parse_input, HookInput, PostToolUseInput, PreToolUseInput, StopInput};
pub use output::{build_response, to_json, HookDecision, HookResponse};
pub use runner::{HookRunner, HookType};
