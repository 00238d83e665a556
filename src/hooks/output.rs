//! Hook output types for Claude Code integration.
//!
//! All three hook events answer with the same JSON shape: an optional
//! `"block"` decision with its agent-facing reason, plus an optional
//! `systemMessage` shown to the user. An empty response means
//! "continue unchanged". The exit code carries the verdict as well:
//! blocking responses exit with [`exit_codes::BLOCK`], everything else
//! with [`exit_codes::APPROVE`].

use serde::{Deserialize, Serialize};

use crate::core::{Decision, Verdict};
use crate::error::exit_codes;

/// The only non-default hook decision Claude Code understands.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HookDecision {
    /// Reject the action; the reason is fed back to the agent.
    Block,
}

/// JSON payload returned to Claude Code on stdout.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct HookResponse {
    /// Present only when blocking.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision: Option<HookDecision>,
    /// Agent-facing feedback; delivered to the model on block.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// User-facing note, rendered in the session transcript.
    #[serde(rename = "systemMessage", skip_serializing_if = "Option::is_none")]
    pub system_message: Option<String>,
}

impl HookResponse {
    /// Approve with no output at all.
    pub fn approve() -> Self {
        Self::default()
    }

    /// Approve, surfacing a note to the user.
    pub fn approve_with_message(message: impl Into<String>) -> Self {
        Self {
            decision: None,
            reason: None,
            system_message: Some(message.into()),
        }
    }

    /// Block with agent-facing feedback.
    pub fn block(reason: impl Into<String>) -> Self {
        Self {
            decision: Some(HookDecision::Block),
            reason: Some(reason.into()),
            system_message: None,
        }
    }

    /// Block with agent-facing feedback and a user-facing note.
    pub fn block_with_message(
        reason: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            decision: Some(HookDecision::Block),
            reason: Some(reason.into()),
            system_message: Some(message.into()),
        }
    }

    /// Check whether this response blocks the hooked action.
    pub fn is_blocking(&self) -> bool {
        self.decision.is_some()
    }

    /// Check whether serializing this response would carry no fields.
    /// Empty responses are not printed at all.
    pub fn is_empty(&self) -> bool {
        self.decision.is_none() && self.reason.is_none() && self.system_message.is_none()
    }

    /// Process exit code matching the payload.
    pub fn exit_code(&self) -> i32 {
        if self.is_blocking() {
            exit_codes::BLOCK
        } else {
            exit_codes::APPROVE
        }
    }
}

/// Map a gate decision onto the hook protocol.
///
/// Pass and escalation both let the action proceed; escalation differs
/// only in the warning it surfaces. Rejections block with the rendered
/// feedback as the reason.
pub fn build_response(decision: &Decision) -> HookResponse {
    match decision.verdict {
        Verdict::Pass | Verdict::Escalate => HookResponse {
            decision: None,
            reason: None,
            system_message: decision.note.clone(),
        },
        Verdict::Reject | Verdict::StressReject => HookResponse {
            decision: Some(HookDecision::Block),
            reason: decision.feedback.clone(),
            system_message: decision.note.clone(),
        },
    }
}

/// Serialize a response to JSON.
pub fn to_json<T: Serialize>(output: &T) -> crate::error::Result<String> {
    serde_json::to_string(output).map_err(|e| {
        crate::error::PlangateError::serde(format!("Failed to serialize hook output: {}", e))
    })
}
