//! Hook runner for Plangate.
//!
//! Dispatches Claude Code hook events to their handlers. Handlers are
//! fail-open by construction: malformed input, storage trouble, and
//! missing session state all resolve to an approval rather than a
//! broken agent session. Only a gate verdict blocks.
//!
//! Event roles:
//! - **PreToolUse** is the primary review path, firing on ExitPlanMode
//!   with the plan file (or inline plan) the agent is presenting.
//! - **PostToolUse** is a lightweight tracker that records which plan
//!   file the session wrote.
//! - **Stop** is the secondary path, catching plan-shaped text
//!   presented outside plan mode via the transcript tail.

use std::io::{self, Read};
use std::path::Path;

use crate::config::Config;
use crate::core::{Gate, SessionState, Verdict};
use crate::error::FailOpen;
use crate::hooks::input::{parse_input, PostToolUseInput, PreToolUseInput, StopInput};
use crate::hooks::output::{build_response, HookResponse};
use crate::plan::{self, DiscoveredPlan, PlanSource};
use crate::scorer::Scorer;
use crate::storage::SessionStore;
use crate::util::MAX_FILE_SIZE;

/// Hook type enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookType {
    /// Pre-tool-use hook (ExitPlanMode interception).
    PreToolUse,
    /// Post-tool-use hook (plan file tracking).
    PostToolUse,
    /// Stop hook (inline plan interception).
    Stop,
}

impl HookType {
    /// Parse hook type from string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pre-tool-use" | "pretooluse" | "pre_tool_use" => Some(Self::PreToolUse),
            "post-tool-use" | "posttooluse" | "post_tool_use" => Some(Self::PostToolUse),
            "stop" => Some(Self::Stop),
            _ => None,
        }
    }

    /// Canonical name, as used in `.claude/settings.json` wiring.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PreToolUse => "pre-tool-use",
            Self::PostToolUse => "post-tool-use",
            Self::Stop => "stop",
        }
    }
}

/// Hook runner context.
pub struct HookRunner<S: SessionStore, C: Scorer> {
    /// Session storage.
    store: S,
    /// Plan scorer.
    scorer: C,
    /// Configuration.
    config: Config,
}

impl<S: SessionStore, C: Scorer> HookRunner<S, C> {
    /// Create a new hook runner.
    pub fn new(store: S, scorer: C, config: Config) -> Self {
        Self {
            store,
            scorer,
            config,
        }
    }

    /// Run a hook with input from stdin.
    pub fn run(&self, hook_type: HookType) -> HookResponse {
        let input = read_stdin();
        self.run_with_input(hook_type, &input)
    }

    /// Run a hook with provided input.
    pub fn run_with_input(&self, hook_type: HookType, input: &str) -> HookResponse {
        match hook_type {
            HookType::PreToolUse => self.handle_pre_tool_use(input),
            HookType::PostToolUse => self.handle_post_tool_use(input),
            HookType::Stop => self.handle_stop(input),
        }
    }

    // =========================================================================
    // Pre-Tool-Use Handler
    // =========================================================================

    /// Handle the pre-tool-use hook.
    ///
    /// 1. Only ExitPlanMode is gated; every other tool is approved.
    /// 2. Locate the plan: tracked plan file first, then the plans
    ///    directory, then the inline `tool_input.plan`.
    /// 3. Inline candidates must look like a plan; plan files are
    ///    reviewed unconditionally.
    /// 4. Run the review and answer with its decision.
    fn handle_pre_tool_use(&self, input: &str) -> HookResponse {
        let hook_input: PreToolUseInput = match parse_input(input) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!(error = %e, "malformed hook input");
                return HookResponse::approve();
            }
        };

        if hook_input.tool_name != "ExitPlanMode" {
            return HookResponse::approve();
        }
        if !self.config.gate.enabled {
            tracing::debug!("gate disabled, allowing ExitPlanMode");
            return HookResponse::approve();
        }

        let session_id = &hook_input.common.session_id;
        let marker = self
            .store
            .plan_marker(session_id)
            .fail_open_default("reading plan marker");
        let discovered = plan::find_plan_file(marker.as_deref(), Some(&hook_input.common.cwd))
            .or_else(|| {
                hook_input
                    .plan_text()
                    .filter(|text| !text.trim().is_empty())
                    .map(DiscoveredPlan::from_tool_input)
            });

        let Some(candidate) = discovered else {
            tracing::debug!("no plan text found, allowing ExitPlanMode");
            return HookResponse::approve();
        };

        // A file under .claude/plans/ is a plan by construction; inline
        // text is gated by the detector.
        if candidate.source != PlanSource::PlanFile {
            let detection = plan::detect(
                &candidate.text,
                hook_input.common.permission_mode.as_deref(),
            );
            if !detection.is_plan(self.config.detection.min_score) {
                tracing::debug!(signals = %detection.describe(), "not plan-shaped, allowing");
                return HookResponse::approve();
            }
        }

        self.review(session_id, &candidate)
    }

    // =========================================================================
    // Post-Tool-Use Handler
    // =========================================================================

    /// Handle the post-tool-use hook.
    ///
    /// Records the path of plan files written under `.claude/plans/` so
    /// the pre-tool-use hook knows which file to review. Never blocks,
    /// never evaluates.
    fn handle_post_tool_use(&self, input: &str) -> HookResponse {
        let hook_input: PostToolUseInput = match parse_input(input) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::debug!(error = %e, "malformed hook input");
                return HookResponse::approve();
            }
        };

        if hook_input.tool_name != "Write" && hook_input.tool_name != "Edit" {
            return HookResponse::approve();
        }
        let Some(file_path) = hook_input.file_path() else {
            return HookResponse::approve();
        };
        if !plan::is_plan_file_path(file_path) {
            return HookResponse::approve();
        }

        if let Err(e) = self
            .store
            .record_plan_marker(&hook_input.common.session_id, Path::new(file_path))
        {
            tracing::warn!(error = %e, "failed to record plan marker");
        } else {
            tracing::debug!(path = file_path, "plan file tracked");
        }

        HookResponse::approve()
    }

    // =========================================================================
    // Stop Handler
    // =========================================================================

    /// Handle the stop hook.
    ///
    /// 1. Skip when another stop hook already continued this turn.
    /// 2. Take the assistant's final message (input field, else
    ///    transcript tail).
    /// 3. Stay out of sessions owned by a live plan-file review.
    /// 4. Skip content scored within the last minute.
    /// 5. Review only text the detector considers plan-shaped.
    fn handle_stop(&self, input: &str) -> HookResponse {
        let hook_input: StopInput = match parse_input(input) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!(error = %e, "malformed hook input");
                return HookResponse::approve();
            }
        };

        // Loop guard
        if hook_input.stop_hook_active {
            return HookResponse::approve();
        }
        if !self.config.gate.enabled {
            tracing::debug!("gate disabled, allowing stop");
            return HookResponse::approve();
        }

        let session_id = &hook_input.common.session_id;

        let text = hook_input
            .last_assistant_message
            .clone()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| plan::last_assistant_text(&hook_input.common.transcript_path));
        if text.trim().is_empty() {
            tracing::debug!("no assistant text to review");
            return HookResponse::approve();
        }

        // A live plan-file review owns this session; ExitPlanMode is
        // its boundary, not the turn end.
        let plan_file_review = self
            .store
            .get(session_id)
            .fail_open_default("loading session state")
            .and_then(|state| state.plan_identity)
            .is_some_and(|identity| identity.path.is_some());
        if plan_file_review {
            tracing::debug!("plan-file review active, skipping stop hook");
            return HookResponse::approve();
        }

        let hash = plan::content_hash(&text);
        if self
            .store
            .recently_evaluated(session_id, &hash)
            .fail_open_default("checking recent evaluation")
        {
            tracing::debug!("content recently scored, skipping stop hook");
            return HookResponse::approve();
        }

        let detection = plan::detect(&text, hook_input.common.permission_mode.as_deref());
        if !detection.is_plan(self.config.detection.min_score) {
            tracing::debug!(
                score = detection.score,
                "transcript tail not plan-shaped"
            );
            return HookResponse::approve();
        }
        tracing::debug!(signals = %detection.describe(), "plan-shaped text at turn end");

        self.review(session_id, &DiscoveredPlan::from_transcript(text))
    }

    // =========================================================================
    // Review
    // =========================================================================

    /// Run the gate over a discovered plan and persist the outcome.
    fn review(&self, session_id: &str, candidate: &DiscoveredPlan) -> HookResponse {
        let mut state = self
            .store
            .get(session_id)
            .fail_open_default("loading session state")
            .unwrap_or_else(|| SessionState::new(session_id));

        let decision = Gate::new(&mut state, &self.config, &self.scorer)
            .review(&candidate.text, candidate.identity());

        tracing::info!(
            source = candidate.source.as_str(),
            verdict = ?decision.verdict,
            round = decision.round,
            score = ?decision.score,
            "plan reviewed"
        );

        // Scored rounds mark the content so the stop hook does not
        // review it again right away.
        if decision.score.is_some() || decision.verdict == Verdict::StressReject {
            let hash = plan::content_hash(&candidate.text);
            self.store
                .mark_evaluated(session_id, &hash)
                .fail_open_default("recording evaluation marker");
        }

        if decision.clears_session() {
            self.store
                .delete(session_id)
                .fail_open_default("clearing session state");
        } else {
            self.store.put(&state).fail_open_default("saving session");
        }

        build_response(&decision)
    }
}

/// Read hook input from stdin, capped. A read failure is treated as
/// empty input; the handlers fail open from there.
fn read_stdin() -> String {
    let mut input = String::new();
    if let Err(e) = io::stdin().take(MAX_FILE_SIZE).read_to_string(&mut input) {
        tracing::warn!(error = %e, "failed to read hook input");
    }
    input
}
