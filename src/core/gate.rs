//! Round decision engine for Plangate.
//!
//! The gate drives a plan through bounded review rounds: a mandatory
//! first-round review, scored threshold checks on revisions, and a
//! hand-off to the user once the round budget runs out. It applies the
//! decision rules only. Staleness is resolved by the session store
//! before state reaches the gate, and the caller persists or deletes
//! the mutated state afterwards based on the returned decision.

use crate::config::Config;
use crate::core::feedback;
use crate::core::state::{PlanIdentity, ReviewStatus, SessionState};
use crate::scorer::{EvaluationResult, Scorer, ScorerFailure};

/// Outcome category of a review round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Plan may proceed.
    Pass,
    /// Plan goes back to the agent with feedback.
    Reject,
    /// First plan rejected unconditionally by stress-test mode.
    StressReject,
    /// Round budget exhausted; the plan proceeds and the user decides.
    Escalate,
}

/// One review decision, ready for rendering into a hook response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    /// Outcome category.
    pub verdict: Verdict,
    /// Round this decision was made in (0 before any round has run).
    pub round: u32,
    /// Total score, when the oracle produced one.
    pub score: Option<u8>,
    /// Feedback delivered to the agent as the block reason.
    pub feedback: Option<String>,
    /// Short status line for the user.
    pub note: Option<String>,
}

impl Decision {
    /// Check if this decision blocks the plan.
    pub fn is_blocking(&self) -> bool {
        matches!(self.verdict, Verdict::Reject | Verdict::StressReject)
    }

    /// Check if this decision ends the review with a scored approval.
    ///
    /// A scored pass deletes the session record. A fail-open pass keeps
    /// it, so the consumed round survives to the next attempt.
    pub fn clears_session(&self) -> bool {
        self.verdict == Verdict::Pass && self.score.is_some()
    }
}

/// Round decision engine.
///
/// Applies the review rules in a fixed order against one session's
/// state: disabled pass-through, escalation short-circuit, round
/// accounting, stress-test rejection, mandatory first-round review,
/// threshold check, escalation on an exhausted budget, and the
/// fail-open policy on scorer failure.
#[derive(Debug)]
pub struct Gate<'a, S: Scorer> {
    state: &'a mut SessionState,
    config: &'a Config,
    scorer: &'a S,
}

impl<'a, S: Scorer> Gate<'a, S> {
    /// Create a gate over one session's state.
    pub fn new(state: &'a mut SessionState, config: &'a Config, scorer: &'a S) -> Self {
        Self {
            state,
            config,
            scorer,
        }
    }

    /// Review a presented plan and decide its fate.
    pub fn review(&mut self, plan_text: &str, identity: PlanIdentity) -> Decision {
        if !self.config.gate.enabled {
            return Decision {
                verdict: Verdict::Pass,
                round: self.state.round_count,
                score: None,
                feedback: None,
                note: None,
            };
        }

        // An escalated plan stays escalated: re-presenting it passes
        // through again without another oracle call. A different plan
        // starts over, and a stale session never reaches the gate.
        if self.state.status == ReviewStatus::Escalated
            && self.state.plan_identity.as_ref() == Some(&identity)
        {
            self.state.touch();
            return self.escalate(self.state.round_count, self.state.last_score);
        }

        self.state.advance_round(identity);
        let round = self.state.round_count;
        tracing::debug!("round {}/{}", round, self.config.gate.max_rounds);

        if self.config.stress.enabled && round == 1 {
            return self.stress_reject(round);
        }

        // Prior feedback reaches the oracle from round 2 on.
        let prior_feedback = if round >= 2 {
            self.state.last_feedback.clone()
        } else {
            None
        };

        match self.scorer.evaluate(plan_text, round, prior_feedback.as_deref()) {
            Ok(result) => self.scored(&result, round),
            Err(failure) => self.failed(&failure, round),
        }
    }

    /// First-round rejection in stress-test mode, no oracle call.
    /// The round still counts against the budget.
    fn stress_reject(&mut self, round: u32) -> Decision {
        let max_rounds = self.config.gate.max_rounds;
        let prompt = self.config.stress.prompt_text().to_string();
        self.state.record_feedback(None, prompt.clone());

        if round >= max_rounds {
            // Config validation keeps the budget at two or more rounds
            // while stress mode is on; a hand-built config can still
            // pair it with a single round, leaving nothing to review.
            return self.escalate(round, None);
        }

        tracing::debug!("stress-test mode: first plan rejected without evaluation");
        Decision {
            verdict: Verdict::StressReject,
            round,
            score: None,
            feedback: Some(prompt),
            note: Some(format!(
                "Plangate: Stress-test mode rejected the first plan for deep revision. \
                Round 1/{max_rounds}."
            )),
        }
    }

    /// Decide from an oracle verdict.
    fn scored(&mut self, result: &EvaluationResult, round: u32) -> Decision {
        let threshold = self.config.gate.threshold;
        let max_rounds = self.config.gate.max_rounds;
        let total = result.total;

        if round == 1 {
            // Mandatory review: the first round never passes on score.
            let feedback =
                feedback::render_feedback(result, threshold, round, max_rounds, true, None);
            self.state.record_feedback(Some(total), feedback.clone());
            tracing::debug!("first round: mandatory review ({}/10)", total);
            return Decision {
                verdict: Verdict::Reject,
                round,
                score: Some(total),
                feedback: Some(feedback),
                note: Some(format!(
                    "Plangate: First-round review ({total}/10). Revision required. \
                    Round 1/{max_rounds}."
                )),
            };
        }

        if total >= threshold {
            self.state.status = ReviewStatus::Passed;
            tracing::debug!("plan accepted: {}/10", total);
            return Decision {
                verdict: Verdict::Pass,
                round,
                score: Some(total),
                feedback: None,
                note: Some(format!("Plangate: {}", feedback::render_approval(result))),
            };
        }

        let previous_score = self.state.last_score;
        let feedback =
            feedback::render_feedback(result, threshold, round, max_rounds, false, previous_score);
        self.state.record_feedback(Some(total), feedback.clone());

        if round >= max_rounds {
            tracing::debug!("rejected {}/{} with no rounds left, deferring to user", total, threshold);
            return self.escalate(round, Some(total));
        }

        tracing::debug!("plan rejected: {}/{}", total, threshold);
        Decision {
            verdict: Verdict::Reject,
            round,
            score: Some(total),
            feedback: Some(feedback),
            note: Some(format!(
                "Plangate: Plan rejected ({total}/10, threshold {threshold}). \
                Round {round}/{max_rounds}."
            )),
        }
    }

    /// Hand the decision to the user and mark the session escalated.
    fn escalate(&mut self, round: u32, score: Option<u8>) -> Decision {
        self.state.status = ReviewStatus::Escalated;
        Decision {
            verdict: Verdict::Escalate,
            round,
            score,
            feedback: None,
            note: Some(format!(
                "Plangate: {}",
                feedback::render_escalation(score, self.config.gate.max_rounds)
            )),
        }
    }

    /// Apply the fail-open policy to a scorer failure. The failed
    /// attempt consumed its round slot; the score and feedback from the
    /// last completed round stay in place.
    fn failed(&self, failure: &ScorerFailure, round: u32) -> Decision {
        tracing::warn!("evaluation error on round {}: {}", round, failure);
        if self.config.gate.fail_open {
            Decision {
                verdict: Verdict::Pass,
                round,
                score: None,
                feedback: None,
                note: Some(format!(
                    "Plangate: Evaluation failed ({failure}). Passing through (fail-open)."
                )),
            }
        } else {
            // Never escalates: with fail-open off the gate does not
            // pass an unreviewed plan, however many rounds failed.
            Decision {
                verdict: Verdict::Reject,
                round,
                score: None,
                feedback: Some(format!(
                    "Plangate evaluation failed: {failure}. \
                    Set PLANGATE_FAIL_OPEN=true to pass through on errors."
                )),
                note: None,
            }
        }
    }
}
