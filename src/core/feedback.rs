//! Feedback rendering for review decisions.
//!
//! Pure text builders: an evaluation result plus round bookkeeping goes
//! in, the markdown delivered back to the agent (or the short status
//! line shown to the user) comes out. Nothing here touches state.

use crate::scorer::EvaluationResult;

/// How many strengths an approval message quotes back.
const APPROVAL_STRENGTHS_SHOWN: usize = 3;

/// Render rejection feedback for the agent.
///
/// The first round gets a mandatory-review header regardless of score;
/// later rounds show the score against the threshold and, when a prior
/// score exists, how the plan moved since the last round.
pub fn render_feedback(
    result: &EvaluationResult,
    threshold: u8,
    round: u32,
    max_rounds: u32,
    first_round: bool,
    previous_score: Option<u8>,
) -> String {
    let score = result.total;
    let mut lines: Vec<String> = Vec::new();

    if first_round {
        lines.push(format!(
            "**First-round review**: your plan scored **{score}/10**. Round 1/{max_rounds}."
        ));
    } else {
        lines.push(format!(
            "Your plan scored **{score}/10** (needs {threshold}). Round {round}/{max_rounds}."
        ));
        if let Some(previous) = previous_score {
            lines.push(movement_line(previous, score));
        }
    }

    lines.push(String::new());
    lines.push(format!(
        "**Breakdown**: completeness={}/2, correctness={}/2, sequencing={}/2, \
        risk_awareness={}/2, clarity={}/2",
        result.scores.completeness,
        result.scores.correctness,
        result.scores.sequencing,
        result.scores.risk_awareness,
        result.scores.clarity,
    ));

    push_section(&mut lines, "**Strengths:**", &result.strengths);
    push_section(&mut lines, "**Issues:**", &result.issues);
    push_section(&mut lines, "**Suggestions:**", &result.suggestions);

    lines.push(String::new());
    lines.push(
        if first_round {
            "Revise your plan and resubmit."
        } else {
            "Revise your plan addressing these issues."
        }
        .to_string(),
    );

    lines.join("\n")
}

/// Render the approval message for a passing plan.
pub fn render_approval(result: &EvaluationResult) -> String {
    let mut lines = vec![format!("Plan approved (score: {}/10).", result.total)];

    if !result.strengths.is_empty() {
        lines.push(String::new());
        lines.push("**Strengths:**".to_string());
        for strength in result.strengths.iter().take(APPROVAL_STRENGTHS_SHOWN) {
            lines.push(format!("- {strength}"));
        }
    }

    lines.join("\n")
}

/// Render the warning shown when the round budget runs out and the
/// decision is handed back to the user.
pub fn render_escalation(last_score: Option<u8>, max_rounds: u32) -> String {
    let score = last_score.map_or_else(|| "?".to_string(), |s| s.to_string());
    format!(
        "Max evaluation rounds ({max_rounds}) reached. Last score was {score}/10. \
        The plan has not met the quality threshold after multiple revisions; \
        review it before proceeding."
    )
}

fn movement_line(previous: u8, current: u8) -> String {
    let direction = if current > previous {
        format!("up {}", current - previous)
    } else if current < previous {
        format!("down {}", previous - current)
    } else {
        "no change".to_string()
    };
    format!("**Previous round**: {previous}/10 ({direction}).")
}

fn push_section(lines: &mut Vec<String>, header: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    lines.push(String::new());
    lines.push(header.to_string());
    for item in items {
        lines.push(format!("- {item}"));
    }
}
