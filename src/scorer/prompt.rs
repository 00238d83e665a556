//! Review prompt assembly for the oracle CLI.
//!
//! The prompt is deterministic given its inputs: reviewer framing, the
//! rubric, optional project context, the plan under review, and (from
//! round 2 on) the previous round's feedback so the oracle can judge
//! whether it was addressed.

/// Build the evaluation prompt for one scorer invocation.
///
/// `prior_feedback` must only be supplied for rounds >= 2; the first
/// review of a plan is judged on its own terms.
pub fn build_prompt(
    plan: &str,
    rubric: &str,
    context: &str,
    round: u32,
    prior_feedback: Option<&str>,
) -> String {
    let mut prompt = format!(
        "You are a senior software architect reviewing an implementation plan.\n\n\
         Evaluate the following implementation plan using the rubric.\n\n\
         {rubric}\n\n\
         ## Feedback Guidelines\n\n\
         - Prioritize issues: list critical problems first, minor improvements last\n\
         - Be specific: reference exact steps by number\n\
         - Be actionable: say what to change, not just what's wrong\n\n"
    );

    if !context.trim().is_empty() {
        prompt.push_str(&format!("## Project Context\n\n{context}\n\n"));
    }

    prompt.push_str(&format!("## Plan to Evaluate (Round {round})\n\n{plan}\n"));

    if let Some(previous) = prior_feedback {
        prompt.push_str(&format!(
            "\n## Previous Feedback (Round {})\n\n{previous}\n\n\
             Assess: Which feedback items were addressed? Which were ignored? \
             Focus new feedback on remaining and newly discovered issues.\n",
            round.saturating_sub(1)
        ));
    }

    prompt
}
