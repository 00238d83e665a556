//! Weighted heuristic plan detection. Pure local scoring, no I/O.
//!
//! Signals and weights:
//!
//! | signal                        | points |
//! |-------------------------------|--------|
//! | `permission_mode == "plan"`   | +5     |
//! | plan-style header             | +3     |
//! | numbered steps (>= 3)         | +3     |
//! | planning preamble phrase      | +2     |
//! | section headers (>= 3)        | +2     |
//! | action-verb bullets (>= 3)    | +2     |
//! | file path references (>= 3)   | +1     |
//!
//! Text is treated as a plan when the total reaches the configured
//! `detection.min_score` (default 6). The detector returns the matched
//! signals alongside the total so callers can log why a message was or
//! was not gated.

use regex::Regex;
use std::sync::LazyLock;

static PLAN_HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?mi)^#{1,3}\s+(?:Implementation\s+)?Plan",
        r"|^#{1,3}\s+Approach",
        r"|^#{1,3}\s+Strategy",
        r"|^#{1,3}\s+Proposed\s+(?:Solution|Changes)",
        r"|^#{1,3}\s+Steps",
        r"|^#{1,3}\s+Action\s+Items",
        r"|^#{1,3}\s+Implementation\s+Steps",
        r"|^#{1,3}\s+Execution\s+Plan",
        r"|^#{1,3}\s+Migration\s+Plan",
        r"|^#{1,3}\s+Rollout\s+Plan",
    ))
    .expect("valid plan header regex")
});

static NUMBERED_STEPS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?mi)^\s*(?:\d+[.)]\s|Step\s+\d+[:.]\s)").expect("valid numbered steps regex")
});

static PREAMBLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)(?:Here(?:'s| is) (?:my |the )?plan)",
        r"|(?:I(?:'ll| will) (?:proceed|start) (?:by|with))",
        r"|(?:The approach (?:is|will be))",
        r"|(?:Let me outline)",
        r"|(?:Here(?:'s| is) (?:my |the )?approach)",
        r"|(?:I propose (?:the following|to))",
        r"|(?:My plan is to)",
    ))
    .expect("valid preamble regex")
});

static SECTION_HEADER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^#{2,3}\s+\S").expect("valid section header regex"));

static ACTION_VERB_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?mi)^\s*[-*]\s+(?:Create|Add|Implement|Update|Modify|Remove|Delete|Refactor|",
        r"Extract|Move|Rename|Configure|Set up|Install|Deploy|Test|Write|Build|",
        r"Fix|Migrate|Replace|Extend|Integrate)\b",
    ))
    .expect("valid action verb regex")
});

static FILE_PATH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?:`[a-zA-Z0-9_./-]+\.[a-zA-Z]{1,5}`)",
        r"|(?:\b[a-zA-Z0-9_.-]+/[a-zA-Z0-9_./-]+\.[a-zA-Z]{1,5}\b)",
    ))
    .expect("valid file path regex")
});

/// Result of scoring a piece of text for plan-shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    /// Sum of the matched signal weights.
    pub score: u32,
    /// The signals that fired, as `(name, points)` pairs in signal order.
    pub signals: Vec<(&'static str, u32)>,
}

impl Detection {
    /// Check whether the score clears the acceptance threshold.
    pub fn is_plan(&self, min_score: u32) -> bool {
        self.score >= min_score
    }

    /// Render the fired signals for diagnostics, e.g. `"plan_header+3, numbered_steps+3"`.
    pub fn describe(&self) -> String {
        self.signals
            .iter()
            .map(|(name, points)| format!("{name}+{points}"))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Score `text` for plan-shape.
///
/// `permission_mode` is the agent's permission mode from the hook input;
/// `"plan"` is the strongest single signal since the agent was explicitly
/// asked to plan.
pub fn detect(text: &str, permission_mode: Option<&str>) -> Detection {
    let mut signals = Vec::new();

    if permission_mode == Some("plan") {
        signals.push(("permission_mode", 5));
    }
    if PLAN_HEADER_RE.is_match(text) {
        signals.push(("plan_header", 3));
    }
    if NUMBERED_STEPS_RE.find_iter(text).count() >= 3 {
        signals.push(("numbered_steps", 3));
    }
    if PREAMBLE_RE.is_match(text) {
        signals.push(("preamble_phrase", 2));
    }
    if SECTION_HEADER_RE.find_iter(text).count() >= 3 {
        signals.push(("section_headers", 2));
    }
    if ACTION_VERB_RE.find_iter(text).count() >= 3 {
        signals.push(("action_verbs", 2));
    }
    if FILE_PATH_RE.find_iter(text).count() >= 3 {
        signals.push(("file_paths", 1));
    }

    let score = signals.iter().map(|(_, points)| points).sum();
    Detection { score, signals }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEFAULT_MIN_SCORE: u32 = 6;

    fn signal_names(detection: &Detection) -> Vec<&'static str> {
        detection.signals.iter().map(|(name, _)| *name).collect()
    }

    #[test]
    fn test_full_plan_scores_high() {
        let text = "\
# Implementation Plan

## Phase 1

1. Create the new module
2. Add the config entry
3. Update `src/main.rs`

## Phase 2

- Create `src/plan/detector.rs`
- Update tests/integration.rs
- Remove the old shim

## Rollout

Ship behind a flag.
";
        let detection = detect(text, None);
        assert!(detection.score >= DEFAULT_MIN_SCORE, "score {}", detection.score);
        assert!(signal_names(&detection).contains(&"plan_header"));
        assert!(signal_names(&detection).contains(&"numbered_steps"));
        assert!(signal_names(&detection).contains(&"section_headers"));
    }

    #[test]
    fn test_conversational_text_scores_low() {
        let text = "The tests pass now. The root cause was a stale cache entry \
                    that survived the restart. Let me know if anything else looks off.";
        let detection = detect(text, None);
        assert!(detection.score < DEFAULT_MIN_SCORE, "score {}", detection.score);
    }

    #[test]
    fn test_empty_text_scores_zero() {
        let detection = detect("", None);
        assert_eq!(detection.score, 0);
        assert!(detection.signals.is_empty());
    }

    #[test]
    fn test_permission_mode_plan_adds_five() {
        let without = detect("ordinary text", None);
        let with = detect("ordinary text", Some("plan"));
        assert_eq!(with.score, without.score + 5);
        assert!(signal_names(&with).contains(&"permission_mode"));
    }

    #[test]
    fn test_permission_mode_other_values_ignored() {
        let detection = detect("ordinary text", Some("acceptEdits"));
        assert!(!signal_names(&detection).contains(&"permission_mode"));
    }

    #[test]
    fn test_plan_header_variants() {
        for header in [
            "# Plan",
            "## Implementation Plan",
            "### Approach",
            "## Strategy",
            "# Proposed Solution",
            "## Proposed Changes",
            "# Steps",
            "## Action Items",
            "# Execution Plan",
            "## Migration Plan",
            "### rollout plan",
        ] {
            let detection = detect(header, None);
            assert!(
                signal_names(&detection).contains(&"plan_header"),
                "expected plan_header for {header:?}"
            );
        }
    }

    #[test]
    fn test_plain_heading_is_not_a_plan_header() {
        let detection = detect("# Results\n\nAll benchmarks improved.", None);
        assert!(!signal_names(&detection).contains(&"plan_header"));
    }

    #[test]
    fn test_numbered_steps_need_three() {
        let two = detect("1. First\n2. Second\n", None);
        assert!(!signal_names(&two).contains(&"numbered_steps"));

        let three = detect("1. First\n2. Second\n3. Third\n", None);
        assert!(signal_names(&three).contains(&"numbered_steps"));
    }

    #[test]
    fn test_step_prefix_counts_as_numbered() {
        let text = "Step 1: prepare\nStep 2: execute\nStep 3. verify\n";
        let detection = detect(text, None);
        assert!(signal_names(&detection).contains(&"numbered_steps"));
    }

    #[test]
    fn test_preamble_phrases() {
        for phrase in [
            "Here's my plan for the migration.",
            "Here is the plan.",
            "I'll proceed by extracting the parser.",
            "I will start with the storage layer.",
            "The approach is to split the module.",
            "Let me outline the changes.",
            "Here's the approach.",
            "I propose the following changes.",
            "My plan is to batch the writes.",
        ] {
            let detection = detect(phrase, None);
            assert!(
                signal_names(&detection).contains(&"preamble_phrase"),
                "expected preamble_phrase for {phrase:?}"
            );
        }
    }

    #[test]
    fn test_action_verb_bullets_need_three() {
        let text = "- Create the module\n- Update the docs\n- Remove the shim\n";
        let detection = detect(text, None);
        assert!(signal_names(&detection).contains(&"action_verbs"));

        let two = detect("- Create the module\n- Update the docs\n", None);
        assert!(!signal_names(&two).contains(&"action_verbs"));
    }

    #[test]
    fn test_file_paths_backticked_and_bare() {
        let text = "Touch `src/main.rs`, then src/lib.rs and tests/cli.rs as needed.";
        let detection = detect(text, None);
        assert!(signal_names(&detection).contains(&"file_paths"));
    }

    #[test]
    fn test_section_headers_exclude_h1() {
        // Three h1 headings: the section signal wants ## or ###.
        let detection = detect("# One\n# Two\n# Three\n", None);
        assert!(!signal_names(&detection).contains(&"section_headers"));

        let sub = detect("## One\n## Two\n### Three\n", None);
        assert!(signal_names(&sub).contains(&"section_headers"));
    }

    #[test]
    fn test_header_plus_steps_reaches_threshold() {
        // plan_header(3) + numbered_steps(3) = 6, the default threshold.
        let text = "# Plan\n\n1. First\n2. Second\n3. Third\n";
        let detection = detect(text, None);
        assert_eq!(detection.score, 6);
        assert!(detection.is_plan(DEFAULT_MIN_SCORE));
    }

    #[test]
    fn test_describe_lists_fired_signals() {
        let text = "# Plan\n\n1. First\n2. Second\n3. Third\n";
        let detection = detect(text, None);
        assert_eq!(detection.describe(), "plan_header+3, numbered_steps+3");
    }

    #[test]
    fn test_is_plan_respects_min_score() {
        let text = "# Plan\n\n1. First\n2. Second\n3. Third\n";
        let detection = detect(text, None);
        assert!(detection.is_plan(6));
        assert!(!detection.is_plan(7));
    }
}
