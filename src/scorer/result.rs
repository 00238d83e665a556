//! Scorer verdict types and strict output parsing.
//!
//! The oracle CLI is constrained by an output schema, but its stdout is
//! still untrusted: progress noise before the JSON, a missing field, an
//! out-of-range criterion. Parsing is strict and every defect maps to
//! [`ScorerFailure::MalformedOutput`] rather than a guess. The one
//! repair performed is the total: the accepted total is always the sum
//! of the five criterion scores, and a reported total that disagrees is
//! logged and discarded.

use serde::Deserialize;
use thiserror::Error;

/// Why a scorer invocation produced no verdict.
///
/// One subprocess attempt is made per evaluation; every way it can go
/// wrong lands here and the round policy decides what happens next.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScorerFailure {
    /// The oracle CLI could not be started at all.
    #[error("scorer unavailable: {message}")]
    Unavailable { message: String },

    /// The oracle ran past its wall-clock budget and was killed.
    #[error("scorer timed out ({seconds}s). Increase: PLANGATE_TIMEOUT_SECONDS={}", .seconds + 30)]
    Timeout { seconds: u64 },

    /// The oracle exited nonzero.
    #[error("scorer failed (exit {code}): {stderr}")]
    ExecutionFailed { code: i32, stderr: String },

    /// The oracle exited cleanly but its output was not a usable verdict.
    #[error("scorer output unusable: {message}")]
    MalformedOutput { message: String },
}

impl ScorerFailure {
    /// Failure for a scorer executable that is not installed.
    pub fn not_found(path: &str) -> Self {
        Self::Unavailable {
            message: format!(
                "'{path}' not found. Install: npm install -g @openai/codex, \
                 or set PLANGATE_SCORER_PATH"
            ),
        }
    }

    /// Failure for any other spawn or I/O problem around the subprocess.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Failure for unusable scorer output.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedOutput {
            message: message.into(),
        }
    }

    /// Short name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ScorerFailure::Unavailable { .. } => "unavailable",
            ScorerFailure::Timeout { .. } => "timeout",
            ScorerFailure::ExecutionFailed { .. } => "execution_failed",
            ScorerFailure::MalformedOutput { .. } => "malformed_output",
        }
    }
}

/// Per-criterion scores, each 0..=2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScoreBreakdown {
    pub completeness: u8,
    pub correctness: u8,
    pub sequencing: u8,
    pub risk_awareness: u8,
    pub clarity: u8,
}

impl ScoreBreakdown {
    /// Sum of the five criteria, 0..=10.
    pub fn total(&self) -> u8 {
        self.completeness + self.correctness + self.sequencing + self.risk_awareness + self.clarity
    }
}

/// A parsed oracle verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationResult {
    /// Per-criterion breakdown.
    pub scores: ScoreBreakdown,
    /// Accepted total: always the breakdown sum.
    pub total: u8,
    /// What the plan does well.
    pub strengths: Vec<String>,
    /// Problems the plan must address. Wire name: `weaknesses`.
    pub issues: Vec<String>,
    /// Concrete changes to make.
    pub suggestions: Vec<String>,
}

/// Wire shape of the oracle's JSON verdict.
#[derive(Deserialize)]
struct RawVerdict {
    score: i64,
    breakdown: RawBreakdown,
    strengths: Vec<String>,
    weaknesses: Vec<String>,
    suggestions: Vec<String>,
}

#[derive(Deserialize)]
struct RawBreakdown {
    completeness: i64,
    correctness: i64,
    sequencing: i64,
    risk_awareness: i64,
    clarity: i64,
}

/// Parse oracle stdout into an [`EvaluationResult`].
///
/// The whole output is tried as JSON first; when that fails (codex may
/// print progress lines before the answer), the last non-empty line is
/// tried instead. The verdict must be an object carrying the five
/// breakdown criteria as integers in 0..=2 plus the three feedback
/// lists. The reported `score` is cross-checked against the breakdown
/// sum and the sum wins on disagreement.
pub fn parse_verdict(stdout: &str) -> Result<EvaluationResult, ScorerFailure> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Err(ScorerFailure::malformed("scorer returned empty output"));
    }

    let value = serde_json::from_str::<serde_json::Value>(trimmed)
        .ok()
        .filter(serde_json::Value::is_object)
        .or_else(|| last_json_object(trimmed))
        .ok_or_else(|| {
            ScorerFailure::malformed(
                "no JSON object in scorer output. Set PLANGATE_VERBOSE=true for details",
            )
        })?;

    let raw: RawVerdict = serde_json::from_value(value)
        .map_err(|err| ScorerFailure::malformed(format!("scorer verdict rejected: {err}")))?;

    let scores = ScoreBreakdown {
        completeness: criterion("completeness", raw.breakdown.completeness)?,
        correctness: criterion("correctness", raw.breakdown.correctness)?,
        sequencing: criterion("sequencing", raw.breakdown.sequencing)?,
        risk_awareness: criterion("risk_awareness", raw.breakdown.risk_awareness)?,
        clarity: criterion("clarity", raw.breakdown.clarity)?,
    };

    let total = scores.total();
    if raw.score != i64::from(total) {
        tracing::warn!(
            reported = raw.score,
            computed = total,
            "scorer total disagrees with breakdown sum, using the sum"
        );
    }

    Ok(EvaluationResult {
        scores,
        total,
        strengths: raw.strengths,
        issues: raw.weaknesses,
        suggestions: raw.suggestions,
    })
}

fn criterion(name: &str, value: i64) -> Result<u8, ScorerFailure> {
    if (0..=2).contains(&value) {
        Ok(value as u8)
    } else {
        Err(ScorerFailure::malformed(format!(
            "invalid breakdown.{name}: {value} (must be 0-2)"
        )))
    }
}

/// Last non-empty line of `stdout` that parses as a JSON object.
fn last_json_object(stdout: &str) -> Option<serde_json::Value> {
    let line = stdout.lines().rev().map(str::trim).find(|l| !l.is_empty())?;
    serde_json::from_str::<serde_json::Value>(line)
        .ok()
        .filter(serde_json::Value::is_object)
}
