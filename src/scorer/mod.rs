//! Oracle scoring pipeline.
//!
//! Builds the review prompt, shells out to the oracle CLI under a hard
//! timeout, and parses its structured verdict. The [`Scorer`] trait is
//! the seam between the decision engine and the subprocess machinery.

pub mod invoker;
pub mod prompt;
pub mod result;

pub use invoker::{CliScorer, Scorer};
pub use prompt::build_prompt;
pub use result::{parse_verdict, EvaluationResult, ScoreBreakdown, ScorerFailure};
