//! Core types and logic for Plangate.
//!
//! The per-session review state model, the round decision engine that
//! drives a plan through bounded review rounds, and the feedback
//! rendering that turns decisions into reviewer-facing text.

pub mod feedback;
pub mod gate;
pub mod state;

pub use gate::{Decision, Gate, Verdict};
pub use state::{PlanIdentity, ReviewStatus, SessionState, STALE_AFTER_SECONDS};
