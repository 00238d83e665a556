//! Plan acquisition, identity, and detection.
//!
//! This module answers three questions about the text a hook event
//! carries: where is the plan (discovery), which plan is it
//! (fingerprinting), and is it a plan at all (detection).

pub mod detector;
pub mod discover;
pub mod fingerprint;

pub use detector::{detect, Detection};
pub use discover::{
    find_plan_file, is_plan_file_path, last_assistant_text, read_plan_file, DiscoveredPlan,
    PlanSource,
};
pub use fingerprint::{content_hash, fingerprint};
