//! Session storage for Plangate.
//!
//! This module provides persistent storage for per-session review
//! state, supporting file-based and in-memory backends.

pub mod file;
pub mod memory;
pub mod traits;

pub use file::FileSessionStore;
pub use memory::MemorySessionStore;
pub use traits::{SessionStore, RECENT_EVAL_TTL_SECONDS};
