//! CLI commands for Plangate.
//!
//! This module provides the user-facing CLI commands:
//! - **sessions**: list stored review sessions
//! - **clear**: delete stored review state
//! - **config**: print the resolved configuration and its sources
//! - **init**: scaffold configuration and print hook wiring
//!
//! The hook command lives in [`crate::hooks`]; the binary dispatches to
//! it directly.

pub mod clear;
pub mod config_cmd;
pub mod init;
pub mod sessions;

pub use clear::ClearCommand;
pub use config_cmd::ConfigCommand;
pub use init::InitCommand;
pub use sessions::SessionsCommand;
