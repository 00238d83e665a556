//! Utility functions for plangate.
//!
//! Common file-reading helpers with size caps. Every file the gate reads
//! comes from a hook payload or a project tree it does not control, so
//! all reads are bounded.

use std::fs;
use std::io;
use std::path::Path;

use crate::error::{PlangateError, Result};

/// Maximum file size for general reads (10 MB).
pub const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Maximum transcript size (50 MB).
///
/// Transcripts are JSONL files that grow for the life of a session; long
/// sessions routinely reach tens of megabytes.
pub const MAX_TRANSCRIPT_SIZE: u64 = 50 * 1024 * 1024;

/// Maximum plan file size (1 MB). A plan larger than this is not a plan.
pub const MAX_PLAN_FILE_SIZE: u64 = 1024 * 1024;

/// Read a file into a string with size limit protection.
///
/// Returns an error if the file exceeds `MAX_FILE_SIZE` to prevent memory
/// issues with unexpectedly large files.
pub fn read_to_string_limited(path: &Path) -> Result<String> {
    read_to_string_with_limit(path, MAX_FILE_SIZE)
}

/// Read a file into a string with a custom size limit.
///
/// The size check happens against metadata before the read, so an
/// oversized file is rejected without being pulled into memory.
///
/// # Errors
///
/// Returns an error if the file exceeds `max_size` or cannot be read.
pub fn read_to_string_with_limit(path: &Path, max_size: u64) -> Result<String> {
    let metadata = fs::metadata(path).map_err(|e| PlangateError::storage(path, e))?;

    let size = metadata.len();
    if size > max_size {
        return Err(PlangateError::storage(
            path,
            io::Error::new(
                io::ErrorKind::FileTooLarge,
                format!("file is too large ({size} bytes, max {max_size} bytes)"),
            ),
        ));
    }

    fs::read_to_string(path).map_err(|e| PlangateError::storage(path, e))
}
