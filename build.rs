//! Build script that embeds git metadata into the binary.
//!
//! Emits `PLANGATE_GIT_HASH` and `PLANGATE_IS_RELEASE` for the version
//! string in main.rs. Builds outside a git checkout get "unknown" and
//! are never considered releases.

use std::process::Command;

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    let hash = git_output(&["rev-parse", "--short=7", "HEAD"]);
    let dirty = git_output(&["status", "--porcelain"])
        .map(|s| !s.is_empty())
        .unwrap_or(false);

    let git_hash = match hash {
        Some(h) if dirty => format!("{h}-dirty"),
        Some(h) => h,
        None => "unknown".to_string(),
    };

    // A release build sits exactly on the matching version tag with a
    // clean working tree.
    let version = std::env::var("CARGO_PKG_VERSION").unwrap_or_default();
    let tag = git_output(&["describe", "--exact-match", "--tags"]).unwrap_or_default();
    let is_release = !dirty && tag == format!("v{version}");

    println!("cargo:rustc-env=PLANGATE_GIT_HASH={git_hash}");
    println!("cargo:rustc-env=PLANGATE_IS_RELEASE={is_release}");
}

fn git_output(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
}
