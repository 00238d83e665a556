//! Plan content fingerprinting for identity and change detection.
//!
//! Two digests with different jobs:
//!
//! - [`fingerprint`] identifies *which plan* is under review. It combines
//!   the plan's title line with a hash of the normalized opening, so it
//!   survives feedback-driven revisions (which edit later sections) but
//!   changes when the plan is fundamentally rewritten. A fingerprint
//!   change resets the round counter.
//! - [`content_hash`] identifies *this exact text*. It hashes the whole
//!   normalized body and backs the recent-evaluation marker that stops
//!   the Stop hook from re-scoring a plan the PreToolUse hook just
//!   scored.
//!
//! Both normalize whitespace first so a reflowed plan keeps its identity.

use sha2::{Digest, Sha256};

/// Characters of the plan hashed into the fingerprint prefix.
const FINGERPRINT_PREFIX_CHARS: usize = 500;

/// Characters of the opening line used as a fallback title.
const TITLE_FALLBACK_CHARS: usize = 120;

/// Compute a stable identity fingerprint for a plan, `"<title>|<hash8>"`.
///
/// The title is the first markdown heading line, or the first 120
/// characters of the first non-empty line when the plan has no heading.
/// The hash covers the whitespace-normalized first 500 characters, so
/// same-title plans with different openings still get distinct
/// identities.
pub fn fingerprint(text: &str) -> String {
    let mut title = String::new();
    for line in text.trim().lines() {
        let line = line.trim();
        if line.starts_with('#') {
            title = line.to_string();
            break;
        }
        if !line.is_empty() {
            title = line.chars().take(TITLE_FALLBACK_CHARS).collect();
            break;
        }
    }

    let prefix: String = text.chars().take(FINGERPRINT_PREFIX_CHARS).collect();
    let digest = sha256_hex(&normalize_whitespace(&prefix));
    format!("{}|{}", title, &digest[..8])
}

/// Compute a short content hash of the full plan text.
///
/// Whitespace-insensitive, so formatting-only edits produce the same
/// hash. Sixteen hex characters is plenty for same-session change
/// detection.
pub fn content_hash(text: &str) -> String {
    let digest = sha256_hex(&normalize_whitespace(text));
    digest[..16].to_string()
}

/// Collapse whitespace runs to single spaces and trim the ends.
fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn sha256_hex(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_fingerprint_uses_heading_as_title() {
        let fp = fingerprint("# Migration Plan\n\n1. Export data\n2. Import data\n");
        assert!(fp.starts_with("# Migration Plan|"));
    }

    #[test]
    fn test_fingerprint_skips_blank_lines_before_heading() {
        let fp = fingerprint("\n\n   \n## Approach\n\nDetails follow.\n");
        assert!(fp.starts_with("## Approach|"));
    }

    #[test]
    fn test_fingerprint_falls_back_to_first_line() {
        let fp = fingerprint("Refactor the session store first.\n\n# Later Heading\n");
        // The first non-empty line wins even when a heading appears later.
        assert!(fp.starts_with("Refactor the session store first.|"));
    }

    #[test]
    fn test_fingerprint_truncates_long_fallback_title() {
        let long_line = "x".repeat(300);
        let fp = fingerprint(&long_line);
        let title = fp.split('|').next().unwrap();
        assert_eq!(title.chars().count(), 120);
    }

    #[test]
    fn test_fingerprint_stable_across_reflow() {
        let original = "# Plan\n\nStep one does a thing.\nStep two does another.\n";
        let reflowed = "# Plan\n\n\n  Step one   does a thing. Step two\tdoes another.\n";
        assert_eq!(fingerprint(original), fingerprint(reflowed));
    }

    #[test]
    fn test_fingerprint_changes_on_rewrite() {
        let a = fingerprint("# Plan\n\nMigrate the database to the new schema.\n");
        let b = fingerprint("# Plan\n\nRewrite the frontend in a different framework.\n");
        assert_ne!(a, b);
        // Same title, different prefix hash.
        assert_eq!(a.split('|').next(), b.split('|').next());
    }

    #[test]
    fn test_fingerprint_of_empty_text() {
        let fp = fingerprint("");
        assert!(fp.starts_with('|'));
        assert_eq!(fp.len(), 9);
        // Whitespace-only text is the same identity as empty text.
        assert_eq!(fp, fingerprint("   \n\t  \n"));
    }

    #[test]
    fn test_fingerprint_hash_is_eight_hex_chars() {
        let fp = fingerprint("# Plan\n\nDo the thing.\n");
        let hash = fp.rsplit('|').next().unwrap();
        assert_eq!(hash.len(), 8);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_content_hash_is_sixteen_hex_chars() {
        let hash = content_hash("some plan text");
        assert_eq!(hash.len(), 16);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_content_hash_ignores_formatting() {
        let a = content_hash("step one\nstep two\n");
        let b = content_hash("  step one   step two  ");
        assert_eq!(a, b);
    }

    #[test]
    fn test_content_hash_detects_change() {
        let a = content_hash("step one\nstep two\n");
        let b = content_hash("step one\nstep three\n");
        assert_ne!(a, b);
    }

    #[test]
    fn test_content_hash_covers_full_text() {
        // Unlike the fingerprint, edits past the opening change the hash.
        let base = format!("# Plan\n{}\n", "x".repeat(600));
        let a = content_hash(&format!("{base}ending one"));
        let b = content_hash(&format!("{base}ending two"));
        assert_ne!(a, b);
    }

    proptest! {
        #[test]
        fn prop_fingerprint_ignores_edits_past_prefix(
            tail_a in "[a-z ]{0,200}",
            tail_b in "[a-z ]{0,200}",
        ) {
            // Body padding pushes both tails past the hashed prefix.
            let base = format!("# Plan\n{}\n", "pad ".repeat(200));
            let a = fingerprint(&format!("{base}{tail_a}"));
            let b = fingerprint(&format!("{base}{tail_b}"));
            prop_assert_eq!(a, b);
        }

        #[test]
        fn prop_content_hash_whitespace_insensitive(words in prop::collection::vec("[a-z]{1,8}", 1..20)) {
            let single = words.join(" ");
            let messy = words.join("  \n\t ");
            prop_assert_eq!(content_hash(&single), content_hash(&messy));
        }
    }
}
