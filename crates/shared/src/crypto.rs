//! Comparison of the shared admin secret.

use sha2::{Digest, Sha256};

/// Compares a provided secret against the expected one.
///
/// Both sides are hashed first so the comparison always runs over two
/// 32-byte digests, regardless of the input lengths.
pub fn secrets_match(provided: &str, expected: &str) -> bool {
    if expected.is_empty() {
        return false;
    }

    let a = Sha256::digest(provided.as_bytes());
    let b = Sha256::digest(expected.as_bytes());

    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secrets_match_unicode() {
        assert!(secrets_match("茂宜岛", "茂宜岛"));
        assert!(!secrets_match("茂宜", "茂宜岛"));
    }

    #[test]
    fn test_secrets_match_equal() {
        assert!(secrets_match("maui2026", "maui2026"));
    }

    #[test]
    fn test_secrets_match_different() {
        assert!(!secrets_match("maui2025", "maui2026"));
        assert!(!secrets_match("MAUI2026", "maui2026"));
        assert!(!secrets_match("", "maui2026"));
    }

    #[test]
    fn test_secrets_match_rejects_empty_expected() {
        // An unconfigured secret never matches, not even an empty attempt
        assert!(!secrets_match("", ""));
        assert!(!secrets_match("anything", ""));
    }
}
