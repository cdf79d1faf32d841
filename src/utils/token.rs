// src/utils/token.rs

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;
use rand::rngs::OsRng;

/// Length of the raw random token material in bytes.
const TOKEN_BYTES: usize = 32;

/// Mints a fresh opaque session token.
///
/// Tokens are 32 bytes of OS randomness, base64url encoded. A new token is
/// issued on every package download, invalidating whatever the client held
/// before.
pub fn issue_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Compares a presented token against the stored one without an early exit
/// on the first mismatched byte.
pub fn tokens_match(stored: &str, presented: &str) -> bool {
    let a = stored.as_bytes();
    let b = presented.as_bytes();
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_tokens_are_unique() {
        let a = issue_token();
        let b = issue_token();
        assert_ne!(a, b);
        assert!(a.len() >= 40);
    }

    #[test]
    fn matching_tokens_compare_equal() {
        let t = issue_token();
        assert!(tokens_match(&t, &t.clone()));
    }

    #[test]
    fn different_tokens_do_not_match() {
        assert!(!tokens_match(&issue_token(), &issue_token()));
    }

    #[test]
    fn length_mismatch_is_rejected() {
        let t = issue_token();
        assert!(!tokens_match(&t, &t[..t.len() - 1]));
    }
}
