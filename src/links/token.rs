//! Session token generation
//!
//! Tokens are random, URL-safe, and single-use. Collision probability is
//! negligible at this scale; the store still enforces a unique index and the
//! lifecycle retries generation on conflict.

use rand::Rng;

/// Token length in characters
pub const TOKEN_LEN: usize = 16;

/// Lowercase URL-safe alphabet, matching the link URLs' path segments
const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Generate a fresh link token
pub fn generate() -> String {
    let mut rng = rand::thread_rng();
    (0..TOKEN_LEN)
        .map(|_| {
            let idx = rng.gen_range(0..ALPHABET.len());
            ALPHABET[idx] as char
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_are_url_safe() {
        let token = generate();
        assert_eq!(token.len(), TOKEN_LEN);
        assert!(token.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    }

    #[test]
    fn test_tokens_differ() {
        // Not a uniqueness proof, just a sanity check on the generator
        let a = generate();
        let b = generate();
        assert_ne!(a, b);
    }
}
