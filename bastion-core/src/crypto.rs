//! Fingerprinting of `(identity, origin)` pairs.
//!
//! Attempt records are keyed by a SHA256 digest rather than the raw username
//! and address, so a dump of the attempt store does not reveal which accounts
//! were targeted or from where.

use sha2::{Digest, Sha256};

/// ASCII unit separator. Keeps `("ab", "c")` and `("a", "bc")` apart.
const FIELD_SEPARATOR: u8 = 0x1f;

/// Hash an identity/origin pair into a hex-encoded SHA256 fingerprint.
///
/// The result is deterministic and always 64 lowercase hex characters.
pub fn fingerprint(identity: &str, origin: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(identity.as_bytes());
    hasher.update([FIELD_SEPARATOR]);
    hasher.update(origin.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_is_deterministic() {
        assert_eq!(
            fingerprint("admin", "10.0.0.5"),
            fingerprint("admin", "10.0.0.5")
        );
    }

    #[test]
    fn test_fingerprint_produces_hex_string() {
        let hash = fingerprint("admin", "10.0.0.5");
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_fingerprint_does_not_contain_inputs() {
        let hash = fingerprint("admin", "10.0.0.5");
        assert!(!hash.contains("admin"));
        assert!(!hash.contains("10.0.0.5"));
    }

    #[test]
    fn test_fingerprint_separates_fields() {
        assert_ne!(fingerprint("ab", "c"), fingerprint("a", "bc"));
        assert_ne!(fingerprint("admin", "10.0.0.5"), fingerprint("10.0.0.5", "admin"));
    }

    #[test]
    fn test_different_pairs_produce_different_fingerprints() {
        assert_ne!(
            fingerprint("user_a", "ip_1"),
            fingerprint("user_a", "ip_2")
        );
        assert_ne!(
            fingerprint("user_a", "ip_1"),
            fingerprint("user_b", "ip_1")
        );
    }
}
