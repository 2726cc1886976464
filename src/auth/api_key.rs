//! API key generation, digesting, and constant-time verification.

use anyhow::Result;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::db::{ApiKeyRecord, Store};

/// Key format: "qd_" + 64 hex chars (32 random bytes).
pub const KEY_PREFIX: &str = "qd_";
pub const KEY_LEN: usize = 67;

/// Length of the public, non-secret prefix stored alongside the digest
/// and used to locate a candidate record.
pub const LOOKUP_PREFIX_LEN: usize = 12;

/// Generate a new API key secret.
#[must_use]
pub fn generate_api_key() -> String {
    use rand::Rng;

    let mut rng = rand::rng();
    let key_bytes: [u8; 32] = rng.random();
    format!("{KEY_PREFIX}{}", hex::encode(key_bytes))
}

/// SHA-256 hex digest of a key secret, suitable for storage.
#[must_use]
pub fn hash_api_key(api_key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(api_key.as_bytes());
    hex::encode(hasher.finalize())
}

/// Public display/lookup prefix of a key secret.
#[must_use]
pub fn lookup_prefix(api_key: &str) -> &str {
    &api_key[..api_key.len().min(LOOKUP_PREFIX_LEN)]
}

/// Structural check before any store lookup.
#[must_use]
pub fn is_valid_key_format(api_key: &str) -> bool {
    api_key.starts_with(KEY_PREFIX)
        && api_key.len() == KEY_LEN
        && api_key[KEY_PREFIX.len()..]
            .chars()
            .all(|c| c.is_ascii_hexdigit())
}

/// Compare a presented secret against a stored digest without
/// short-circuiting, so response timing does not leak how far the
/// comparison got.
#[must_use]
pub fn verify_api_key(presented: &str, stored_hash: &str) -> bool {
    let presented_hash = hash_api_key(presented);

    if presented_hash.len() != stored_hash.len() {
        return false;
    }

    presented_hash
        .as_bytes()
        .ct_eq(stored_hash.as_bytes())
        .into()
}

/// Full validation path for an inbound secret. Every rejection reason
/// (bad format, unknown prefix, inactive, expired, digest mismatch)
/// collapses to `None`, so callers cannot tell the failure modes apart.
pub async fn validate(store: &Store, secret: &str) -> Result<Option<ApiKeyRecord>> {
    if !is_valid_key_format(secret) {
        return Ok(None);
    }

    let Some(record) = store.find_api_key_by_prefix(lookup_prefix(secret)).await? else {
        return Ok(None);
    };

    if !record.active || record.is_expired() {
        return Ok(None);
    }

    if !verify_api_key(secret, &record.key_hash) {
        return Ok(None);
    }

    Ok(Some(record))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_api_key_format() {
        let key = generate_api_key();
        assert!(key.starts_with("qd_"));
        assert_eq!(key.len(), KEY_LEN);
        assert!(is_valid_key_format(&key));
    }

    #[test]
    fn test_generate_api_key_uniqueness() {
        assert_ne!(generate_api_key(), generate_api_key());
    }

    #[test]
    fn test_lookup_prefix_is_public_fragment() {
        let key = generate_api_key();
        let prefix = lookup_prefix(&key);
        assert_eq!(prefix.len(), LOOKUP_PREFIX_LEN);
        assert!(key.starts_with(prefix));
    }

    #[test]
    fn test_hash_is_stable() {
        let key = generate_api_key();
        assert_eq!(hash_api_key(&key), hash_api_key(&key));
    }

    #[test]
    fn test_verify_round_trip() {
        let key = generate_api_key();
        let stored = hash_api_key(&key);
        assert!(verify_api_key(&key, &stored));
        assert!(!verify_api_key(&generate_api_key(), &stored));
    }

    #[test]
    fn test_rejects_malformed_keys() {
        assert!(!is_valid_key_format("qd_short"));
        assert!(!is_valid_key_format(&"x".repeat(KEY_LEN)));
        assert!(!is_valid_key_format(&format!(
            "ak_{}",
            "0".repeat(KEY_LEN - 3)
        )));
    }
}
