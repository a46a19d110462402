//! Content hashing shared by the document store and object store.

use ring::digest::{digest, SHA256};

/// SHA-256 hash of `content`, formatted as `"sha256:<hex>"`.
///
/// Always computed regardless of object-store availability — the hash is
/// the bridge between the document store's record and the object store's
/// content identifier, so it exists even in hash-only mode.
pub fn content_hash(content: &str) -> String {
    let d = digest(&SHA256, content.as_bytes());
    let mut hex = String::with_capacity(d.as_ref().len() * 2);
    for byte in d.as_ref() {
        hex.push_str(&format!("{:02x}", byte));
    }
    format!("sha256:{}", hex)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_deterministic() {
        assert_eq!(content_hash("hello"), content_hash("hello"));
    }

    #[test]
    fn hash_differs_for_different_content() {
        assert_ne!(content_hash("hello"), content_hash("world"));
    }

    #[test]
    fn hash_has_sha256_prefix() {
        assert!(content_hash("x").starts_with("sha256:"));
        assert_eq!(content_hash("x").len(), "sha256:".len() + 64);
    }
}
