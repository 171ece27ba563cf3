// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Payload fingerprints — SHA-256 digests used to correlate audit entries
// and log lines with the document that was printed.

use iotprint_core::types::RenderPayload;
use sha2::{Digest, Sha256};

/// Compute the SHA-256 hash of `data` and return it as a lowercase hex string.
pub fn hash_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    hex::encode(result)
}

/// Digest of a render payload.
///
/// Pre-rendered documents hash their bytes; report data hashes its compact
/// JSON form, so equal data always yields the same digest.
pub fn payload_digest(payload: &RenderPayload) -> String {
    match payload {
        RenderPayload::Document(bytes) => hash_bytes(bytes),
        RenderPayload::Data(value) => hash_bytes(value.to_string().as_bytes()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// SHA-256 of the empty byte slice (well-known constant).
    const EMPTY_SHA256: &str =
        "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

    #[test]
    fn hash_empty_input() {
        assert_eq!(hash_bytes(b""), EMPTY_SHA256);
    }

    #[test]
    fn hash_known_value() {
        // SHA-256("hello") — verified against coreutils sha256sum.
        let expected = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";
        assert_eq!(hash_bytes(b"hello"), expected);
    }

    #[test]
    fn document_digest_hashes_raw_bytes() {
        let payload = RenderPayload::Document(b"hello".to_vec());
        assert_eq!(payload_digest(&payload), hash_bytes(b"hello"));
    }

    #[test]
    fn data_digest_is_stable() {
        let a = RenderPayload::Data(serde_json::json!({"lang": "en_US"}));
        let b = RenderPayload::Data(serde_json::json!({"lang": "en_US"}));
        let c = RenderPayload::Data(serde_json::json!({"lang": "fr_FR"}));
        assert_eq!(payload_digest(&a), payload_digest(&b));
        assert_ne!(payload_digest(&a), payload_digest(&c));
    }
}
