//! Webhook signature verification.
//!
//! GitHub signs each delivery with HMAC-SHA256 over the raw body bytes and
//! sends it as `X-Hub-Signature-256: sha256=<hex>`. Verification must run on
//! the body exactly as received; re-serializing the payload would change the
//! hash input and reject genuine deliveries.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

fn parse_signature_header(header: &str) -> Option<Vec<u8>> {
    let hex_sig = header.strip_prefix("sha256=")?;
    hex::decode(hex_sig).ok()
}

/// Compute the HMAC-SHA256 signature of a payload. Used by tests to produce
/// expected header values.
pub fn compute_signature(payload: &[u8], secret: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts any key length");
    mac.update(payload);
    mac.finalize().into_bytes().to_vec()
}

/// Format a signature the way the delivery header carries it
pub fn format_signature_header(signature: &[u8]) -> String {
    format!("sha256={}", hex::encode(signature))
}

/// Verify a delivery signature against the raw body and shared secret.
///
/// Returns `false` for a missing prefix, malformed hex, wrong length or any
/// mismatch. Comparison is constant-time via `Mac::verify_slice`. Never
/// panics.
pub fn verify_signature(payload: &[u8], signature_header: &str, secret: &[u8]) -> bool {
    let claimed = match parse_signature_header(signature_header) {
        Some(sig) => sig,
        None => return false,
    };

    let mut mac = match HmacSha256::new_from_slice(secret) {
        Ok(mac) => mac,
        Err(_) => return false,
    };
    mac.update(payload);

    mac.verify_slice(&claimed).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_accepts() {
        let payload = b"{\"ref\":\"refs/heads/main\"}";
        let secret = b"dev-secret";

        let header = format_signature_header(&compute_signature(payload, secret));
        assert!(verify_signature(payload, &header, secret));
    }

    #[test]
    fn test_single_byte_body_mutation_rejects() {
        let payload = b"payload bytes";
        let secret = b"secret";
        let header = format_signature_header(&compute_signature(payload, secret));

        let mut mutated = payload.to_vec();
        mutated[0] ^= 0x01;
        assert!(!verify_signature(&mutated, &header, secret));
    }

    #[test]
    fn test_wrong_secret_rejects() {
        let payload = b"payload";
        let header = format_signature_header(&compute_signature(payload, b"right"));
        assert!(!verify_signature(payload, &header, b"wrong"));
    }

    #[test]
    fn test_malformed_headers_reject_without_panic() {
        let payload = b"x";
        let secret = b"s";

        assert!(!verify_signature(payload, "", secret));
        assert!(!verify_signature(payload, "sha256=", secret));
        assert!(!verify_signature(payload, "sha256=zzzz", secret));
        assert!(!verify_signature(payload, "sha1=abcd", secret));
        assert!(!verify_signature(payload, "sha256=abc", secret)); // odd length
    }

    #[test]
    fn test_truncated_signature_rejects() {
        let payload = b"payload";
        let secret = b"secret";
        let sig = compute_signature(payload, secret);

        let truncated = format_signature_header(&sig[..16]);
        assert!(!verify_signature(payload, &truncated, secret));
    }

    #[test]
    fn test_raw_bytes_not_reencoded() {
        // Whitespace-differing JSON bodies are different byte strings and
        // must produce different signatures.
        let compact = br#"{"a":1}"#;
        let pretty = br#"{ "a": 1 }"#;
        let secret = b"secret";

        let header = format_signature_header(&compute_signature(compact, secret));
        assert!(verify_signature(compact, &header, secret));
        assert!(!verify_signature(pretty, &header, secret));
    }
}
