//! Webhook signature verification.
//!
//! The channel signs every delivery with HMAC-SHA256 over the raw request
//! body. Integrations in the wild spell the header differently and encode
//! the digest as either base64 or hex, so every candidate
//! (header, decoding) pair is tried; comparison is constant-time via
//! `Mac::verify_slice`.

use axum::http::HeaderMap;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Primary signature header, checked first.
pub const PRIMARY_SIGNATURE_HEADER: &str = "x-channel-hmac-sha256";

/// Alternate header spellings accepted for compatibility.
pub const ALTERNATE_SIGNATURE_HEADERS: [&str; 2] = ["x-hmac-sha256", "x-webhook-signature"];

/// Signature verification failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    /// No known signature header was present.
    #[error("no signature header present")]
    Missing,

    /// No candidate signature matched the body digest.
    #[error("signature does not match the request body")]
    Mismatch,
}

/// Verify a delivery's signature against the tenant's webhook secret.
///
/// # Errors
///
/// Returns [`SignatureError::Missing`] when no known header is present and
/// [`SignatureError::Mismatch`] when no candidate matches.
pub fn verify(secret: &[u8], body: &[u8], headers: &HeaderMap) -> Result<(), SignatureError> {
    let mut any_header = false;

    for header in std::iter::once(PRIMARY_SIGNATURE_HEADER).chain(ALTERNATE_SIGNATURE_HEADERS) {
        let Some(value) = headers.get(header).and_then(|v| v.to_str().ok()) else {
            continue;
        };
        any_header = true;

        for candidate in candidate_digests(value) {
            if digest_matches(secret, body, &candidate) {
                return Ok(());
            }
        }
    }

    if any_header {
        Err(SignatureError::Mismatch)
    } else {
        Err(SignatureError::Missing)
    }
}

/// Decode a header value into candidate raw digests (base64 and hex).
fn candidate_digests(value: &str) -> Vec<Vec<u8>> {
    let trimmed = value.trim();
    let mut candidates = Vec::with_capacity(2);

    if let Ok(decoded) = BASE64.decode(trimmed) {
        candidates.push(decoded);
    }
    if let Ok(decoded) = hex::decode(trimmed) {
        candidates.push(decoded);
    }

    candidates
}

/// Constant-time comparison of the computed digest against a candidate.
fn digest_matches(secret: &[u8], body: &[u8], candidate: &[u8]) -> bool {
    let Ok(mut mac) = HmacSha256::new_from_slice(secret) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(candidate).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"whsec_0123456789abcdef";
    const BODY: &[u8] = br#"{"id": 42, "event": "order/updated"}"#;

    fn sign(body: &[u8]) -> Vec<u8> {
        let mut mac = HmacSha256::new_from_slice(SECRET).expect("hmac key");
        mac.update(body);
        mac.finalize().into_bytes().to_vec()
    }

    #[test]
    fn test_accepts_base64_signature_on_primary_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            PRIMARY_SIGNATURE_HEADER,
            BASE64.encode(sign(BODY)).parse().expect("header"),
        );
        assert_eq!(verify(SECRET, BODY, &headers), Ok(()));
    }

    #[test]
    fn test_accepts_hex_signature_on_alternate_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-webhook-signature",
            hex::encode(sign(BODY)).parse().expect("header"),
        );
        assert_eq!(verify(SECRET, BODY, &headers), Ok(()));
    }

    #[test]
    fn test_rejects_signature_over_different_payload() {
        let mut headers = HeaderMap::new();
        headers.insert(
            PRIMARY_SIGNATURE_HEADER,
            BASE64
                .encode(sign(br#"{"id": 999}"#))
                .parse()
                .expect("header"),
        );
        assert_eq!(verify(SECRET, BODY, &headers), Err(SignatureError::Mismatch));
    }

    #[test]
    fn test_rejects_missing_header() {
        let headers = HeaderMap::new();
        assert_eq!(verify(SECRET, BODY, &headers), Err(SignatureError::Missing));
    }

    #[test]
    fn test_rejects_wrong_secret() {
        let mut headers = HeaderMap::new();
        headers.insert(
            PRIMARY_SIGNATURE_HEADER,
            BASE64.encode(sign(BODY)).parse().expect("header"),
        );
        assert_eq!(
            verify(b"a-different-secret", BODY, &headers),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn test_garbage_header_value_is_mismatch_not_missing() {
        let mut headers = HeaderMap::new();
        headers.insert(PRIMARY_SIGNATURE_HEADER, "!!not-a-digest!!".parse().expect("header"));
        assert_eq!(verify(SECRET, BODY, &headers), Err(SignatureError::Mismatch));
    }
}
