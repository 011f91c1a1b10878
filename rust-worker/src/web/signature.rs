//! Invocation signature verification.
//!
//! Callers sign each POST with HMAC-SHA256 over `timestamp + "." + body`
//! and send the hex digest in `X-Signature` with the Unix timestamp in
//! `X-Signature-Timestamp`.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::warn;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "x-signature";
pub const TIMESTAMP_HEADER: &str = "x-signature-timestamp";

/// Verify an invocation signature.
///
/// Returns `false` for missing fields, a timestamp further than
/// `max_age_seconds` from now in either direction, malformed hex, or a
/// digest mismatch.
pub fn verify_invocation_signature(
    signing_key: &str,
    timestamp: &str,
    body: &[u8],
    signature: &str,
    max_age_seconds: u64,
) -> bool {
    if signing_key.is_empty() || timestamp.is_empty() || signature.is_empty() {
        warn!(
            has_signing_key = !signing_key.is_empty(),
            has_timestamp = !timestamp.is_empty(),
            has_signature = !signature.is_empty(),
            "invocation_signature_missing_fields"
        );
        return false;
    }

    let signed_at: u64 = match timestamp.trim().parse() {
        Ok(t) => t,
        Err(_) => {
            warn!(timestamp = %timestamp, "invocation_signature_invalid_timestamp");
            return false;
        }
    };

    let current_time = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();

    let age = current_time.abs_diff(signed_at);
    if age > max_age_seconds {
        warn!(
            signed_at = signed_at,
            current_time = current_time,
            age_seconds = age,
            max_age_seconds = max_age_seconds,
            "invocation_signature_stale"
        );
        return false;
    }

    let provided = match hex::decode(signature.trim()) {
        Ok(bytes) => bytes,
        Err(_) => {
            warn!(signature_length = signature.len(), "invocation_signature_not_hex");
            return false;
        }
    };

    let mut mac = match HmacSha256::new_from_slice(signing_key.as_bytes()) {
        Ok(m) => m,
        Err(_) => {
            warn!("invocation_signature_invalid_key");
            return false;
        }
    };

    mac.update(timestamp.trim().as_bytes());
    mac.update(b".");
    mac.update(body);

    // verify_slice compares in constant time
    let valid = mac.verify_slice(&provided).is_ok();
    if !valid {
        warn!(
            signature_length = signature.len(),
            body_length = body.len(),
            "invocation_signature_mismatch"
        );
    }

    valid
}

/// Check if invocation signature verification is enabled.
pub fn is_signature_verification_enabled(signing_key: &Option<String>) -> bool {
    signing_key
        .as_ref()
        .map(|k| !k.trim().is_empty())
        .unwrap_or(false)
}

/// Hex HMAC-SHA256 signature for `body` at `timestamp`.
pub fn sign_invocation(signing_key: &str, timestamp: &str, body: &[u8]) -> Option<String> {
    let mut mac = HmacSha256::new_from_slice(signing_key.as_bytes()).ok()?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(body);
    Some(hex::encode(mac.finalize().into_bytes()))
}
