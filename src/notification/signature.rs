//! HMAC authenticity check for webhook payloads.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::warn;

type HmacSha256 = Hmac<Sha256>;

/// Verify the webhook signature header against the exact raw request body.
///
/// Accounts without a configured secret skip verification entirely and
/// accept the payload; the skip is logged so operators can spot an
/// unprotected deployment.
pub fn verify_signature(raw_body: &[u8], signature: &str, secret: Option<&str>) -> bool {
    let secret = match secret {
        Some(s) if !s.is_empty() => s,
        _ => {
            warn!("No webhook secret configured, skipping signature verification");
            return true;
        }
    };

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(raw_body);
    let computed_signature = hex::encode(mac.finalize().into_bytes());

    let provided_signature = signature.trim();

    // Constant-time comparison to prevent timing attacks
    if computed_signature.len() != provided_signature.len() {
        return false;
    }

    computed_signature
        .as_bytes()
        .iter()
        .zip(provided_signature.as_bytes().iter())
        .fold(0, |acc, (a, b)| acc | (a ^ b))
        == 0
}
