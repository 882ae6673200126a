use tracing::debug;

// For signature verification
use hex::decode as hex_decode;
use hmac::{Hmac, Mac};
use sha2::Sha256;
type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "X-Hub-Signature-256";
const SIGNATURE_PREFIX: &str = "sha256=";

/// Helper function for verifying GitHub webhook signature
///
/// `signature_header` is the raw `X-Hub-Signature-256` value, e.g. `sha256=ab12...`.
/// The digest comparison is constant-time.
pub fn verify_github_signature(secret: &[u8], payload: &[u8], signature_header: &str) -> bool {
    let Some(git_signature) = signature_header.strip_prefix(SIGNATURE_PREFIX) else {
        debug!("Signature header is missing the '{}' prefix", SIGNATURE_PREFIX);
        return false;
    };

    let git_signature_bytes = match hex_decode(git_signature) {
        Ok(bytes) => bytes,
        Err(e) => {
            debug!("Signature is not valid hex: {}", e);
            return false;
        }
    };

    let mut mac = match HmacSha256::new_from_slice(secret) {
        Ok(mac) => mac,
        Err(_) => return false,
    };
    mac.update(payload);
    mac.verify_slice(&git_signature_bytes).is_ok()
}

/// Returns the first `max_chars` characters of `s`, never splitting a character.
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
