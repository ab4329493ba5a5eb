use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// HMAC-SHA256 over the exact payload bytes, lowercase hex encoded.
///
/// The signature is sent as `X-Webhook-Signature` so receivers can check
/// integrity and origin with their copy of the secret.
pub fn sign(payload: &[u8], secret: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret).expect("hmac accepts keys of any length");
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

/// Check a hex signature against the payload in constant time.
pub fn verify(payload: &[u8], secret: &[u8], signature_hex: &str) -> bool {
    let expected = sign(payload, secret);
    let provided = signature_hex.trim().to_ascii_lowercase();
    if expected.len() != provided.len() {
        return false;
    }
    expected.as_bytes().ct_eq(provided.as_bytes()).into()
}
