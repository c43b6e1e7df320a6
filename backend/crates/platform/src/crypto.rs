//! Cryptographic Utilities

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use hmac::{Hmac, Mac};
use rand::{RngCore, rngs::OsRng};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Generate cryptographically secure random bytes
pub fn random_bytes(len: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; len];
    OsRng.fill_bytes(&mut bytes);
    bytes
}

/// Random token as URL-safe base64 (no padding), suitable for cookies
pub fn random_token(len: usize) -> String {
    URL_SAFE_NO_PAD.encode(random_bytes(len))
}

/// Random token as lowercase hex, suitable for form fields
pub fn random_hex(len: usize) -> String {
    to_hex(&random_bytes(len))
}

/// Encode bytes as lowercase hex
pub fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Compute HMAC-SHA256
pub fn hmac_sha256(key: &[u8], data: &[u8]) -> [u8; 32] {
    let mut mac =
        <HmacSha256 as Mac>::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(data);
    mac.finalize().into_bytes().into()
}

/// Append an HMAC signature: `value.signature`
pub fn sign(key: &[u8], value: &str) -> String {
    let signature = hmac_sha256(key, value.as_bytes());
    format!("{}.{}", value, URL_SAFE_NO_PAD.encode(signature))
}

/// Verify a `value.signature` token and return the value part
///
/// The signature check runs in constant time.
pub fn verify_signed<'a>(key: &[u8], token: &'a str) -> Option<&'a str> {
    let (value, signature_b64) = token.rsplit_once('.')?;
    let signature = URL_SAFE_NO_PAD.decode(signature_b64).ok()?;

    let mut mac = <HmacSha256 as Mac>::new_from_slice(key).ok()?;
    mac.update(value.as_bytes());
    mac.verify_slice(&signature).ok()?;

    Some(value)
}

/// Constant-time comparison to prevent timing attacks
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_bytes() {
        let bytes = random_bytes(32);
        assert_eq!(bytes.len(), 32);
        assert!(bytes.iter().any(|&b| b != 0));
    }

    #[test]
    fn test_random_token_is_url_safe() {
        let token = random_token(32);
        assert_eq!(token.len(), 43);
        assert!(
            token
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
        assert_ne!(token, random_token(32));
    }

    #[test]
    fn test_random_hex() {
        let token = random_hex(32);
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_hmac_known_vector() {
        // RFC 4231 test case 2
        let mac = hmac_sha256(b"Jefe", b"what do ya want for nothing?");
        let expected =
            hex::decode("5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843")
                .unwrap();
        assert_eq!(mac.to_vec(), expected);
    }

    #[test]
    fn test_sign_and_verify() {
        let key = [7u8; 32];
        let token = sign(&key, "session-abc");
        assert_eq!(verify_signed(&key, &token), Some("session-abc"));
    }

    #[test]
    fn test_verify_rejects_tampering() {
        let key = [7u8; 32];
        let token = sign(&key, "session-abc");

        let forged = token.replacen("session-abc", "session-abd", 1);
        assert_eq!(verify_signed(&key, &forged), None);
        assert_eq!(verify_signed(&[8u8; 32], &token), None);
        assert_eq!(verify_signed(&key, "no-signature"), None);
        assert_eq!(verify_signed(&key, "value.!!!"), None);
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"abcd", b"abcd"));
        assert!(!constant_time_eq(b"abcd", b"abce"));
        assert!(!constant_time_eq(b"abc", b"abcd"));
    }
}
