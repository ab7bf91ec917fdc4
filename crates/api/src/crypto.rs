//! Cryptographic helpers for authentication and sessions.
//!
//! - PBKDF2-SHA256 password hashing (600k iterations)
//! - HMAC-SHA256 signing/verification for the session cookie
//!
//! Pure Rust crates only; no OS crypto interop.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use hmac::{Hmac, Mac};
use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;

use crate::ServiceError;

const PBKDF2_ITERATIONS: u32 = 600_000;
const SALT_LEN: usize = 16;
const HASH_LEN: usize = 32;

// ── Password hashing ────────────────────────────────────────────────────────

/// Hash a password with PBKDF2-SHA256. Returns `(hash_hex, salt_hex)`.
pub fn hash_password(password: &str) -> Result<(String, String), ServiceError> {
    let mut salt = [0u8; SALT_LEN];
    getrandom::getrandom(&mut salt)
        .map_err(|e| ServiceError::Internal(format!("RNG failure: {e}")))?;

    let mut hash = [0u8; HASH_LEN];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), &salt, PBKDF2_ITERATIONS, &mut hash);

    Ok((hex::encode(hash), hex::encode(salt)))
}

/// Verify a password against a stored hash and salt (both hex-encoded).
pub fn verify_password(password: &str, hash_hex: &str, salt_hex: &str) -> bool {
    let Ok(salt) = hex::decode(salt_hex) else {
        return false;
    };
    let Ok(expected) = hex::decode(hash_hex) else {
        return false;
    };

    let mut hash = [0u8; HASH_LEN];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), &salt, PBKDF2_ITERATIONS, &mut hash);

    // Constant-time comparison
    hash.len() == expected.len() && hash.iter().zip(expected.iter()).all(|(a, b)| a == b)
}

// ── Signed payloads (session cookie) ────────────────────────────────────────

/// Sign an opaque payload. Returns `b64url(payload).b64url(hmac)`.
pub fn sign_payload(payload: &[u8], secret: &str) -> String {
    let body = URL_SAFE_NO_PAD.encode(payload);
    let sig = hmac_sha256(secret.as_bytes(), body.as_bytes());
    format!("{}.{}", body, URL_SAFE_NO_PAD.encode(sig))
}

/// Verify a signed payload and return the raw bytes if the signature holds.
pub fn verify_payload(token: &str, secret: &str) -> Result<Vec<u8>, ServiceError> {
    let Some((body, sig)) = token.split_once('.') else {
        return Err(ServiceError::Unauthorized("invalid token format".into()));
    };

    let expected = hmac_sha256(secret.as_bytes(), body.as_bytes());
    let actual = URL_SAFE_NO_PAD
        .decode(sig)
        .map_err(|_| ServiceError::Unauthorized("invalid signature encoding".into()))?;

    if expected.len() != actual.len()
        || !expected.iter().zip(actual.iter()).all(|(a, b)| a == b)
    {
        return Err(ServiceError::Unauthorized("invalid signature".into()));
    }

    URL_SAFE_NO_PAD
        .decode(body)
        .map_err(|_| ServiceError::Unauthorized("invalid payload encoding".into()))
}

/// Generate a random hex secret, used when `SESSION_SECRET` is unset.
pub fn generate_secret() -> Result<String, ServiceError> {
    let mut bytes = [0u8; 32];
    getrandom::getrandom(&mut bytes)
        .map_err(|e| ServiceError::Internal(format!("RNG failure: {e}")))?;
    Ok(hex::encode(bytes))
}

// ── Internal ────────────────────────────────────────────────────────────────

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = Hmac::<Sha256>::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_roundtrip() {
        let (hash, salt) = hash_password("hunter22").unwrap();
        assert!(verify_password("hunter22", &hash, &salt));
        assert!(!verify_password("hunter23", &hash, &salt));
    }

    #[test]
    fn verify_rejects_bad_hex() {
        assert!(!verify_password("pw", "zz-not-hex", "also-not-hex"));
    }

    #[test]
    fn signed_payload_roundtrip() {
        let token = sign_payload(b"{\"a\":1}", "secret");
        let raw = verify_payload(&token, "secret").unwrap();
        assert_eq!(raw, b"{\"a\":1}");
    }

    #[test]
    fn signed_payload_rejects_wrong_secret() {
        let token = sign_payload(b"data", "secret");
        assert!(verify_payload(&token, "other").is_err());
    }

    #[test]
    fn signed_payload_rejects_tampered_body() {
        let token = sign_payload(b"data", "secret");
        let (_, sig) = token.split_once('.').unwrap();
        let forged = format!(
            "{}.{}",
            base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(b"evil"),
            sig
        );
        assert!(verify_payload(&forged, "secret").is_err());
    }
}
