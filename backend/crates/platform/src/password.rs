//! Password Hashing and Verification
//!
//! - Argon2id hashing with a per-hash random salt (PHC string format)
//! - Zeroization of clear text on drop
//! - Verification through the hash's own parameters, in constant time
//!
//! Length policy lives in [`ClearTextPassword::check_policy`] so that the
//! form validator and the hashing path agree on what a password is.

use std::fmt;

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use rand::rngs::OsRng;
use thiserror::Error;
use unicode_normalization::UnicodeNormalization;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Minimum password length accepted by the registration forms
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Maximum password length (keeps Argon2 input bounded)
pub const MAX_PASSWORD_LENGTH: usize = 128;

// ============================================================================
// Error Types
// ============================================================================

/// Password policy violation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PasswordPolicyError {
    #[error("Password must be at least {min} characters (got {actual})")]
    TooShort { min: usize, actual: usize },

    #[error("Password must be at most {max} characters (got {actual})")]
    TooLong { max: usize, actual: usize },

    #[error("Password cannot be empty or contain only whitespace")]
    EmptyOrWhitespace,

    #[error("Password contains invalid control characters")]
    InvalidCharacter,
}

/// Password hashing errors
#[derive(Debug, Error)]
pub enum PasswordHashError {
    #[error("Password hashing failed: {0}")]
    HashingFailed(String),

    #[error("Invalid password hash format")]
    InvalidHashFormat,
}

// ============================================================================
// Clear Text Password (Zeroized on drop)
// ============================================================================

/// Clear text password, erased from memory when dropped
///
/// Input is NFKC-normalized on construction so that hashing and verification
/// see the same bytes regardless of how the browser composed the characters.
/// Not `Clone`; `Debug` output is redacted.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct ClearTextPassword(String);

impl ClearTextPassword {
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(raw.as_ref().nfkc().collect())
    }

    /// Validate length and character rules
    pub fn check_policy(&self, min: usize, max: usize) -> Result<(), PasswordPolicyError> {
        if self.0.trim().is_empty() {
            return Err(PasswordPolicyError::EmptyOrWhitespace);
        }

        // Count code points, not bytes
        let char_count = self.0.chars().count();
        if char_count < min {
            return Err(PasswordPolicyError::TooShort {
                min,
                actual: char_count,
            });
        }
        if char_count > max {
            return Err(PasswordPolicyError::TooLong {
                max,
                actual: char_count,
            });
        }

        if self
            .0
            .chars()
            .any(|ch| ch.is_control() && ch != '\t' && ch != '\n')
        {
            return Err(PasswordPolicyError::InvalidCharacter);
        }

        Ok(())
    }

    fn peppered(&self, pepper: Option<&[u8]>) -> Vec<u8> {
        let mut bytes = self.0.as_bytes().to_vec();
        if let Some(p) = pepper {
            bytes.extend_from_slice(p);
        }
        bytes
    }

    /// Hash with Argon2id and a fresh random salt
    pub fn hash(&self, pepper: Option<&[u8]>) -> Result<HashedPassword, PasswordHashError> {
        let mut password_bytes = self.peppered(pepper);
        let salt = SaltString::generate(&mut OsRng);

        // OWASP defaults: m=19456 (19 MiB), t=2, p=1
        let result = Argon2::default()
            .hash_password(&password_bytes, &salt)
            .map(|hash| HashedPassword {
                hash: hash.to_string(),
            })
            .map_err(|e| PasswordHashError::HashingFailed(e.to_string()));

        password_bytes.zeroize();
        result
    }
}

impl fmt::Debug for ClearTextPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ClearTextPassword")
            .field(&"[REDACTED]")
            .finish()
    }
}

// ============================================================================
// Hashed Password (Safe to store)
// ============================================================================

/// Argon2id hash in PHC string format (algorithm, params, salt, digest)
#[derive(Clone, PartialEq, Eq)]
pub struct HashedPassword {
    hash: String,
}

impl HashedPassword {
    /// Parse a PHC string loaded from storage
    pub fn from_phc_string(s: impl Into<String>) -> Result<Self, PasswordHashError> {
        let hash = s.into();
        PasswordHash::new(&hash).map_err(|_| PasswordHashError::InvalidHashFormat)?;
        Ok(Self { hash })
    }

    pub fn as_phc_string(&self) -> &str {
        &self.hash
    }

    /// Verify a password against this hash
    ///
    /// An unparsable stored hash verifies nothing.
    pub fn verify(&self, password: &ClearTextPassword, pepper: Option<&[u8]>) -> bool {
        let Ok(parsed_hash) = PasswordHash::new(&self.hash) else {
            return false;
        };

        let mut password_bytes = password.peppered(pepper);
        let ok = Argon2::default()
            .verify_password(&password_bytes, &parsed_hash)
            .is_ok();
        password_bytes.zeroize();
        ok
    }

    /// True when the stored hash was not produced by Argon2id
    pub fn needs_rehash(&self) -> bool {
        match PasswordHash::new(&self.hash) {
            Ok(parsed) => parsed.algorithm != argon2::Algorithm::Argon2id.ident(),
            Err(_) => true,
        }
    }
}

impl fmt::Debug for HashedPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashedPassword")
            .field("hash", &"[HASH]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(raw: &str) -> Result<(), PasswordPolicyError> {
        ClearTextPassword::new(raw).check_policy(MIN_PASSWORD_LENGTH, MAX_PASSWORD_LENGTH)
    }

    #[test]
    fn test_policy_too_short() {
        assert!(matches!(
            policy("abc"),
            Err(PasswordPolicyError::TooShort { min: 6, actual: 3 })
        ));
    }

    #[test]
    fn test_policy_too_long() {
        let long = "a".repeat(MAX_PASSWORD_LENGTH + 1);
        assert!(matches!(
            policy(&long),
            Err(PasswordPolicyError::TooLong { .. })
        ));
    }

    #[test]
    fn test_policy_whitespace_only() {
        assert_eq!(policy("        "), Err(PasswordPolicyError::EmptyOrWhitespace));
        assert_eq!(policy(""), Err(PasswordPolicyError::EmptyOrWhitespace));
    }

    #[test]
    fn test_policy_control_character() {
        assert_eq!(
            policy("abc\u{0007}defg"),
            Err(PasswordPolicyError::InvalidCharacter)
        );
    }

    #[test]
    fn test_policy_counts_code_points() {
        // 6 code points, 18 bytes
        assert!(policy("パスワード安").is_ok());
    }

    #[test]
    fn test_hash_and_verify() {
        let password = ClearTextPassword::new("correct horse");
        let hashed = password.hash(None).unwrap();

        assert!(hashed.verify(&password, None));
        assert!(!hashed.verify(&ClearTextPassword::new("wrong horse"), None));
        assert!(!hashed.needs_rehash());
    }

    #[test]
    fn test_same_password_gets_distinct_salts() {
        let password = ClearTextPassword::new("correct horse");
        let a = password.hash(None).unwrap();
        let b = password.hash(None).unwrap();
        assert_ne!(a.as_phc_string(), b.as_phc_string());
    }

    #[test]
    fn test_hash_with_pepper() {
        let password = ClearTextPassword::new("correct horse");
        let hashed = password.hash(Some(b"pepper")).unwrap();

        assert!(hashed.verify(&password, Some(b"pepper")));
        assert!(!hashed.verify(&password, None));
        assert!(!hashed.verify(&password, Some(b"salt")));
    }

    #[test]
    fn test_nfkc_normalization_on_both_paths() {
        // U+FF21 FULLWIDTH LATIN CAPITAL LETTER A normalizes to "A"
        let hashed = ClearTextPassword::new("\u{FF21}bcdefg").hash(None).unwrap();
        assert!(hashed.verify(&ClearTextPassword::new("Abcdefg"), None));
    }

    #[test]
    fn test_phc_string_roundtrip() {
        let password = ClearTextPassword::new("correct horse");
        let phc = password.hash(None).unwrap().as_phc_string().to_string();
        let restored = HashedPassword::from_phc_string(phc).unwrap();
        assert!(restored.verify(&password, None));
    }

    #[test]
    fn test_invalid_phc_string() {
        assert!(HashedPassword::from_phc_string("not_a_valid_hash").is_err());
    }

    #[test]
    fn test_debug_redaction() {
        let password = ClearTextPassword::new("hunter22");
        let debug_output = format!("{:?}", password);
        assert!(debug_output.contains("REDACTED"));
        assert!(!debug_output.contains("hunter22"));

        let hashed = password.hash(None).unwrap();
        assert!(!format!("{:?}", hashed).contains("argon2id"));
    }
}
