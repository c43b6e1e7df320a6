//! User Password Value Object
//!
//! Domain wrappers around `platform::password`: [`RawPassword`] for what
//! the visitor typed, [`UserPassword`] for what storage keeps.
//!
//! ```rust
//! use auth::domain::value_object::user_password::{RawPassword, UserPassword};
//!
//! let raw = RawPassword::new("correct horse");
//! raw.validate().unwrap();
//!
//! let hashed = UserPassword::from_raw(&raw, None).unwrap();
//! assert!(hashed.verify(&raw, None));
//! ```

use kernel::error::app_error::{AppError, AppResult};
use platform::password::{
    ClearTextPassword, HashedPassword, MAX_PASSWORD_LENGTH, MIN_PASSWORD_LENGTH,
    PasswordHashError, PasswordPolicyError,
};
use std::fmt;

// ============================================================================
// Raw Password (User Input)
// ============================================================================

/// Raw password from user input
///
/// Construction never fails: sign in must be able to check any input
/// against the stored hash. Registration and password changes call
/// [`RawPassword::validate`] first.
pub struct RawPassword(ClearTextPassword);

impl RawPassword {
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(ClearTextPassword::new(raw))
    }

    /// Enforce the length and character policy for new passwords
    pub fn validate(&self) -> AppResult<()> {
        self.0
            .check_policy(MIN_PASSWORD_LENGTH, MAX_PASSWORD_LENGTH)
            .map_err(|e| match e {
                PasswordPolicyError::TooShort { min, .. } => AppError::bad_request(format!(
                    "Password must be at least {} characters",
                    min
                ))
                .with_action("Please choose a longer password"),

                PasswordPolicyError::TooLong { max, .. } => AppError::bad_request(format!(
                    "Password must be at most {} characters",
                    max
                ))
                .with_action("Please choose a shorter password"),

                PasswordPolicyError::EmptyOrWhitespace => {
                    AppError::bad_request("Password cannot be empty")
                        .with_action("Please enter a password")
                }

                PasswordPolicyError::InvalidCharacter => {
                    AppError::bad_request("Password contains invalid characters")
                        .with_action("Please remove any special control characters")
                }
            })
    }

    pub(crate) fn inner(&self) -> &ClearTextPassword {
        &self.0
    }
}

impl fmt::Debug for RawPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RawPassword").field(&"[REDACTED]").finish()
    }
}

// ============================================================================
// User Password (Hashed, for storage)
// ============================================================================

/// Hashed user password in Argon2id PHC string format
#[derive(Clone, PartialEq, Eq)]
pub struct UserPassword(HashedPassword);

impl UserPassword {
    /// Hash a raw password; `pepper` must be the same on every call
    pub fn from_raw(raw: &RawPassword, pepper: Option<&[u8]>) -> Result<Self, PasswordHashError> {
        raw.inner().hash(pepper).map(Self)
    }

    /// Create from PHC string (from database)
    pub fn from_phc_string(phc_string: impl Into<String>) -> AppResult<Self> {
        HashedPassword::from_phc_string(phc_string)
            .map(Self)
            .map_err(|_| AppError::internal("Invalid password hash in database"))
    }

    pub fn as_phc_string(&self) -> &str {
        self.0.as_phc_string()
    }

    /// Verify a raw password against this hash
    pub fn verify(&self, raw: &RawPassword, pepper: Option<&[u8]>) -> bool {
        self.0.verify(raw.inner(), pepper)
    }

    pub fn needs_rehash(&self) -> bool {
        self.0.needs_rehash()
    }
}

impl fmt::Debug for UserPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserPassword")
            .field("hash", &"[HASH]")
            .finish()
    }
}

impl fmt::Display for UserPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[HASHED_PASSWORD]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_password_validation() {
        assert!(RawPassword::new("secret1").validate().is_ok());

        let short = "a".repeat(MIN_PASSWORD_LENGTH - 1);
        assert!(RawPassword::new(short).validate().is_err());

        let long = "a".repeat(MAX_PASSWORD_LENGTH + 1);
        assert!(RawPassword::new(long).validate().is_err());

        assert!(RawPassword::new("").validate().is_err());
    }

    #[test]
    fn test_hash_and_verify() {
        let raw = RawPassword::new("TestPassword123!");
        let hashed = UserPassword::from_raw(&raw, None).unwrap();

        assert!(hashed.verify(&raw, None));
        assert!(!hashed.verify(&RawPassword::new("WrongPassword"), None));
    }

    #[test]
    fn test_from_phc_string() {
        let raw = RawPassword::new("TestPassword123!");
        let hashed = UserPassword::from_raw(&raw, None).unwrap();

        let restored = UserPassword::from_phc_string(hashed.as_phc_string()).unwrap();
        assert!(restored.verify(&raw, None));
        assert!(UserPassword::from_phc_string("plaintext").is_err());
    }

    #[test]
    fn test_display_hides_hash() {
        let hashed = UserPassword::from_raw(&RawPassword::new("TestPassword123!"), None).unwrap();
        assert_eq!(hashed.to_string(), "[HASHED_PASSWORD]");
        assert!(!format!("{:?}", hashed).contains("argon2"));
    }
}
