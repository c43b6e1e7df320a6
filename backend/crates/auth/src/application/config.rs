//! Application Configuration
//!
//! Configuration for the Auth application layer.

/// Auth application configuration
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Password pepper (optional, application-wide secret)
    pub password_pepper: Option<Vec<u8>>,
    /// Re-hash on successful sign in when the stored hash is outdated
    pub rehash_on_login: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            password_pepper: None,
            rehash_on_login: true,
        }
    }
}

impl AuthConfig {
    /// Create config for development (no pepper)
    pub fn development() -> Self {
        Self::default()
    }

    /// Set the application-wide pepper
    ///
    /// Changing it invalidates every stored password hash.
    pub fn with_pepper(mut self, pepper: impl Into<Vec<u8>>) -> Self {
        let pepper = pepper.into();
        self.password_pepper = (!pepper.is_empty()).then_some(pepper);
        self
    }

    /// Get password pepper as slice
    pub fn pepper(&self) -> Option<&[u8]> {
        self.password_pepper.as_deref()
    }
}
