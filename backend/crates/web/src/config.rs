//! Web Configuration

use std::time::Duration;

use platform::cookie::{CookieConfig, SameSite};

/// Framework configuration shared by every request
#[derive(Debug, Clone)]
pub struct WebConfig {
    /// Shown in page titles and mail
    pub app_name: String,
    /// Absolute base URL used in mail links
    pub app_url: String,
    /// Session cookie name
    pub session_cookie_name: String,
    /// Session secret key for HMAC signing (32 bytes)
    pub session_secret: [u8; 32],
    /// Idle lifetime of a session
    pub session_ttl: Duration,
    /// Whether to require Secure cookie
    pub cookie_secure: bool,
    /// SameSite policy
    pub cookie_same_site: SameSite,
    /// Reject POST requests without a matching `csrf_token` field
    pub csrf_protection: bool,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            app_name: "BondoMVC".to_string(),
            app_url: "http://localhost:8080".to_string(),
            session_cookie_name: "bondo_session".to_string(),
            session_secret: [0u8; 32],
            session_ttl: Duration::from_secs(2 * 3600), // 2 hours
            cookie_secure: true,
            cookie_same_site: SameSite::Lax,
            csrf_protection: true,
        }
    }
}

impl WebConfig {
    /// Create config with a random session secret
    pub fn with_random_secret() -> Self {
        let mut secret = [0u8; 32];
        secret.copy_from_slice(&platform::crypto::random_bytes(32));
        Self {
            session_secret: secret,
            ..Default::default()
        }
    }

    /// Create config for development (insecure cookie, no CSRF check)
    pub fn development() -> Self {
        Self {
            cookie_secure: false,
            csrf_protection: false,
            ..Self::with_random_secret()
        }
    }

    /// Cookie attributes for the session cookie
    pub fn session_cookie(&self) -> CookieConfig {
        CookieConfig {
            name: self.session_cookie_name.clone(),
            secure: self.cookie_secure,
            http_only: true,
            same_site: self.cookie_same_site,
            path: "/".to_string(),
            max_age: Some(self.session_ttl),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_development_relaxes_cookie_and_csrf() {
        let config = WebConfig::development();
        assert!(!config.cookie_secure);
        assert!(!config.csrf_protection);
        assert_ne!(config.session_secret, [0u8; 32]);
    }

    #[test]
    fn test_session_cookie_attributes() {
        let cookie = WebConfig::default().session_cookie().build_set_cookie("v");
        assert!(cookie.starts_with("bondo_session=v;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Secure"));
        assert!(cookie.contains("Max-Age=7200"));
    }
}
