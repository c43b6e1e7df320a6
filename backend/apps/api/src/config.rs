//! Application Configuration
//!
//! Read once from the environment (after `.env` is loaded).

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, bail};
use auth::AuthConfig;
use base64::Engine;
use base64::engine::general_purpose;
use web::WebConfig;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub app_name: String,
    pub app_env: String,
    pub app_debug: bool,
    pub app_url: String,
    pub bind_addr: SocketAddr,
    /// `None` runs on in-memory storage
    pub database_url: Option<String>,
    /// `None` outside development is a startup error
    pub session_secret: Option<[u8; 32]>,
    pub views_dir: PathBuf,
    pub password_pepper: Option<Vec<u8>>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let app_env = var_or("APP_ENV", "development");

        let session_secret = match non_empty("SESSION_SECRET") {
            Some(encoded) => Some(decode_secret(&encoded)?),
            None if app_env == "development" => None,
            None => bail!("SESSION_SECRET must be set when APP_ENV={}", app_env),
        };

        let bind_addr = var_or("BIND_ADDR", "0.0.0.0:8080");

        Ok(Self {
            app_name: var_or("APP_NAME", "BondoMVC"),
            app_debug: non_empty("APP_DEBUG").is_some_and(|v| v == "true" || v == "1"),
            app_url: var_or("APP_URL", "http://localhost:8080"),
            bind_addr: bind_addr
                .parse()
                .with_context(|| format!("BIND_ADDR is not a socket address: {}", bind_addr))?,
            database_url: non_empty("DATABASE_URL"),
            session_secret,
            views_dir: PathBuf::from(var_or("VIEWS_DIR", "views")),
            password_pepper: non_empty("PASSWORD_PEPPER").map(String::into_bytes),
            app_env,
        })
    }

    pub fn is_development(&self) -> bool {
        self.app_env == "development"
    }

    pub fn web_config(&self) -> WebConfig {
        let base = match self.session_secret {
            Some(secret) => WebConfig {
                session_secret: secret,
                ..WebConfig::default()
            },
            // Sessions do not survive a restart
            None => WebConfig::development(),
        };

        WebConfig {
            app_name: self.app_name.clone(),
            app_url: self.app_url.trim_end_matches('/').to_string(),
            cookie_secure: !self.is_development(),
            csrf_protection: true,
            ..base
        }
    }

    pub fn auth_config(&self) -> AuthConfig {
        match &self.password_pepper {
            Some(pepper) => AuthConfig::default().with_pepper(pepper.clone()),
            None => AuthConfig::default(),
        }
    }
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn var_or(key: &str, default: &str) -> String {
    non_empty(key).unwrap_or_else(|| default.to_string())
}

fn decode_secret(encoded: &str) -> anyhow::Result<[u8; 32]> {
    let bytes = general_purpose::STANDARD
        .decode(encoded.trim())
        .context("SESSION_SECRET is not valid base64")?;
    bytes.try_into().map_err(|bytes: Vec<u8>| {
        anyhow::anyhow!("SESSION_SECRET must be 32 bytes, got {}", bytes.len())
    })
}
