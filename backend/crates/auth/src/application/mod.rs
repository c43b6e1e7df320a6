//! Application Layer
//!
//! The per-request authentication service and its configuration.

pub mod auth_service;
pub mod config;
pub mod session;

// Re-exports
pub use auth_service::{AuthService, AuthState};
pub use config::AuthConfig;
pub use session::UserSession;
