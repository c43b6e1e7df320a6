//! Auth (Authentication) Module
//!
//! Clean Architecture structure:
//! - `domain/` - Entities, value objects, repository traits
//! - `application/` - The per-request authentication service
//! - `infra/` - PostgreSQL and in-memory repositories
//!
//! ## Features
//! - Email + password sign in, registration, sign out
//! - Password reset by email (no re-authentication)
//! - Optional role string per user
//!
//! ## Security Model
//! - Passwords hashed with Argon2id, optional application pepper
//! - Emails stored case-folded so lookups never depend on input casing
//! - The session carries nothing but the user id; the user record is
//!   reloaded on every request

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;

// Re-exports for convenience
pub use application::{
    auth_service::{AuthService, AuthState},
    config::AuthConfig,
    session::UserSession,
};
pub use error::{AuthError, AuthResult};
pub use infra::{memory::InMemoryUserRepository, postgres::PgUserRepository};

// Re-export kernel error types for unified error handling
pub use kernel::error::{
    app_error::{AppError, AppResult},
    kind::ErrorKind,
};

pub mod models {
    pub use crate::domain::entity::*;
    pub use crate::domain::value_object::*;
}
