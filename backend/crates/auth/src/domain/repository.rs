//! Repository Traits
//!
//! Interfaces for data persistence. Implementations are in the
//! infrastructure layer.

use crate::domain::entity::user::{NewUser, User, UserChanges};
use crate::domain::value_object::{email::Email, user_id::UserId};
use crate::error::AuthResult;

/// User repository trait
///
/// Every method fails only when storage is unreachable or rejects the
/// write; "not found" is `Ok(None)` / `Ok(false)`.
#[trait_variant::make(UserRepository: Send)]
pub trait LocalUserRepository {
    /// Find user by email (already normalized by [`Email`])
    async fn find_by_email(&self, email: &Email) -> AuthResult<Option<User>>;

    /// Find user by ID
    async fn find_by_id(&self, id: UserId) -> AuthResult<Option<User>>;

    /// Check if email is registered
    async fn email_exists(&self, email: &Email) -> AuthResult<bool>;

    /// Store a new user and return its assigned ID
    ///
    /// A duplicate email fails with `AuthError::DuplicateEmail`.
    async fn create(&self, user: &NewUser) -> AuthResult<UserId>;

    /// Apply a partial update; `false` when no such user exists
    async fn update(&self, id: UserId, changes: &UserChanges) -> AuthResult<bool>;

    /// Delete user; `false` when no such user exists
    async fn delete(&self, id: UserId) -> AuthResult<bool>;
}
