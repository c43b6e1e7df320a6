//! User Entity
//!
//! A registered account: display name, login email, password hash and an
//! optional role string.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::value_object::{
    email::Email, user_id::UserId, user_name::UserName, user_password::UserPassword,
};

/// User entity as loaded from storage
#[derive(Debug, Clone)]
pub struct User {
    /// Storage-assigned key
    pub id: UserId,
    /// Display name
    pub name: UserName,
    /// Login email, unique across users
    pub email: Email,
    pub password_hash: UserPassword,
    /// Free-form role, e.g. `"admin"`
    pub role: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn has_role(&self, role: &str) -> bool {
        self.role.as_deref() == Some(role)
    }

    /// Fields that are safe to hand to a template
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            name: self.name.to_string(),
            email: self.email.to_string(),
            role: self.role.clone(),
            created_at: self.created_at,
        }
    }
}

/// Template-facing view of a user (no password hash)
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub role: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A user that has not been stored yet
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: UserName,
    pub email: Email,
    pub password_hash: UserPassword,
    pub role: Option<String>,
}

/// Partial update; `None` leaves the column as it is
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub name: Option<UserName>,
    pub email: Option<Email>,
    pub password_hash: Option<UserPassword>,
    pub role: Option<String>,
}

impl UserChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.email.is_none()
            && self.password_hash.is_none()
            && self.role.is_none()
    }

    /// Apply to an in-memory copy, bumping `updated_at`
    pub fn apply_to(&self, user: &mut User) {
        if let Some(name) = &self.name {
            user.name = name.clone();
        }
        if let Some(email) = &self.email {
            user.email = email.clone();
        }
        if let Some(password_hash) = &self.password_hash {
            user.password_hash = password_hash.clone();
        }
        if let Some(role) = &self.role {
            user.role = Some(role.clone());
        }
        user.updated_at = Utc::now();
    }
}
