//! In-memory Repository Implementation
//!
//! Used when no database is configured and by tests. Enforces the same
//! unique-email rule as the `users` table.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use kernel::error::app_error::AppError;
use tokio::sync::RwLock;

use crate::domain::entity::user::{NewUser, User, UserChanges};
use crate::domain::repository::UserRepository;
use crate::domain::value_object::{email::Email, user_id::UserId};
use crate::error::{AuthError, AuthResult};

#[derive(Default)]
struct State {
    last_id: i64,
    users: BTreeMap<UserId, User>,
}

/// Process-local user repository; clones share the same data
#[derive(Clone)]
pub struct InMemoryUserRepository {
    state: Arc<RwLock<State>>,
    available: Arc<AtomicBool>,
}

impl Default for InMemoryUserRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(State::default())),
            available: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Simulate a storage outage; every call fails while unavailable
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of stored users
    pub async fn len(&self) -> usize {
        self.state.read().await.users.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn ensure_available(&self) -> AuthResult<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(AuthError::StorageUnavailable(AppError::service_unavailable(
                "In-memory storage disabled",
            )))
        }
    }
}

impl UserRepository for InMemoryUserRepository {
    async fn find_by_email(&self, email: &Email) -> AuthResult<Option<User>> {
        self.ensure_available()?;
        let state = self.state.read().await;
        Ok(state.users.values().find(|u| u.email == *email).cloned())
    }

    async fn find_by_id(&self, id: UserId) -> AuthResult<Option<User>> {
        self.ensure_available()?;
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn email_exists(&self, email: &Email) -> AuthResult<bool> {
        self.ensure_available()?;
        let state = self.state.read().await;
        Ok(state.users.values().any(|u| u.email == *email))
    }

    async fn create(&self, user: &NewUser) -> AuthResult<UserId> {
        self.ensure_available()?;
        let mut state = self.state.write().await;

        if state.users.values().any(|u| u.email == user.email) {
            return Err(AuthError::DuplicateEmail);
        }

        let next = state.last_id + 1;
        let id = UserId::new(next)
            .ok_or_else(|| AuthError::Internal(format!("Invalid user id: {}", next)))?;
        state.last_id = next;

        let now = Utc::now();
        state.users.insert(
            id,
            User {
                id,
                name: user.name.clone(),
                email: user.email.clone(),
                password_hash: user.password_hash.clone(),
                role: user.role.clone(),
                created_at: now,
                updated_at: now,
            },
        );

        Ok(id)
    }

    async fn update(&self, id: UserId, changes: &UserChanges) -> AuthResult<bool> {
        self.ensure_available()?;
        let mut state = self.state.write().await;

        if let Some(email) = &changes.email {
            if state.users.values().any(|u| u.id != id && u.email == *email) {
                return Err(AuthError::DuplicateEmail);
            }
        }

        match state.users.get_mut(&id) {
            Some(user) => {
                changes.apply_to(user);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: UserId) -> AuthResult<bool> {
        self.ensure_available()?;
        Ok(self.state.write().await.users.remove(&id).is_some())
    }
}
