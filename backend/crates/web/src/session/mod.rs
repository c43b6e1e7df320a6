//! Sessions
//!
//! A [`Session`] is the request-local copy of what the [`SessionStore`]
//! keeps for one browser: the signed-in user id, flash messages and the
//! CSRF token. The browser only ever holds `id.signature`.

pub mod memory;
pub mod postgres;
pub mod store;

use std::collections::BTreeMap;

use auth::UserSession;
use auth::models::UserId;
use kernel::error::app_error::AppError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use memory::MemorySessionStore;
pub use postgres::PgSessionStore;
pub use store::{SessionStore, spawn_cleanup};

/// Bytes of randomness in a session id
const SESSION_ID_BYTES: usize = 32;

/// Bytes of randomness in a CSRF token
const CSRF_TOKEN_BYTES: usize = 32;

pub type SessionResult<T> = Result<T, SessionError>;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session storage error: {0}")]
    Storage(#[source] AppError),

    #[error("Session data could not be encoded: {0}")]
    Encoding(#[from] serde_json::Error),
}

impl From<sqlx::Error> for SessionError {
    fn from(err: sqlx::Error) -> Self {
        SessionError::Storage(AppError::from(err))
    }
}

/// A flash entry: either a single message or per-field form errors
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FlashValue {
    Message(String),
    Errors(BTreeMap<String, String>),
}

impl From<&str> for FlashValue {
    fn from(message: &str) -> Self {
        FlashValue::Message(message.to_string())
    }
}

impl From<String> for FlashValue {
    fn from(message: String) -> Self {
        FlashValue::Message(message)
    }
}

impl From<BTreeMap<String, String>> for FlashValue {
    fn from(errors: BTreeMap<String, String>) -> Self {
        FlashValue::Errors(errors)
    }
}

/// What the store persists per session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub flash: BTreeMap<String, FlashValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub csrf_token: Option<String>,
}

/// Request-local session
#[derive(Debug)]
pub struct Session {
    id: String,
    data: SessionData,
    is_new: bool,
    dirty: bool,
    /// Id this session was loaded under, when it has since been rotated
    replaced_id: Option<String>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// A fresh, anonymous session with a new random id
    pub fn new() -> Self {
        Self {
            id: platform::crypto::random_token(SESSION_ID_BYTES),
            data: SessionData::default(),
            is_new: true,
            dirty: false,
            replaced_id: None,
        }
    }

    /// A session restored from the store
    pub fn from_store(id: String, data: SessionData) -> Self {
        Self {
            id,
            data,
            is_new: false,
            dirty: false,
            replaced_id: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn data(&self) -> &SessionData {
        &self.data
    }

    /// Never stored before this request
    pub fn is_new(&self) -> bool {
        self.is_new
    }

    /// Modified during this request
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Id to delete from the store after a rotation
    pub fn replaced_id(&self) -> Option<&str> {
        self.replaced_id.as_deref()
    }

    /// Move the data to a new id; the old one is destroyed on save
    pub fn regenerate_id(&mut self) {
        let old = std::mem::replace(
            &mut self.id,
            platform::crypto::random_token(SESSION_ID_BYTES),
        );
        if !self.is_new && self.replaced_id.is_none() {
            self.replaced_id = Some(old);
        }
        self.dirty = true;
    }

    /// Set a flash entry, replacing any previous value under `key`
    pub fn flash(&mut self, key: &str, value: impl Into<FlashValue>) {
        self.data.flash.insert(key.to_string(), value.into());
        self.dirty = true;
    }

    pub fn get_flash(&self, key: &str) -> Option<&FlashValue> {
        self.data.flash.get(key)
    }

    /// Remove and return every flash entry
    pub fn take_flash(&mut self) -> BTreeMap<String, FlashValue> {
        if self.data.flash.is_empty() {
            return BTreeMap::new();
        }
        self.dirty = true;
        std::mem::take(&mut self.data.flash)
    }

    /// The session's CSRF token, created on first use
    pub fn csrf_token(&mut self) -> &str {
        if self.data.csrf_token.is_none() {
            self.dirty = true;
        }
        self.data
            .csrf_token
            .get_or_insert_with(|| platform::crypto::random_hex(CSRF_TOKEN_BYTES))
    }

    /// Constant-time check of a submitted token
    pub fn verify_csrf(&self, submitted: &str) -> bool {
        match &self.data.csrf_token {
            Some(token) => {
                platform::crypto::constant_time_eq(token.as_bytes(), submitted.as_bytes())
            }
            None => false,
        }
    }
}

impl UserSession for Session {
    fn user_id(&self) -> Option<UserId> {
        self.data.user_id
    }

    fn set_user_id(&mut self, id: UserId) {
        // New privilege level, new id
        self.regenerate_id();
        self.data.user_id = Some(id);
    }

    fn clear_user_id(&mut self) {
        if self.data.user_id.take().is_some() {
            self.regenerate_id();
        }
    }
}
