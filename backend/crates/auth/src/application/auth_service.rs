//! Auth Service
//!
//! Per-request authentication state, seeded from the session.
//!
//! ```text
//!            attempt / register / login
//! Anonymous ───────────────────────────▶ Authenticated(user_id)
//!     ▲                                          │
//!     └──────────────── logout ──────────────────┘
//! ```
//!
//! Only [`AuthService::login`] and [`AuthService::logout`] touch the
//! session, and only its user id.

use std::sync::{Arc, OnceLock};

use crate::application::config::AuthConfig;
use crate::application::session::UserSession;
use crate::domain::entity::user::{NewUser, User, UserChanges};
use crate::domain::repository::UserRepository;
use crate::domain::value_object::{
    email::Email,
    user_id::UserId,
    user_name::UserName,
    user_password::{RawPassword, UserPassword},
};
use crate::error::{AuthError, AuthResult};

/// Authentication state of the current request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Anonymous,
    Authenticated(UserId),
}

/// Hash checked when the email is unknown, so that both failure paths of
/// a sign in cost one Argon2 verification
fn dummy_hash() -> Option<&'static UserPassword> {
    static DUMMY: OnceLock<Option<UserPassword>> = OnceLock::new();
    DUMMY
        .get_or_init(|| {
            let raw = RawPassword::new(platform::crypto::random_token(16));
            UserPassword::from_raw(&raw, None).ok()
        })
        .as_ref()
}

/// Authentication service
///
/// Built once per request; nothing here outlives the request except what
/// is written to the session.
pub struct AuthService<R>
where
    R: UserRepository,
{
    users: Arc<R>,
    config: Arc<AuthConfig>,
    user: Option<User>,
}

impl<R> AuthService<R>
where
    R: UserRepository + Send + Sync,
{
    /// An anonymous service, not yet bound to any session
    pub fn new(users: Arc<R>, config: Arc<AuthConfig>) -> Self {
        Self {
            users,
            config,
            user: None,
        }
    }

    /// Restore the signed-in user from the session
    ///
    /// A user that no longer exists, or a storage failure, leaves the
    /// service anonymous. Neither fails the request.
    pub async fn init<S>(users: Arc<R>, config: Arc<AuthConfig>, session: &S) -> Self
    where
        S: UserSession,
    {
        let mut service = Self::new(users, config);

        let Some(user_id) = session.user_id() else {
            return service;
        };

        match service.users.find_by_id(user_id).await {
            Ok(Some(user)) => service.user = Some(user),
            Ok(None) => {
                tracing::info!(user_id = %user_id, "Session user no longer exists");
            }
            Err(e) => {
                tracing::error!(
                    user_id = %user_id,
                    error = %e,
                    "Failed to load session user, continuing as anonymous"
                );
            }
        }

        service
    }

    /// Sign in with email and password
    ///
    /// `Ok(false)` for an unknown email and for a wrong password alike.
    /// `Err` only when storage fails.
    pub async fn attempt<S>(
        &mut self,
        session: &mut S,
        email: &str,
        password: &str,
    ) -> AuthResult<bool>
    where
        S: UserSession,
    {
        match self.authenticate(email, password).await {
            Ok(user) => {
                self.login(session, user);
                Ok(true)
            }
            Err(AuthError::InvalidCredentials) => {
                tracing::warn!("Sign in failed");
                Ok(false)
            }
            Err(e) => {
                e.log();
                Err(e)
            }
        }
    }

    /// Resolve credentials to a user without touching any session
    pub async fn authenticate(&self, email: &str, password: &str) -> AuthResult<User> {
        let raw_password = RawPassword::new(password);
        let pepper = self.config.pepper();

        // An email that cannot be valid cannot belong to anyone
        let found = match Email::new(email) {
            Ok(email) => self.users.find_by_email(&email).await?,
            Err(_) => None,
        };

        let Some(user) = found else {
            if let Some(dummy) = dummy_hash() {
                let _ = dummy.verify(&raw_password, pepper);
            }
            return Err(AuthError::InvalidCredentials);
        };

        if !user.password_hash.verify(&raw_password, pepper) {
            return Err(AuthError::InvalidCredentials);
        }

        if self.config.rehash_on_login && user.password_hash.needs_rehash() {
            self.rehash(&user, &raw_password).await;
        }

        Ok(user)
    }

    async fn rehash(&self, user: &User, raw_password: &RawPassword) {
        let password_hash = match UserPassword::from_raw(raw_password, self.config.pepper()) {
            Ok(hash) => hash,
            Err(e) => {
                tracing::warn!(user_id = %user.id, error = %e, "Password rehash failed");
                return;
            }
        };

        let changes = UserChanges {
            password_hash: Some(password_hash),
            ..UserChanges::default()
        };
        if let Err(e) = self.users.update(user.id, &changes).await {
            tracing::warn!(user_id = %user.id, error = %e, "Failed to store rehashed password");
        }
    }

    /// Bind `user` to the session without checking credentials
    pub fn login<S>(&mut self, session: &mut S, user: User)
    where
        S: UserSession,
    {
        session.set_user_id(user.id);
        tracing::info!(user_id = %user.id, "User signed in");
        self.user = Some(user);
    }

    /// Create an account and sign it in
    ///
    /// `Ok(false)` when the email is taken or the row could not be
    /// created. Malformed input is `Err(AuthError::Validation)`.
    pub async fn register<S>(
        &mut self,
        session: &mut S,
        name: &str,
        email: &str,
        password: &str,
    ) -> AuthResult<bool>
    where
        S: UserSession,
    {
        let name = UserName::new(name).map_err(AuthError::Validation)?;
        let email = Email::new(email).map_err(AuthError::Validation)?;
        let raw_password = RawPassword::new(password);
        raw_password.validate().map_err(AuthError::Validation)?;

        if self.users.email_exists(&email).await? {
            tracing::info!("Registration rejected: email already registered");
            return Ok(false);
        }

        let new_user = NewUser {
            name,
            email,
            password_hash: UserPassword::from_raw(&raw_password, self.config.pepper())?,
            role: None,
        };

        // The unique index catches a concurrent registration of the same email
        let user_id = match self.users.create(&new_user).await {
            Ok(id) => id,
            Err(AuthError::DuplicateEmail) => {
                tracing::info!("Registration lost a race on the email unique index");
                return Ok(false);
            }
            Err(e) => {
                e.log();
                return Ok(false);
            }
        };

        match self.users.find_by_id(user_id).await {
            Ok(Some(user)) => {
                tracing::info!(user_id = %user_id, "User registered");
                self.login(session, user);
                Ok(true)
            }
            Ok(None) => {
                tracing::error!(user_id = %user_id, "Created user could not be read back");
                Ok(false)
            }
            Err(e) => {
                e.log();
                Ok(false)
            }
        }
    }

    /// Forget the signed-in user; safe to call when anonymous
    pub fn logout<S>(&mut self, session: &mut S)
    where
        S: UserSession,
    {
        if let Some(user) = self.user.take() {
            tracing::info!(user_id = %user.id, "User signed out");
        }
        session.clear_user_id();
    }

    /// Replace the password of the user registered under `email`
    ///
    /// Does not sign anyone in or out. `Ok(false)` when no such user.
    pub async fn reset_password(&mut self, email: &str, new_password: &str) -> AuthResult<bool> {
        let Ok(email) = Email::new(email) else {
            return Ok(false);
        };
        let raw_password = RawPassword::new(new_password);
        raw_password.validate().map_err(AuthError::Validation)?;

        let Some(user) = self.users.find_by_email(&email).await? else {
            return Ok(false);
        };

        let changes = UserChanges {
            password_hash: Some(UserPassword::from_raw(&raw_password, self.config.pepper())?),
            ..UserChanges::default()
        };

        let updated = self.users.update(user.id, &changes).await?;
        if updated {
            tracing::info!(user_id = %user.id, "Password reset");
            self.apply_to_current(user.id, &changes);
        }
        Ok(updated)
    }

    /// Update the signed-in user's profile
    ///
    /// Changing to an email that belongs to someone else fails with
    /// `AuthError::DuplicateEmail`. `Ok(false)` when anonymous.
    pub async fn update_profile(&mut self, changes: UserChanges) -> AuthResult<bool> {
        let Some(current) = &self.user else {
            return Ok(false);
        };
        let user_id = current.id;

        if let Some(email) = changes.email.as_ref().filter(|e| **e != current.email) {
            if self.users.email_exists(email).await? {
                return Err(AuthError::DuplicateEmail);
            }
        }

        if changes.is_empty() {
            return Ok(true);
        }

        let updated = self.users.update(user_id, &changes).await?;
        if updated {
            tracing::info!(user_id = %user_id, "Profile updated");
            self.apply_to_current(user_id, &changes);
        }
        Ok(updated)
    }

    fn apply_to_current(&mut self, user_id: UserId, changes: &UserChanges) {
        if let Some(user) = self.user.as_mut().filter(|u| u.id == user_id) {
            changes.apply_to(user);
        }
    }

    /// Check `password` against the signed-in user's hash
    pub fn verify_password(&self, password: &str) -> bool {
        self.user.as_ref().is_some_and(|user| {
            user.password_hash
                .verify(&RawPassword::new(password), self.config.pepper())
        })
    }

    pub fn check(&self) -> bool {
        self.user.is_some()
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn id(&self) -> Option<UserId> {
        self.user.as_ref().map(|user| user.id)
    }

    pub fn state(&self) -> AuthState {
        match self.id() {
            Some(id) => AuthState::Authenticated(id),
            None => AuthState::Anonymous,
        }
    }

    /// True when signed in and the user carries exactly `role`
    pub fn has_role(&self, role: &str) -> bool {
        self.user.as_ref().is_some_and(|user| user.has_role(role))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::memory::InMemoryUserRepository;
    use kernel::error::app_error::AppError;

    #[derive(Default)]
    struct TestSession {
        user_id: Option<UserId>,
        writes: usize,
    }

    impl UserSession for TestSession {
        fn user_id(&self) -> Option<UserId> {
            self.user_id
        }

        fn set_user_id(&mut self, id: UserId) {
            self.user_id = Some(id);
            self.writes += 1;
        }

        fn clear_user_id(&mut self) {
            self.user_id = None;
            self.writes += 1;
        }
    }

    fn service(repo: &InMemoryUserRepository) -> AuthService<InMemoryUserRepository> {
        AuthService::new(Arc::new(repo.clone()), Arc::new(AuthConfig::default()))
    }

    async fn registered(repo: &InMemoryUserRepository) -> UserId {
        let mut auth = service(repo);
        let mut session = TestSession::default();
        assert!(
            auth.register(&mut session, "Ada", "ada@example.com", "secret1")
                .await
                .unwrap()
        );
        session.user_id.unwrap()
    }

    /// Where `FaultyRepo` departs from the in-memory repository
    #[derive(Debug, Clone, Copy)]
    enum Fault {
        CreateFails,
        CreateLosesRace,
        ReadBackMissing,
        ReadBackFails,
    }

    struct FaultyRepo {
        inner: InMemoryUserRepository,
        fault: Fault,
    }

    fn storage_down() -> AuthError {
        AuthError::StorageUnavailable(AppError::service_unavailable("users table offline"))
    }

    impl UserRepository for FaultyRepo {
        async fn find_by_email(&self, email: &Email) -> AuthResult<Option<User>> {
            self.inner.find_by_email(email).await
        }

        async fn find_by_id(&self, id: UserId) -> AuthResult<Option<User>> {
            match self.fault {
                Fault::ReadBackMissing => Ok(None),
                Fault::ReadBackFails => Err(storage_down()),
                _ => self.inner.find_by_id(id).await,
            }
        }

        async fn email_exists(&self, email: &Email) -> AuthResult<bool> {
            self.inner.email_exists(email).await
        }

        async fn create(&self, user: &NewUser) -> AuthResult<UserId> {
            match self.fault {
                Fault::CreateFails => Err(storage_down()),
                Fault::CreateLosesRace => Err(AuthError::DuplicateEmail),
                _ => self.inner.create(user).await,
            }
        }

        async fn update(&self, id: UserId, changes: &UserChanges) -> AuthResult<bool> {
            self.inner.update(id, changes).await
        }

        async fn delete(&self, id: UserId) -> AuthResult<bool> {
            self.inner.delete(id).await
        }
    }

    #[tokio::test]
    async fn test_register_signs_in() {
        let repo = InMemoryUserRepository::new();
        let mut auth = service(&repo);
        let mut session = TestSession::default();

        let ok = auth
            .register(&mut session, "Ada", "Ada@Example.com", "secret1")
            .await
            .unwrap();

        assert!(ok);
        assert!(auth.check());
        assert_eq!(auth.id(), session.user_id);
        assert_eq!(auth.user().unwrap().email.as_str(), "ada@example.com");

        let email = Email::new("ada@example.com").unwrap();
        let stored = repo.find_by_email(&email).await.unwrap().unwrap();
        assert_eq!(stored.email, email);
        assert_ne!(stored.password_hash.as_phc_string(), "secret1");
    }

    #[tokio::test]
    async fn test_register_duplicate_email() {
        let repo = InMemoryUserRepository::new();
        registered(&repo).await;

        let mut auth = service(&repo);
        let mut session = TestSession::default();
        let ok = auth
            .register(&mut session, "Other", " ADA@example.com", "secret2")
            .await
            .unwrap();

        assert!(!ok);
        assert!(!auth.check());
        assert_eq!(session.writes, 0);
        assert_eq!(repo.len().await, 1);
    }

    #[tokio::test]
    async fn test_register_create_failures_stay_anonymous() {
        let cases = [
            (Fault::CreateFails, 0),
            (Fault::CreateLosesRace, 0),
            (Fault::ReadBackMissing, 1),
            (Fault::ReadBackFails, 1),
        ];

        for (fault, rows) in cases {
            let inner = InMemoryUserRepository::new();
            let repo = FaultyRepo {
                inner: inner.clone(),
                fault,
            };
            let mut auth = AuthService::new(Arc::new(repo), Arc::new(AuthConfig::default()));
            let mut session = TestSession::default();

            let ok = auth
                .register(&mut session, "Ada", "ada@example.com", "secret1")
                .await
                .unwrap();

            assert!(!ok, "{:?}", fault);
            assert!(!auth.check(), "{:?}", fault);
            assert_eq!(auth.state(), AuthState::Anonymous);
            assert_eq!(session.writes, 0, "{:?}", fault);
            assert_eq!(session.user_id, None);
            assert_eq!(inner.len().await, rows, "{:?}", fault);
        }
    }

    #[tokio::test]
    async fn test_register_rejects_invalid_input() {
        let repo = InMemoryUserRepository::new();
        let mut auth = service(&repo);
        let mut session = TestSession::default();

        let err = auth
            .register(&mut session, "Ada", "not-an-email", "secret1")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Validation(_)));

        let err = auth
            .register(&mut session, "Ada", "ada@example.com", "abc")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Validation(_)));
        assert_eq!(repo.len().await, 0);
    }

    #[tokio::test]
    async fn test_attempt_success_and_failures_look_alike() {
        let repo = InMemoryUserRepository::new();
        let user_id = registered(&repo).await;

        let mut auth = service(&repo);
        let mut session = TestSession::default();

        assert!(
            !auth
                .attempt(&mut session, "ada@example.com", "wrong-password")
                .await
                .unwrap()
        );
        assert!(
            !auth
                .attempt(&mut session, "nobody@example.com", "secret1")
                .await
                .unwrap()
        );
        assert!(!auth.attempt(&mut session, "garbage", "secret1").await.unwrap());
        assert_eq!(session.writes, 0);
        assert_eq!(auth.state(), AuthState::Anonymous);

        assert!(
            auth.attempt(&mut session, "ADA@example.com ", "secret1")
                .await
                .unwrap()
        );
        assert_eq!(auth.state(), AuthState::Authenticated(user_id));
        assert_eq!(session.user_id, Some(user_id));
    }

    #[tokio::test]
    async fn test_authenticate_reports_invalid_credentials() {
        let repo = InMemoryUserRepository::new();
        registered(&repo).await;

        let err = service(&repo)
            .authenticate("ada@example.com", "nope-nope")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_attempt_storage_failure_is_error() {
        let repo = InMemoryUserRepository::new();
        registered(&repo).await;
        repo.set_available(false);

        let mut session = TestSession::default();
        let err = service(&repo)
            .attempt(&mut session, "ada@example.com", "secret1")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::StorageUnavailable(_)));
        assert_eq!(session.user_id, None);
    }

    #[tokio::test]
    async fn test_init_restores_user() {
        let repo = InMemoryUserRepository::new();
        let user_id = registered(&repo).await;

        let session = TestSession {
            user_id: Some(user_id),
            writes: 0,
        };
        let auth = AuthService::init(
            Arc::new(repo.clone()),
            Arc::new(AuthConfig::default()),
            &session,
        )
        .await;

        assert!(auth.check());
        assert_eq!(auth.user().unwrap().name.as_str(), "Ada");
    }

    #[tokio::test]
    async fn test_init_with_deleted_user_is_anonymous() {
        let repo = InMemoryUserRepository::new();
        let user_id = registered(&repo).await;
        assert!(repo.delete(user_id).await.unwrap());

        let session = TestSession {
            user_id: Some(user_id),
            writes: 0,
        };
        let auth = AuthService::init(
            Arc::new(repo.clone()),
            Arc::new(AuthConfig::default()),
            &session,
        )
        .await;

        assert!(!auth.check());
        assert_eq!(auth.id(), None);
    }

    #[tokio::test]
    async fn test_init_with_storage_down_is_anonymous() {
        let repo = InMemoryUserRepository::new();
        let user_id = registered(&repo).await;
        repo.set_available(false);

        let session = TestSession {
            user_id: Some(user_id),
            writes: 0,
        };
        let auth = AuthService::init(
            Arc::new(repo.clone()),
            Arc::new(AuthConfig::default()),
            &session,
        )
        .await;

        assert_eq!(auth.state(), AuthState::Anonymous);
    }

    #[tokio::test]
    async fn test_logout_is_idempotent() {
        let repo = InMemoryUserRepository::new();
        let mut auth = service(&repo);
        let mut session = TestSession::default();
        auth.register(&mut session, "Ada", "ada@example.com", "secret1")
            .await
            .unwrap();

        auth.logout(&mut session);
        assert!(!auth.check());
        assert_eq!(auth.id(), None);
        assert_eq!(session.user_id, None);

        auth.logout(&mut session);
        assert!(!auth.check());
        assert_eq!(session.user_id, None);
    }

    #[tokio::test]
    async fn test_reset_password() {
        let repo = InMemoryUserRepository::new();
        registered(&repo).await;

        let mut auth = service(&repo);
        assert!(
            auth.reset_password("ada@example.com", "new-secret")
                .await
                .unwrap()
        );
        assert!(!auth.check());

        let mut session = TestSession::default();
        assert!(
            !auth
                .attempt(&mut session, "ada@example.com", "secret1")
                .await
                .unwrap()
        );
        assert!(
            auth.attempt(&mut session, "ada@example.com", "new-secret")
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_reset_password_unknown_email() {
        let repo = InMemoryUserRepository::new();
        let mut auth = service(&repo);
        assert!(
            !auth
                .reset_password("ghost@example.com", "new-secret")
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_update_profile_rejects_taken_email() {
        let repo = InMemoryUserRepository::new();
        registered(&repo).await;

        let mut auth = service(&repo);
        let mut session = TestSession::default();
        auth.register(&mut session, "Bob", "bob@example.com", "secret1")
            .await
            .unwrap();

        let changes = UserChanges {
            email: Some(Email::new("ada@example.com").unwrap()),
            ..UserChanges::default()
        };
        let err = auth.update_profile(changes).await.unwrap_err();
        assert!(matches!(err, AuthError::DuplicateEmail));

        let changes = UserChanges {
            name: Some(UserName::new("Robert").unwrap()),
            ..UserChanges::default()
        };
        assert!(auth.update_profile(changes).await.unwrap());
        assert_eq!(auth.user().unwrap().name.as_str(), "Robert");
    }

    #[tokio::test]
    async fn test_verify_password_and_role() {
        let repo = InMemoryUserRepository::new();
        let user_id = registered(&repo).await;
        let changes = UserChanges {
            role: Some("admin".to_string()),
            ..UserChanges::default()
        };
        repo.update(user_id, &changes).await.unwrap();

        let mut auth = service(&repo);
        assert!(!auth.verify_password("secret1"));
        assert!(!auth.has_role("admin"));

        let mut session = TestSession::default();
        auth.attempt(&mut session, "ada@example.com", "secret1")
            .await
            .unwrap();
        assert!(auth.verify_password("secret1"));
        assert!(!auth.verify_password("secret2"));
        assert!(auth.has_role("admin"));
        assert!(!auth.has_role("editor"));
    }
}
