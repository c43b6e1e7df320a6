//! Session Store Trait

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::session::{SessionData, SessionResult};

/// Server-side session storage keyed by session id
#[trait_variant::make(SessionStore: Send)]
pub trait LocalSessionStore {
    /// Load live session data; expired or unknown ids are `None`
    async fn load(&self, id: &str) -> SessionResult<Option<SessionData>>;

    /// Insert or replace, extending the expiry to now + `ttl`
    async fn save(&self, id: &str, data: &SessionData, ttl: Duration) -> SessionResult<()>;

    async fn destroy(&self, id: &str) -> SessionResult<()>;

    /// Remove expired sessions, returning how many were deleted
    async fn cleanup_expired(&self) -> SessionResult<u64>;
}

/// Run `cleanup_expired` every `every` until the task is aborted
///
/// The first pass runs immediately.
pub fn spawn_cleanup<S>(store: Arc<S>, every: Duration) -> JoinHandle<()>
where
    S: SessionStore + Send + Sync + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match store.cleanup_expired().await {
                Ok(0) => {}
                Ok(deleted) => {
                    tracing::info!(sessions_deleted = deleted, "Expired sessions removed");
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Session cleanup failed");
                }
            }
        }
    })
}
