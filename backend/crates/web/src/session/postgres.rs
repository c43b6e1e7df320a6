//! PostgreSQL Session Store

use std::time::Duration;

use chrono::Utc;
use sqlx::PgPool;

use crate::session::store::SessionStore;
use crate::session::{SessionData, SessionResult};

/// Sessions in the `web_sessions` table, data as JSON text
#[derive(Clone)]
pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl SessionStore for PgSessionStore {
    async fn load(&self, id: &str) -> SessionResult<Option<SessionData>> {
        let now_ms = Utc::now().timestamp_millis();

        let data = sqlx::query_scalar::<_, String>(
            "SELECT data FROM web_sessions WHERE session_id = $1 AND expires_at_ms > $2",
        )
        .bind(id)
        .bind(now_ms)
        .fetch_optional(&self.pool)
        .await?;

        match data {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, id: &str, data: &SessionData, ttl: Duration) -> SessionResult<()> {
        let json = serde_json::to_string(data)?;
        let expires_at_ms = Utc::now().timestamp_millis() + ttl.as_millis() as i64;

        sqlx::query(
            r#"
            INSERT INTO web_sessions (session_id, data, expires_at_ms, updated_at)
            VALUES ($1, $2, $3, NOW())
            ON CONFLICT (session_id) DO UPDATE SET
                data = EXCLUDED.data,
                expires_at_ms = EXCLUDED.expires_at_ms,
                updated_at = NOW()
            "#,
        )
        .bind(id)
        .bind(json)
        .bind(expires_at_ms)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn destroy(&self, id: &str) -> SessionResult<()> {
        sqlx::query("DELETE FROM web_sessions WHERE session_id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn cleanup_expired(&self) -> SessionResult<u64> {
        let now_ms = Utc::now().timestamp_millis();

        let deleted = sqlx::query("DELETE FROM web_sessions WHERE expires_at_ms < $1")
            .bind(now_ms)
            .execute(&self.pool)
            .await?
            .rows_affected();

        tracing::info!(sessions_deleted = deleted, "Cleaned up expired web sessions");

        Ok(deleted)
    }
}
