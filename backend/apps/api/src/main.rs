//! Server Entry Point
//!
//! Application entry point and server initialization.
//! Uses `anyhow` for startup errors; request-level errors are
//! `web::WebError` and `auth::AuthError`.

mod config;

use std::sync::Arc;
use std::time::Duration;

use auth::domain::repository::UserRepository;
use auth::{InMemoryUserRepository, PgUserRepository};
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use web::controllers::routes;
use web::{
    AppState, LogMailer, MemorySessionStore, PgSessionStore, SessionStore, TemplateRenderer,
    app_router, spawn_cleanup,
};

use crate::config::AppConfig;

// Re-export unified error types
pub use kernel::error::{
    app_error::{AppError, AppResult},
    kind::ErrorKind,
};

/// How often expired sessions are purged while the server runs
const SESSION_CLEANUP_INTERVAL: Duration = Duration::from_secs(15 * 60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env()?;

    // Initialize tracing
    let default_filter = if config.app_debug {
        "api=debug,web=debug,auth=debug,tower_http=debug"
    } else {
        "api=info,web=info,auth=info,tower_http=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if config.session_secret.is_none() {
        tracing::warn!("SESSION_SECRET not set, using a random secret for this run");
    }

    let views = TemplateRenderer::load(&config.views_dir)?;

    let Some(database_url) = config.database_url.clone() else {
        tracing::warn!("DATABASE_URL not set, using in-memory storage; data is lost on restart");
        return serve(
            &config,
            InMemoryUserRepository::new(),
            MemorySessionStore::new(),
            views,
        )
        .await;
    };

    // Database connection
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await?;

    tracing::info!("Connected to database");

    // Run migrations
    sqlx::migrate!("../../../database/migrations")
        .run(&pool)
        .await?;

    tracing::info!("Migrations completed");

    serve(
        &config,
        PgUserRepository::new(pool.clone()),
        PgSessionStore::new(pool),
        views,
    )
    .await
}

async fn serve<R, S>(
    config: &AppConfig,
    users: R,
    sessions: S,
    views: TemplateRenderer,
) -> anyhow::Result<()>
where
    R: UserRepository + Send + Sync + 'static,
    S: SessionStore + Send + Sync + 'static,
{
    // Purge expired sessions now and then every interval
    // Failures are logged and never stop the server
    let sessions = Arc::new(sessions);
    let cleanup = spawn_cleanup(sessions.clone(), SESSION_CLEANUP_INTERVAL);

    let state = AppState::new(
        routes(),
        Arc::new(users),
        sessions,
        Arc::new(views),
        Arc::new(LogMailer),
        config.web_config(),
        config.auth_config(),
    );

    // Build router
    let app = app_router(state).layer(TraceLayer::new_for_http());

    // Start server
    tracing::info!(
        app = %config.app_name,
        env = %config.app_env,
        "Listening on {}",
        config.bind_addr
    );

    let listener = TcpListener::bind(config.bind_addr).await?;
    let served = axum::serve(listener, app).await;
    cleanup.abort();
    served?;

    Ok(())
}
