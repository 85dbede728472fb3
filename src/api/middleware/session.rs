use axum::extract::FromRef;
use sqlx::PgPool;
use std::time::Duration;
use tower_sessions::{Expiry, SessionManagerLayer};
use tower_sessions_sqlx_store::PostgresStore;

use super::rate_limit::RateLimiter;
use crate::config::Config;
use crate::jobs::email_dispatch::EmailQueue;
use crate::services::auth::AuthService;

/// Session keys used by the server-side Google sign-in flow
pub const SESSION_KEY_CSRF_TOKEN: &str = "csrf_token";
pub const SESSION_KEY_PKCE_VERIFIER: &str = "pkce_verifier";
pub const SESSION_KEY_SIGNUP_ROLE: &str = "signup_role";

/// Creates a session layer for Axum
pub async fn create_session_layer(
    pool: PgPool,
    secure: bool,
) -> Result<SessionManagerLayer<PostgresStore>, sqlx::Error> {
    // Create the session store backed by PostgreSQL
    let session_store = PostgresStore::new(pool);
    session_store.migrate().await?;

    // OAuth state only has to survive one round-trip to Google
    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(secure)
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::minutes(15)));

    Ok(session_layer)
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    pub auth: AuthService,
    pub email_queue: EmailQueue,
    pub rate_limiter: RateLimiter,
}

impl AppState {
    pub fn new(pool: PgPool, config: Config, auth: AuthService, email_queue: EmailQueue) -> Self {
        let rate_limiter = RateLimiter::new(
            config.rate_limit_max_requests,
            Duration::from_secs(config.rate_limit_window_secs),
        );

        Self {
            pool,
            config,
            auth,
            email_queue,
            rate_limiter,
        }
    }
}

impl FromRef<AppState> for PgPool {
    fn from_ref(state: &AppState) -> PgPool {
        state.pool.clone()
    }
}
