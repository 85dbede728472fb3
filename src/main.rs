use secrecy::ExposeSecret;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use resumeefy::api::middleware::session::{create_session_layer, AppState};
use resumeefy::config::Config;
use resumeefy::db;
use resumeefy::jobs::{email_dispatch, token_cleanup};
use resumeefy::services::{auth::AuthService, mailer::Mailer};

const EMAIL_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "resumeefy=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Resumeefy server...");

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!("Configuration loaded successfully");

    // Create database pool
    let pool = db::create_pool(&config.database_url).await?;
    tracing::info!("Database pool created");

    // Run migrations
    db::run_migrations(&pool).await?;
    tracing::info!("Database migrations completed");

    // Outgoing mail and the background queue
    let mailer = Mailer::from_config(&config);
    let (email_queue, email_receiver) = email_dispatch::EmailQueue::new();
    let email_worker = email_dispatch::spawn_worker(mailer.clone(), email_receiver);

    // Hourly purge of dead refresh tokens
    let mut scheduler = token_cleanup::start_scheduler(pool.clone()).await?;

    let auth = AuthService::new(pool.clone(), &config, mailer, email_queue.clone());

    if let (Some(email), Some(password)) = (
        &config.bootstrap_admin_email,
        &config.bootstrap_admin_password,
    ) {
        auth.bootstrap_super_admin(email, password.expose_secret())
            .await?;
    }

    // Create session layer
    let session_layer = create_session_layer(pool.clone(), config.production).await?;
    tracing::info!("Session layer initialized");

    // Build application state
    let ip: IpAddr = config.host.parse()?;
    let addr = SocketAddr::new(ip, config.port);
    let state = AppState::new(pool.clone(), config, auth, email_queue);
    let rate_limit_sweeper = state.rate_limiter.spawn_sweeper();

    let app = resumeefy::api::router(state).layer(session_layer);

    tracing::info!("Listening on {}", addr);

    // Start server
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    scheduler.shutdown().await?;
    rate_limit_sweeper.abort();

    // Dropping the router released its queue senders; let the worker drain
    match tokio::time::timeout(EMAIL_DRAIN_TIMEOUT, email_worker).await {
        Ok(Ok(stats)) => tracing::info!(?stats, "Email queue drained"),
        Ok(Err(e)) => tracing::error!(error = %e, "Email worker panicked"),
        Err(_) => tracing::warn!("Email queue did not drain before shutdown"),
    }

    pool.close().await;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install CTRL+C signal handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, cleaning up...");
}
