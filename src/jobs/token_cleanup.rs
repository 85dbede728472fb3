use chrono::Duration;
use sqlx::PgPool;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use crate::models::refresh_token::RefreshToken;

/// Top of every hour
const CLEANUP_SCHEDULE: &str = "0 0 * * * *";

/// How long expired or revoked refresh tokens are kept for reuse detection
const RETENTION_HOURS: i64 = 24;

/// Deletes refresh tokens past their retention window
pub async fn purge_stale_refresh_tokens(pool: &PgPool) -> Result<u64, sqlx::Error> {
    let deleted = RefreshToken::delete_stale(pool, Duration::hours(RETENTION_HOURS)).await?;

    tracing::info!(deleted, "Purged stale refresh tokens");

    Ok(deleted)
}

/// Registers the purge on a cron scheduler and starts it
pub async fn start_scheduler(pool: PgPool) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;

    let job = Job::new_async(CLEANUP_SCHEDULE, move |_uuid, _lock| {
        let pool = pool.clone();
        Box::pin(async move {
            if let Err(e) = purge_stale_refresh_tokens(&pool).await {
                tracing::error!(error = %e, "Refresh token purge failed");
            }
        })
    })?;

    scheduler.add(job).await?;
    scheduler.start().await?;

    tracing::info!(schedule = CLEANUP_SCHEDULE, "Refresh token purge scheduled");

    Ok(scheduler)
}
