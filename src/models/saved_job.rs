use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SavedJobEntry {
    pub id: Uuid,
    pub job_id: Uuid,
    pub saved_at: DateTime<Utc>,
    pub job_title: String,
    pub company_name: String,
    pub location: String,
    pub job_is_active: bool,
}

pub struct SavedJob;

impl SavedJob {
    /// Saves the job, or un-saves it when already saved. Returns the new state.
    pub async fn toggle(pool: &PgPool, user_id: Uuid, job_id: Uuid) -> Result<bool, sqlx::Error> {
        let removed = sqlx::query(
            r#"
            DELETE FROM saved_jobs WHERE user_id = $1 AND job_id = $2
            "#,
        )
        .bind(user_id)
        .bind(job_id)
        .execute(pool)
        .await?;

        if removed.rows_affected() > 0 {
            return Ok(false);
        }

        sqlx::query(
            r#"
            INSERT INTO saved_jobs (user_id, job_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id, job_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(job_id)
        .execute(pool)
        .await?;

        Ok(true)
    }

    pub async fn list_for_user(
        pool: &PgPool,
        user_id: Uuid,
    ) -> Result<Vec<SavedJobEntry>, sqlx::Error> {
        let entries = sqlx::query_as::<_, SavedJobEntry>(
            r#"
            SELECT
                s.id, s.job_id, s.created_at AS saved_at,
                j.title AS job_title, j.company_name, j.location, j.is_active AS job_is_active
            FROM saved_jobs s
            JOIN jobs j ON j.id = s.job_id
            WHERE s.user_id = $1
            ORDER BY s.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        Ok(entries)
    }
}
