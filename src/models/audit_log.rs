use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "audit_action", rename_all = "snake_case")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    BanUser,
    UnbanUser,
    ApproveJob,
    RejectJob,
    CreateModerator,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AuditLog {
    pub id: Uuid,
    pub admin_id: Uuid,
    pub action: AuditAction,
    pub target_id: Uuid,
    pub target_model: String, // "User" or "Job"
    pub details: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl AuditLog {
    pub async fn record(
        pool: &PgPool,
        admin_id: Uuid,
        action: AuditAction,
        target_id: Uuid,
        target_model: &str,
        details: Option<String>,
    ) -> Result<Self, sqlx::Error> {
        let entry = sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO audit_logs (admin_id, action, target_id, target_model, details)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(admin_id)
        .bind(action)
        .bind(target_id)
        .bind(target_model)
        .bind(details)
        .fetch_one(pool)
        .await?;

        tracing::info!(
            admin_id = %admin_id,
            action = ?action,
            target_id = %target_id,
            "Admin action recorded"
        );

        Ok(entry)
    }

    pub async fn list(
        pool: &PgPool,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Self>, i64), sqlx::Error> {
        let entries = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM audit_logs
            ORDER BY created_at DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM audit_logs")
            .fetch_one(pool)
            .await?;

        Ok((entries, total))
    }
}
