use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RefreshToken {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_hash: String, // sha-256 hex of the opaque token
    pub expires_at: DateTime<Utc>,
    pub created_by_ip: Option<String>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub revoked_by_ip: Option<String>,
    pub replaced_by_hash: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateRefreshTokenData {
    pub user_id: Uuid,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub created_by_ip: Option<String>,
}

/// Lifecycle state of a stored token at a given instant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshTokenState {
    Active,
    /// Revoked tokens stay revoked after they also expire
    Revoked,
    Expired,
}

/// How a token leaves the active state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Revocation<'a> {
    /// Exchanged for the token with this hash
    Rotated { replaced_by_hash: &'a str },
    /// Logout, or a rotation that lost a concurrent race
    Ended,
}

impl<'a> Revocation<'a> {
    pub fn replaced_by_hash(&self) -> Option<&'a str> {
        match self {
            Revocation::Rotated { replaced_by_hash } => Some(replaced_by_hash),
            Revocation::Ended => None,
        }
    }
}

impl RefreshToken {
    pub fn state(&self, now: DateTime<Utc>) -> RefreshTokenState {
        if self.revoked_at.is_some() {
            RefreshTokenState::Revoked
        } else if now >= self.expires_at {
            RefreshTokenState::Expired
        } else {
            RefreshTokenState::Active
        }
    }

    pub async fn create(
        pool: &PgPool,
        data: CreateRefreshTokenData,
    ) -> Result<Self, sqlx::Error> {
        let token = sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO refresh_tokens (user_id, token_hash, expires_at, created_by_ip)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(data.user_id)
        .bind(&data.token_hash)
        .bind(data.expires_at)
        .bind(&data.created_by_ip)
        .fetch_one(pool)
        .await?;

        Ok(token)
    }

    pub async fn find_by_hash(
        pool: &PgPool,
        token_hash: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let token = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM refresh_tokens WHERE token_hash = $1
            "#,
        )
        .bind(token_hash)
        .fetch_optional(pool)
        .await?;

        Ok(token)
    }

    /// Revokes a single token; returns false when it was already revoked
    pub async fn revoke(
        pool: &PgPool,
        id: Uuid,
        revoked_by_ip: Option<&str>,
        revocation: Revocation<'_>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET revoked_at = NOW(), revoked_by_ip = $2, replaced_by_hash = $3
            WHERE id = $1 AND revoked_at IS NULL
            "#,
        )
        .bind(id)
        .bind(revoked_by_ip)
        .bind(revocation.replaced_by_hash())
        .execute(pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Revokes every still-active token of a user
    pub async fn revoke_all_for_user(
        pool: &PgPool,
        user_id: Uuid,
        revoked_by_ip: Option<&str>,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET revoked_at = NOW(), revoked_by_ip = $2
            WHERE user_id = $1 AND revoked_at IS NULL
            "#,
        )
        .bind(user_id)
        .bind(revoked_by_ip)
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Deletes tokens that expired or were revoked more than `grace` ago
    pub async fn delete_stale(pool: &PgPool, grace: Duration) -> Result<u64, sqlx::Error> {
        let cutoff = Utc::now() - grace;

        let result = sqlx::query(
            r#"
            DELETE FROM refresh_tokens
            WHERE expires_at < $1 OR revoked_at < $1
            "#,
        )
        .bind(cutoff)
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    }
}
