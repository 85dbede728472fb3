use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use std::{fmt, str::FromStr};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
pub enum Role {
    Admin,
    Employer,
    JobSeeker,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::Employer => "Employer",
            Role::JobSeeker => "JobSeeker",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Admin" => Ok(Role::Admin),
            "Employer" => Ok(Role::Employer),
            "JobSeeker" => Ok(Role::JobSeeker),
            other => Err(format!("Unknown role: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "admin_role", rename_all = "snake_case")]
pub enum AdminRole {
    None,
    Moderator,
    SuperAdmin,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub role: Role,
    pub is_active: bool,
    pub is_email_verified: bool,
    #[serde(skip_serializing)]
    pub verification_token_hash: Option<String>,
    #[serde(skip_serializing)]
    pub verification_token_expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing)]
    pub password_reset_token_hash: Option<String>,
    #[serde(skip_serializing)]
    pub password_reset_expires_at: Option<DateTime<Utc>>,
    pub is_admin: bool,
    pub is_banned: bool,
    pub admin_role: AdminRole,
    pub is_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateUserData {
    pub email: String,
    pub password_hash: Option<String>,
    pub role: Role,
    pub is_email_verified: bool,
    pub is_admin: bool,
    pub admin_role: AdminRole,
}

impl CreateUserData {
    /// Plain self-registered account
    pub fn new(email: String, password_hash: Option<String>, role: Role) -> Self {
        Self {
            email,
            password_hash,
            role,
            is_email_verified: false,
            is_admin: false,
            admin_role: AdminRole::None,
        }
    }
}

fn one_time_token_matches(
    stored_hash: Option<&str>,
    expires_at: Option<DateTime<Utc>>,
    presented_hash: &str,
    now: DateTime<Utc>,
) -> bool {
    stored_hash == Some(presented_hash) && expires_at.is_some_and(|expires_at| expires_at > now)
}

/// Trims and lower-cases an address the way it is stored
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl User {
    pub fn is_super_admin(&self) -> bool {
        self.is_admin && self.admin_role == AdminRole::SuperAdmin
    }

    /// Checks a presented verification token hash against the stored one
    pub fn verification_token_matches(&self, token_hash: &str, now: DateTime<Utc>) -> bool {
        one_time_token_matches(
            self.verification_token_hash.as_deref(),
            self.verification_token_expires_at,
            token_hash,
            now,
        )
    }

    /// Checks a presented password reset token hash against the stored one
    pub fn reset_token_matches(&self, token_hash: &str, now: DateTime<Utc>) -> bool {
        !self.is_deleted
            && one_time_token_matches(
                self.password_reset_token_hash.as_deref(),
                self.password_reset_expires_at,
                token_hash,
                now,
            )
    }

    /// Creates a new user record
    pub async fn create(pool: &PgPool, data: CreateUserData) -> Result<Self, sqlx::Error> {
        let user = sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO users (email, password_hash, role, is_email_verified, is_admin, admin_role)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(normalize_email(&data.email))
        .bind(&data.password_hash)
        .bind(data.role)
        .bind(data.is_email_verified)
        .bind(data.is_admin)
        .bind(data.admin_role)
        .fetch_one(pool)
        .await?;

        Ok(user)
    }

    /// Finds a user by their internal ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM users WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Finds a live (not soft-deleted) user by email
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM users WHERE email = $1 AND is_deleted = FALSE
            "#,
        )
        .bind(normalize_email(email))
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    pub async fn set_verification_token(
        pool: &PgPool,
        id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE users
            SET verification_token_hash = $2, verification_token_expires_at = $3, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(token_hash)
        .bind(expires_at)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Marks the email verified and consumes the verification token
    pub async fn mark_email_verified(pool: &PgPool, id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE users
            SET
                is_email_verified = TRUE,
                verification_token_hash = NULL,
                verification_token_expires_at = NULL,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(pool)
        .await?;

        Ok(())
    }

    pub async fn set_password_reset(
        pool: &PgPool,
        id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE users
            SET password_reset_token_hash = $2, password_reset_expires_at = $3, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(token_hash)
        .bind(expires_at)
        .execute(pool)
        .await?;

        Ok(())
    }

    pub async fn clear_password_reset(pool: &PgPool, id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE users
            SET password_reset_token_hash = NULL, password_reset_expires_at = NULL, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Finds the user holding a reset token with this hash, expired or not
    pub async fn find_by_reset_token(
        pool: &PgPool,
        token_hash: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM users
            WHERE password_reset_token_hash = $1
            "#,
        )
        .bind(token_hash)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Stores a new password hash and consumes any reset token
    pub async fn update_password(
        pool: &PgPool,
        id: Uuid,
        password_hash: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE users
            SET
                password_hash = $2,
                password_reset_token_hash = NULL,
                password_reset_expires_at = NULL,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(password_hash)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Flips the ban flag and returns the updated user
    pub async fn toggle_ban(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, Self>(
            r#"
            UPDATE users
            SET is_banned = NOT is_banned, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Lists users, newest first
    pub async fn list(pool: &PgPool, limit: i64, offset: i64) -> Result<Vec<Self>, sqlx::Error> {
        let users = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM users
            ORDER BY created_at DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

        Ok(users)
    }

    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(pool)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample_user() -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            email: "seeker@example.com".to_string(),
            password_hash: None,
            role: Role::JobSeeker,
            is_active: true,
            is_email_verified: false,
            verification_token_hash: Some("abc123".to_string()),
            verification_token_expires_at: Some(now + Duration::hours(1)),
            password_reset_token_hash: None,
            password_reset_expires_at: None,
            is_admin: false,
            is_banned: false,
            admin_role: AdminRole::None,
            is_deleted: false,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!("JobSeeker".parse::<Role>(), Ok(Role::JobSeeker));
        assert_eq!("Employer".parse::<Role>(), Ok(Role::Employer));
        assert!("jobseeker".parse::<Role>().is_err());
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Jane.Doe@Example.COM "), "jane.doe@example.com");
    }

    #[test]
    fn test_verification_token_matching() {
        let user = sample_user();
        let now = Utc::now();

        assert!(user.verification_token_matches("abc123", now));
        assert!(!user.verification_token_matches("other", now));
        assert!(!user.verification_token_matches("abc123", now + Duration::hours(2)));
    }

    #[test]
    fn test_reset_token_matching() {
        let now = Utc::now();
        let mut user = sample_user();
        user.password_reset_token_hash = Some("reset-hash".to_string());
        user.password_reset_expires_at = Some(now + Duration::minutes(30));

        assert!(user.reset_token_matches("reset-hash", now));
        assert!(!user.reset_token_matches("abc123", now));
        assert!(!user.reset_token_matches("reset-hash", now + Duration::hours(1)));

        user.is_deleted = true;
        assert!(!user.reset_token_matches("reset-hash", now));
    }

    #[test]
    fn test_missing_expiry_never_matches() {
        let mut user = sample_user();
        user.verification_token_expires_at = None;
        assert!(!user.verification_token_matches("abc123", Utc::now()));
    }

    #[test]
    fn test_secrets_not_serialized() {
        let mut user = sample_user();
        user.password_hash = Some("$argon2id$secret".to_string());

        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert!(json.get("verificationTokenHash").is_none());
        assert_eq!(json["role"], "JobSeeker");
        assert_eq!(json["isEmailVerified"], false);
    }

    #[test]
    fn test_super_admin_requires_admin_flag() {
        let mut user = sample_user();
        user.admin_role = AdminRole::SuperAdmin;
        assert!(!user.is_super_admin());

        user.is_admin = true;
        assert!(user.is_super_admin());
    }
}
