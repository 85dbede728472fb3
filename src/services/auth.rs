//! Account lifecycle: registration, credential checks, session tokens,
//! email verification, password reset and Google federation.
//!
//! Refresh tokens are opaque and stored only as SHA-256 hashes. Each refresh
//! rotates the token; presenting an already-revoked token is treated as theft
//! and revokes every active token of that user.

use chrono::{DateTime, Duration, Utc};
use secrecy::ExposeSecret;
use sqlx::PgPool;

use crate::config::Config;
use crate::db;
use crate::error::{AppError, Result};
use crate::jobs::email_dispatch::EmailQueue;
use crate::models::{
    profile::{CompanyProfile, JobSeekerProfile},
    refresh_token::{CreateRefreshTokenData, RefreshToken, RefreshTokenState, Revocation},
    user::{AdminRole, CreateUserData, Role, User},
};
use crate::services::{
    mailer::{self, Mailer},
    oauth::google::{self, GoogleAuthError, GoogleIdentity},
    password,
    tokens::{self, AccessTokenSigner, ONE_TIME_TOKEN_BYTES, REFRESH_TOKEN_BYTES},
    validation::{self, ValidRegistration},
    verification,
};

const VERIFICATION_TOKEN_TTL_HOURS: i64 = 24;
const PASSWORD_RESET_TTL_HOURS: i64 = 1;

pub const VERIFY_EMAIL_PATH: &str = "/api/auth/verify-email";
pub const RESET_PASSWORD_PATH: &str = "/reset-password";

/// Tokens handed to a client after a successful sign-in or refresh
#[derive(Debug, Clone)]
pub struct SessionTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub refresh_expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyOutcome {
    Verified,
    AlreadyVerified,
}

#[derive(Clone)]
pub struct AuthService {
    pool: PgPool,
    signer: AccessTokenSigner,
    refresh_ttl: Duration,
    base_url: String,
    frontend_url: String,
    google_client_id: String,
    google_tokeninfo_url: String,
    mailer: Mailer,
    email_queue: EmailQueue,
}

impl AuthService {
    pub fn new(pool: PgPool, config: &Config, mailer: Mailer, email_queue: EmailQueue) -> Self {
        Self {
            pool,
            signer: AccessTokenSigner::new(
                config.jwt_secret.expose_secret(),
                Duration::minutes(config.access_token_ttl_minutes),
            ),
            refresh_ttl: Duration::days(config.refresh_token_ttl_days),
            base_url: config.base_url.clone(),
            frontend_url: config.frontend_base().to_string(),
            google_client_id: config.google_client_id.clone(),
            google_tokeninfo_url: config.google_tokeninfo_url.clone(),
            mailer,
            email_queue,
        }
    }

    pub fn signer(&self) -> &AccessTokenSigner {
        &self.signer
    }

    pub fn mail_transport(&self) -> &'static str {
        self.mailer.transport_name()
    }

    /// Creates an unverified account with its default profile and queues the
    /// verification email
    pub async fn register(&self, registration: ValidRegistration) -> Result<User> {
        if User::find_by_email(&self.pool, &registration.email)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(
                "User with this email already exists.".to_string(),
            ));
        }

        let password_hash = password::hash_password(registration.password)
            .await
            .map_err(|e| AppError::Internal(e.into()))?;

        let user = User::create(
            &self.pool,
            CreateUserData::new(registration.email, Some(password_hash), registration.role),
        )
        .await
        .map_err(conflict_on_duplicate_email)?;

        self.create_default_profile(&user, None, None).await?;
        self.send_verification(&user).await?;

        tracing::info!(user_id = %user.id, role = %user.role, "User registered");

        Ok(user)
    }

    /// Issues a fresh verification token and queues the email
    async fn send_verification(&self, user: &User) -> Result<()> {
        let token = tokens::generate_opaque_token(ONE_TIME_TOKEN_BYTES)
            .map_err(|e| AppError::Internal(e.into()))?;
        let expires_at = Utc::now() + Duration::hours(VERIFICATION_TOKEN_TTL_HOURS);

        User::set_verification_token(&self.pool, user.id, &tokens::hash_token(&token), expires_at)
            .await?;

        let code = verification::encode_code(user.id, &token);
        let link = mailer::build_link(&self.base_url, VERIFY_EMAIL_PATH, "code", &code)
            .map_err(|e| AppError::Internal(e.into()))?;

        self.email_queue
            .enqueue(mailer::verification_email(&user.email, &link));

        Ok(())
    }

    pub async fn verify_email(&self, code: &str) -> Result<VerifyOutcome> {
        let decoded = verification::decode_code(code)
            .map_err(|_| AppError::BadRequest("Invalid verification code.".to_string()))?;

        let user = User::find_by_id(&self.pool, decoded.user_id)
            .await?
            .filter(|u| !u.is_deleted)
            .ok_or_else(|| AppError::NotFound("User not found.".to_string()))?;

        let outcome =
            verification_outcome(&user, &tokens::hash_token(&decoded.token), Utc::now())?;

        if outcome == VerifyOutcome::Verified {
            User::mark_email_verified(&self.pool, user.id).await?;
            tracing::info!(user_id = %user.id, "Email verified");
        }

        Ok(outcome)
    }

    /// Re-sends verification for an unverified account. Unknown or verified
    /// addresses are silently ignored.
    pub async fn resend_verification(&self, email: &str) -> Result<()> {
        match User::find_by_email(&self.pool, email).await? {
            Some(user) if !user.is_email_verified => self.send_verification(&user).await,
            _ => Ok(()),
        }
    }

    /// Checks credentials and opens a session
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        ip: Option<&str>,
    ) -> Result<(User, SessionTokens)> {
        let invalid = || AppError::Unauthorized("Invalid email or password.".to_string());

        let user = User::find_by_email(&self.pool, email)
            .await?
            .ok_or_else(invalid)?;

        let stored_hash = user.password_hash.clone().ok_or_else(|| {
            AppError::BadRequest(
                "Please log in with Google or reset your password.".to_string(),
            )
        })?;

        let matches = password::verify_password(password.to_string(), stored_hash)
            .await
            .map_err(|e| AppError::Internal(e.into()))?;

        if !matches {
            tracing::info!(user_id = %user.id, "Failed login attempt");
            return Err(invalid());
        }

        ensure_not_banned(&user)?;

        let tokens = self.issue_session(&user, ip).await?;

        tracing::info!(user_id = %user.id, "User logged in");

        Ok((user, tokens))
    }

    /// Issues an access token and persists a new refresh token
    pub async fn issue_session(&self, user: &User, ip: Option<&str>) -> Result<SessionTokens> {
        let (refresh_token, record) = self.create_refresh_token(user, ip).await?;
        let access_token = self
            .signer
            .issue(user)
            .map_err(|e| AppError::Internal(e.into()))?;

        Ok(SessionTokens {
            access_token,
            refresh_token,
            refresh_expires_at: record.expires_at,
        })
    }

    async fn create_refresh_token(
        &self,
        user: &User,
        ip: Option<&str>,
    ) -> Result<(String, RefreshToken)> {
        let token = tokens::generate_opaque_token(REFRESH_TOKEN_BYTES)
            .map_err(|e| AppError::Internal(e.into()))?;

        let record = RefreshToken::create(
            &self.pool,
            CreateRefreshTokenData {
                user_id: user.id,
                token_hash: tokens::hash_token(&token),
                expires_at: Utc::now() + self.refresh_ttl,
                created_by_ip: ip.map(str::to_string),
            },
        )
        .await?;

        Ok((token, record))
    }

    /// Exchanges a refresh token for a new access token and a rotated refresh token
    pub async fn refresh(&self, presented: &str, ip: Option<&str>) -> Result<(User, SessionTokens)> {
        let record = RefreshToken::find_by_hash(&self.pool, &tokens::hash_token(presented))
            .await?
            .ok_or_else(|| AppError::Unauthorized("Invalid refresh token.".to_string()))?;

        if refresh_step(&record, Utc::now())? == RefreshStep::RevokeAll {
            self.handle_token_reuse(&record, ip).await?;
            return Err(token_reuse_error());
        }

        let user = refresh_owner(User::find_by_id(&self.pool, record.user_id).await?)?;

        let (new_token, new_record) = self.create_refresh_token(&user, ip).await?;

        // A concurrent refresh may have won the race for the old token
        let revoked = RefreshToken::revoke(
            &self.pool,
            record.id,
            ip,
            Revocation::Rotated {
                replaced_by_hash: &new_record.token_hash,
            },
        )
        .await?;
        if settle_rotation(revoked) == RefreshStep::RevokeAll {
            RefreshToken::revoke(&self.pool, new_record.id, ip, Revocation::Ended).await?;
            self.handle_token_reuse(&record, ip).await?;
            return Err(token_reuse_error());
        }

        let access_token = self
            .signer
            .issue(&user)
            .map_err(|e| AppError::Internal(e.into()))?;

        tracing::debug!(user_id = %user.id, "Refresh token rotated");

        Ok((
            user,
            SessionTokens {
                access_token,
                refresh_token: new_token,
                refresh_expires_at: new_record.expires_at,
            },
        ))
    }

    async fn handle_token_reuse(&self, record: &RefreshToken, ip: Option<&str>) -> Result<()> {
        let revoked = RefreshToken::revoke_all_for_user(&self.pool, record.user_id, ip).await?;

        tracing::warn!(
            user_id = %record.user_id,
            token_id = %record.id,
            revoked,
            "Revoked refresh token presented again; all sessions revoked"
        );

        Ok(())
    }

    /// Revokes the presented refresh token, if it is known
    pub async fn logout(&self, presented: Option<&str>, ip: Option<&str>) -> Result<()> {
        let Some(presented) = presented else {
            return Ok(());
        };

        if let Some(record) =
            RefreshToken::find_by_hash(&self.pool, &tokens::hash_token(presented)).await?
        {
            RefreshToken::revoke(&self.pool, record.id, ip, Revocation::Ended).await?;
            tracing::info!(user_id = %record.user_id, "User logged out");
        }

        Ok(())
    }

    /// Verifies a Google ID token presented by a client
    pub async fn verify_google_id_token(&self, id_token: &str) -> Result<GoogleIdentity> {
        google::verify_id_token(&self.google_tokeninfo_url, id_token, &self.google_client_id)
            .await
            .map_err(google_error)
    }

    /// Signs in (or signs up) the account Google vouched for
    pub async fn google_sign_in(
        &self,
        identity: GoogleIdentity,
        role: Option<&str>,
        ip: Option<&str>,
    ) -> Result<(User, SessionTokens)> {
        let user = match User::find_by_email(&self.pool, &identity.email).await? {
            Some(existing) => {
                ensure_not_banned(&existing)?;
                if !existing.is_email_verified {
                    User::mark_email_verified(&self.pool, existing.id).await?;
                }
                existing
            }
            None => {
                let role = match role {
                    None | Some("") => {
                        return Err(AppError::BadRequest(
                            "Role is required for new users.".to_string(),
                        ))
                    }
                    Some(r) => validation::parse_signup_role(r).ok_or_else(|| {
                        AppError::BadRequest(
                            "Role must be either JobSeeker or Employer.".to_string(),
                        )
                    })?,
                };

                let mut data = CreateUserData::new(identity.email.clone(), None, role);
                data.is_email_verified = true;

                let user = User::create(&self.pool, data)
                    .await
                    .map_err(conflict_on_duplicate_email)?;

                self.create_default_profile(
                    &user,
                    identity.first_name.as_deref(),
                    identity.last_name.as_deref(),
                )
                .await?;

                tracing::info!(user_id = %user.id, role = %user.role, "User signed up with Google");

                user
            }
        };

        let tokens = self.issue_session(&user, ip).await?;

        Ok((user, tokens))
    }

    async fn create_default_profile(
        &self,
        user: &User,
        first_name: Option<&str>,
        last_name: Option<&str>,
    ) -> Result<()> {
        match user.role {
            Role::JobSeeker => {
                JobSeekerProfile::create_default(
                    &self.pool,
                    user.id,
                    first_name.unwrap_or("New"),
                    last_name.unwrap_or("User"),
                )
                .await?;
            }
            Role::Employer => {
                CompanyProfile::create_default(
                    &self.pool,
                    user.id,
                    &default_company_name(first_name),
                )
                .await?;
            }
            Role::Admin => {}
        }

        Ok(())
    }

    /// Stores a reset token and emails the link. The token is withdrawn if
    /// the email cannot be sent.
    pub async fn forgot_password(&self, email: &str) -> Result<()> {
        let user = User::find_by_email(&self.pool, email)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found.".to_string()))?;

        let token = tokens::generate_opaque_token(ONE_TIME_TOKEN_BYTES)
            .map_err(|e| AppError::Internal(e.into()))?;
        let expires_at = Utc::now() + Duration::hours(PASSWORD_RESET_TTL_HOURS);

        User::set_password_reset(&self.pool, user.id, &tokens::hash_token(&token), expires_at)
            .await?;

        let link = mailer::build_link(&self.frontend_url, RESET_PASSWORD_PATH, "token", &token)
            .map_err(|e| AppError::Internal(e.into()))?;

        if let Err(e) = self
            .mailer
            .send(&mailer::password_reset_email(&user.email, &link))
            .await
        {
            User::clear_password_reset(&self.pool, user.id).await?;
            return Err(AppError::Mail(e.to_string()));
        }

        tracing::info!(user_id = %user.id, "Password reset requested");

        Ok(())
    }

    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<()> {
        if let Some(error) = validation::password_error(new_password) {
            return Err(AppError::validation(vec![error]));
        }

        let token_hash = tokens::hash_token(token);
        let user = reset_target(
            User::find_by_reset_token(&self.pool, &token_hash).await?,
            &token_hash,
            Utc::now(),
        )?;

        let password_hash = password::hash_password(new_password.to_string())
            .await
            .map_err(|e| AppError::Internal(e.into()))?;

        User::update_password(&self.pool, user.id, &password_hash).await?;
        let revoked = RefreshToken::revoke_all_for_user(&self.pool, user.id, None).await?;

        tracing::info!(user_id = %user.id, revoked, "Password reset completed");

        Ok(())
    }

    /// Creates a verified admin account with the given admin role
    pub async fn create_admin(
        &self,
        email: &str,
        password: &str,
        admin_role: AdminRole,
    ) -> Result<User> {
        let mut errors = Vec::new();
        if !validation::is_valid_email(email) {
            errors.push("Please provide a valid email address.".to_string());
        }
        errors.extend(validation::password_error(password));
        if !errors.is_empty() {
            return Err(AppError::validation(errors));
        }

        if User::find_by_email(&self.pool, email).await?.is_some() {
            return Err(AppError::Conflict(
                "User with this email already exists.".to_string(),
            ));
        }

        let password_hash = password::hash_password(password.to_string())
            .await
            .map_err(|e| AppError::Internal(e.into()))?;

        let user = User::create(
            &self.pool,
            CreateUserData {
                email: email.to_string(),
                password_hash: Some(password_hash),
                role: Role::Admin,
                is_email_verified: true,
                is_admin: true,
                admin_role,
            },
        )
        .await
        .map_err(conflict_on_duplicate_email)?;

        Ok(user)
    }

    /// Creates the configured SuperAdmin unless the address is already taken
    pub async fn bootstrap_super_admin(&self, email: &str, password: &str) -> Result<Option<User>> {
        if User::find_by_email(&self.pool, email).await?.is_some() {
            return Ok(None);
        }

        let user = self
            .create_admin(email, password, AdminRole::SuperAdmin)
            .await?;

        tracing::info!(user_id = %user.id, "Bootstrap SuperAdmin created");

        Ok(Some(user))
    }
}

fn ensure_not_banned(user: &User) -> Result<()> {
    if user.is_banned {
        tracing::info!(user_id = %user.id, "Banned user denied");
        return Err(AppError::Forbidden(
            "Your account has been suspended.".to_string(),
        ));
    }
    Ok(())
}

fn conflict_on_duplicate_email(e: sqlx::Error) -> AppError {
    if db::is_unique_violation(&e) {
        AppError::Conflict("User with this email already exists.".to_string())
    } else {
        AppError::Database(e)
    }
}

fn google_error(e: GoogleAuthError) -> AppError {
    match e {
        GoogleAuthError::Http(err) => AppError::Upstream(err.to_string()),
        GoogleAuthError::EmailNotVerified => {
            AppError::Unauthorized("Google account email is not verified.".to_string())
        }
        other => {
            tracing::info!(error = %other, "Google ID token rejected");
            AppError::Unauthorized("Invalid Google ID token.".to_string())
        }
    }
}

/// Company name seeded for employers who sign up with a known first name
pub fn default_company_name(first_name: Option<&str>) -> String {
    match first_name.map(str::trim).filter(|n| !n.is_empty()) {
        Some(name) => format!("{}'s Company", name),
        None => "New Company".to_string(),
    }
}

/// What a presented refresh token permits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RefreshStep {
    Rotate,
    /// A revoked token came back; every session of its owner ends
    RevokeAll,
}

fn refresh_step(record: &RefreshToken, now: DateTime<Utc>) -> Result<RefreshStep> {
    match record.state(now) {
        RefreshTokenState::Active => Ok(RefreshStep::Rotate),
        RefreshTokenState::Revoked => Ok(RefreshStep::RevokeAll),
        RefreshTokenState::Expired => {
            Err(AppError::Unauthorized("Refresh token expired.".to_string()))
        }
    }
}

/// Only the request whose conditional revoke succeeded may rotate
fn settle_rotation(old_token_revoked: bool) -> RefreshStep {
    if old_token_revoked {
        RefreshStep::Rotate
    } else {
        RefreshStep::RevokeAll
    }
}

fn refresh_owner(user: Option<User>) -> Result<User> {
    let user = user
        .filter(|u| !u.is_deleted)
        .ok_or_else(|| AppError::Unauthorized("Invalid refresh token.".to_string()))?;
    ensure_not_banned(&user)?;
    Ok(user)
}

fn token_reuse_error() -> AppError {
    AppError::Unauthorized("Refresh token has been revoked.".to_string())
}

fn verification_outcome(
    user: &User,
    token_hash: &str,
    now: DateTime<Utc>,
) -> Result<VerifyOutcome> {
    if user.is_email_verified {
        return Ok(VerifyOutcome::AlreadyVerified);
    }

    if !user.verification_token_matches(token_hash, now) {
        return Err(AppError::BadRequest(
            "Invalid or expired verification token.".to_string(),
        ));
    }

    Ok(VerifyOutcome::Verified)
}

fn reset_target(user: Option<User>, token_hash: &str, now: DateTime<Utc>) -> Result<User> {
    user.filter(|u| u.reset_token_matches(token_hash, now))
        .ok_or_else(|| AppError::BadRequest("Invalid or expired token.".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_company_name() {
        assert_eq!(default_company_name(Some("Ada")), "Ada's Company");
        assert_eq!(default_company_name(Some("  ")), "New Company");
        assert_eq!(default_company_name(None), "New Company");
    }

    #[test]
    fn test_google_errors_map_to_unauthorized() {
        assert!(matches!(
            google_error(GoogleAuthError::AudienceMismatch),
            AppError::Unauthorized(_)
        ));
        assert!(matches!(
            google_error(GoogleAuthError::EmailNotVerified),
            AppError::Unauthorized(_)
        ));
    }

    #[test]
    fn test_non_unique_database_errors_pass_through() {
        assert!(matches!(
            conflict_on_duplicate_email(sqlx::Error::RowNotFound),
            AppError::Database(_)
        ));
    }

    fn sample_user() -> User {
        let now = Utc::now();
        User {
            id: uuid::Uuid::new_v4(),
            email: "x@example.com".to_string(),
            password_hash: None,
            role: Role::JobSeeker,
            is_active: true,
            is_email_verified: true,
            verification_token_hash: None,
            verification_token_expires_at: None,
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

    fn stored_token(user_id: uuid::Uuid, expires_in: Duration, revoked: bool) -> RefreshToken {
        let now = Utc::now();
        RefreshToken {
            id: uuid::Uuid::new_v4(),
            user_id,
            token_hash: tokens::hash_token("presented"),
            expires_at: now + expires_in,
            created_by_ip: Some("203.0.113.9".to_string()),
            revoked_at: revoked.then_some(now),
            revoked_by_ip: None,
            replaced_by_hash: None,
            created_at: now,
        }
    }

    #[test]
    fn test_banned_users_are_refused() {
        let mut user = sample_user();
        assert!(ensure_not_banned(&user).is_ok());

        user.is_banned = true;
        assert!(matches!(ensure_not_banned(&user), Err(AppError::Forbidden(_))));
    }

    #[test]
    fn test_active_refresh_token_rotates() {
        let record = stored_token(uuid::Uuid::new_v4(), Duration::days(7), false);
        assert_eq!(
            refresh_step(&record, Utc::now()).unwrap(),
            RefreshStep::Rotate
        );
    }

    #[test]
    fn test_revoked_refresh_token_revokes_every_session() {
        let record = stored_token(uuid::Uuid::new_v4(), Duration::days(7), true);
        assert_eq!(
            refresh_step(&record, Utc::now()).unwrap(),
            RefreshStep::RevokeAll
        );

        // Still treated as reuse once it has also expired
        let stale = stored_token(uuid::Uuid::new_v4(), Duration::days(-2), true);
        assert_eq!(
            refresh_step(&stale, Utc::now()).unwrap(),
            RefreshStep::RevokeAll
        );
    }

    #[test]
    fn test_expired_refresh_token_is_unauthorized() {
        let record = stored_token(uuid::Uuid::new_v4(), Duration::seconds(-1), false);
        match refresh_step(&record, Utc::now()) {
            Err(AppError::Unauthorized(msg)) => assert_eq!(msg, "Refresh token expired."),
            other => panic!("expected 401, got {:?}", other),
        }
    }

    #[test]
    fn test_losing_a_concurrent_rotation_counts_as_reuse() {
        assert_eq!(settle_rotation(true), RefreshStep::Rotate);
        assert_eq!(settle_rotation(false), RefreshStep::RevokeAll);
        assert_eq!(token_reuse_error().status(), axum::http::StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_refresh_owner_checks() {
        assert!(matches!(refresh_owner(None), Err(AppError::Unauthorized(_))));

        let mut deleted = sample_user();
        deleted.is_deleted = true;
        assert!(matches!(
            refresh_owner(Some(deleted)),
            Err(AppError::Unauthorized(_))
        ));

        let mut banned = sample_user();
        banned.is_banned = true;
        assert!(matches!(
            refresh_owner(Some(banned)),
            Err(AppError::Forbidden(_))
        ));

        let user = sample_user();
        let id = user.id;
        assert_eq!(refresh_owner(Some(user)).unwrap().id, id);
    }

    #[test]
    fn test_verification_outcomes() {
        let now = Utc::now();
        let mut user = sample_user();
        user.is_email_verified = false;
        user.verification_token_hash = Some(tokens::hash_token("emailed"));
        user.verification_token_expires_at = Some(now + Duration::hours(24));

        assert_eq!(
            verification_outcome(&user, &tokens::hash_token("emailed"), now).unwrap(),
            VerifyOutcome::Verified
        );
        assert!(matches!(
            verification_outcome(&user, &tokens::hash_token("guessed"), now),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            verification_outcome(
                &user,
                &tokens::hash_token("emailed"),
                now + Duration::hours(25)
            ),
            Err(AppError::BadRequest(_))
        ));

        user.is_email_verified = true;
        assert_eq!(
            verification_outcome(&user, &tokens::hash_token("guessed"), now).unwrap(),
            VerifyOutcome::AlreadyVerified
        );
    }

    #[test]
    fn test_reset_target_requires_unexpired_token() {
        let now = Utc::now();
        let hash = tokens::hash_token("reset");
        let mut user = sample_user();
        user.password_reset_token_hash = Some(hash.clone());
        user.password_reset_expires_at = Some(now + Duration::hours(PASSWORD_RESET_TTL_HOURS));

        assert!(reset_target(Some(user.clone()), &hash, now).is_ok());
        assert!(matches!(
            reset_target(Some(user.clone()), &hash, now + Duration::hours(2)),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            reset_target(None, &hash, now),
            Err(AppError::BadRequest(_))
        ));

        user.is_deleted = true;
        assert!(reset_target(Some(user), &hash, now).is_err());
    }
}
