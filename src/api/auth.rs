use axum::{
    extract::State,
    http::{header, HeaderMap},
    response::{AppendHeaders, IntoResponse, Redirect, Response},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tower_sessions::{
    cookie::{Cookie, SameSite},
    Session,
};
use uuid::Uuid;

use crate::api::middleware::{
    auth::{AuthUser, ClientIp},
    session::{AppState, SESSION_KEY_CSRF_TOKEN, SESSION_KEY_PKCE_VERIFIER, SESSION_KEY_SIGNUP_ROLE},
};
use crate::api::{ApiResponse, AppJson, AppQuery};
use crate::error::{AppError, Result};
use crate::models::user::{Role, User};
use crate::services::{
    auth::{SessionTokens, VerifyOutcome},
    mailer,
    oauth::google,
    validation::{self, RegisterRequest},
};

pub const REFRESH_COOKIE: &str = "refreshToken";
const REFRESH_COOKIE_PATH: &str = "/api/auth";
const GOOGLE_CALLBACK_PATH: &str = "/api/auth/google/callback";
const FRONTEND_OAUTH_PATH: &str = "/oauth/callback";

/// Builds the HttpOnly cookie carrying a refresh token
pub fn refresh_cookie(token: &str, expires_at: DateTime<Utc>, secure: bool) -> String {
    let max_age = (expires_at - Utc::now()).num_seconds().max(0);

    Cookie::build((REFRESH_COOKIE, token.to_string()))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path(REFRESH_COOKIE_PATH)
        .max_age(time::Duration::seconds(max_age))
        .build()
        .to_string()
}

/// Expires the refresh cookie on the client
pub fn clear_refresh_cookie(secure: bool) -> String {
    Cookie::build((REFRESH_COOKIE, ""))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path(REFRESH_COOKIE_PATH)
        .max_age(time::Duration::ZERO)
        .build()
        .to_string()
}

/// Reads the refresh token from the request cookies
pub fn refresh_token_from_cookies(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(|cookie| cookie.ok())
        .find(|cookie| cookie.name() == REFRESH_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .filter(|value| !value.is_empty())
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RegisteredUser {
    user_id: Uuid,
    email: String,
    role: Role,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SignedInUser {
    id: Uuid,
    email: String,
    role: Role,
    is_email_verified: bool,
    token: String,
    refresh_token: String,
}

impl SignedInUser {
    fn new(user: &User, tokens: &SessionTokens) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            role: user.role,
            is_email_verified: user.is_email_verified,
            token: tokens.access_token.clone(),
            refresh_token: tokens.refresh_token.clone(),
        }
    }
}

fn signed_in(state: &AppState, user: &User, tokens: &SessionTokens, message: &str) -> Response {
    let cookie = refresh_cookie(
        &tokens.refresh_token,
        tokens.refresh_expires_at,
        state.config.production,
    );

    (
        AppendHeaders([(header::SET_COOKIE, cookie)]),
        ApiResponse::ok(message, SignedInUser::new(user, tokens)),
    )
        .into_response()
}

/// Registers a job seeker or employer account
async fn register(
    State(state): State<AppState>,
    body: Option<AppJson<RegisterRequest>>,
) -> Result<ApiResponse<RegisteredUser>> {
    let request = match body {
        Some(AppJson(request)) if !request.is_empty() => request,
        _ => {
            return Err(AppError::Validation {
                message: "Request body is empty. Please send JSON data with Content-Type: application/json header.".to_string(),
                errors: vec!["Request body is required".to_string()],
            })
        }
    };

    let registration = validation::validate_registration(&request).map_err(AppError::validation)?;
    let user = state.auth.register(registration).await?;

    Ok(ApiResponse::created(
        "User registered successfully. Please verify your email, then log in.",
        RegisteredUser {
            user_id: user.id,
            email: user.email,
            role: user.role,
        },
    ))
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    email: Option<String>,
    password: Option<String>,
}

/// Logs in with email and password
async fn login(
    State(state): State<AppState>,
    ip: ClientIp,
    AppJson(body): AppJson<LoginRequest>,
) -> Result<Response> {
    let (Some(email), Some(password)) = (body.email, body.password) else {
        return Err(AppError::BadRequest(
            "Please provide email and password.".to_string(),
        ));
    };

    let (user, tokens) = state.auth.login(&email, &password, ip.as_deref()).await?;

    Ok(signed_in(&state, &user, &tokens, "Login successful"))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest {
    refresh_token: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshedTokens {
    token: String,
    refresh_token: String,
}

/// Rotates the refresh token and issues a new access token
async fn refresh(
    State(state): State<AppState>,
    ip: ClientIp,
    headers: HeaderMap,
    body: Option<AppJson<RefreshRequest>>,
) -> Result<Response> {
    let presented = refresh_token_from_cookies(&headers)
        .or_else(|| body.and_then(|AppJson(b)| b.refresh_token))
        .ok_or_else(|| AppError::Unauthorized("Refresh token is required.".to_string()))?;

    let (_user, tokens) = state.auth.refresh(&presented, ip.as_deref()).await?;

    let cookie = refresh_cookie(
        &tokens.refresh_token,
        tokens.refresh_expires_at,
        state.config.production,
    );

    Ok((
        AppendHeaders([(header::SET_COOKIE, cookie)]),
        ApiResponse::ok(
            "Token refreshed",
            RefreshedTokens {
                token: tokens.access_token,
                refresh_token: tokens.refresh_token,
            },
        ),
    )
        .into_response())
}

/// Revokes the refresh token and clears the cookie
async fn logout(
    State(state): State<AppState>,
    ip: ClientIp,
    headers: HeaderMap,
    body: Option<AppJson<RefreshRequest>>,
) -> Result<Response> {
    let presented = refresh_token_from_cookies(&headers)
        .or_else(|| body.and_then(|AppJson(b)| b.refresh_token));

    state.auth.logout(presented.as_deref(), ip.as_deref()).await?;

    Ok((
        AppendHeaders([(
            header::SET_COOKIE,
            clear_refresh_cookie(state.config.production),
        )]),
        ApiResponse::message("Logged out successfully"),
    )
        .into_response())
}

#[derive(Debug, Deserialize)]
struct VerifyEmailQuery {
    code: Option<String>,
}

/// Confirms an email address from the link in the verification email
async fn verify_email(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<VerifyEmailQuery>,
) -> Result<ApiResponse<()>> {
    let code = query
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AppError::BadRequest("Verification code is required.".to_string()))?;

    let message = match state.auth.verify_email(&code).await? {
        VerifyOutcome::Verified => "Email verified successfully. You can now log in to your account.",
        VerifyOutcome::AlreadyVerified => "Email is already verified.",
    };

    Ok(ApiResponse::message(message))
}

#[derive(Debug, Deserialize)]
struct EmailRequest {
    email: Option<String>,
}

async fn resend_verification(
    State(state): State<AppState>,
    AppJson(body): AppJson<EmailRequest>,
) -> Result<ApiResponse<()>> {
    let email = body
        .email
        .filter(|e| !e.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("Email is required.".to_string()))?;

    state.auth.resend_verification(&email).await?;

    Ok(ApiResponse::message(
        "If that account exists and is unverified, a new verification email has been sent.",
    ))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleAuthRequest {
    id_token: Option<String>,
    role: Option<String>,
}

/// Signs in with a Google ID token obtained by the client
async fn google_auth(
    State(state): State<AppState>,
    ip: ClientIp,
    AppJson(body): AppJson<GoogleAuthRequest>,
) -> Result<Response> {
    let id_token = body
        .id_token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::BadRequest("Google ID Token is required".to_string()))?;

    let identity = state.auth.verify_google_id_token(&id_token).await?;
    let (user, tokens) = state
        .auth
        .google_sign_in(identity, body.role.as_deref(), ip.as_deref())
        .await?;

    Ok(signed_in(&state, &user, &tokens, "Login successful"))
}

#[derive(Debug, Deserialize)]
struct GoogleLoginQuery {
    role: Option<String>,
}

fn google_redirect_uri(state: &AppState) -> String {
    format!(
        "{}{}",
        state.config.base_url.trim_end_matches('/'),
        GOOGLE_CALLBACK_PATH
    )
}

/// Initiates the server-side Google sign-in flow
async fn google_login(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<GoogleLoginQuery>,
    session: Session,
) -> Result<Redirect> {
    let client_secret = state
        .config
        .google_client_secret
        .as_ref()
        .ok_or_else(|| AppError::Upstream("Google client secret not configured".to_string()))?;

    let (auth_url, csrf_token, pkce_verifier) = google::build_auth_url(
        &state.config.google_client_id,
        client_secret,
        &google_redirect_uri(&state),
    )
    .map_err(|e| AppError::OAuth(e.to_string()))?;

    // Store CSRF token and PKCE verifier in session
    session
        .insert(SESSION_KEY_CSRF_TOKEN, csrf_token)
        .await
        .map_err(|e| AppError::Internal(e.into()))?;
    session
        .insert(SESSION_KEY_PKCE_VERIFIER, pkce_verifier)
        .await
        .map_err(|e| AppError::Internal(e.into()))?;
    session
        .insert(SESSION_KEY_SIGNUP_ROLE, query.role)
        .await
        .map_err(|e| AppError::Internal(e.into()))?;

    tracing::info!("Redirecting to Google sign-in");

    Ok(Redirect::to(&auth_url))
}

#[derive(Debug, Deserialize)]
struct OAuthCallback {
    code: String,
    state: String,
}

/// Handles the redirect back from Google
async fn google_callback(
    State(state): State<AppState>,
    AppQuery(params): AppQuery<OAuthCallback>,
    ip: ClientIp,
    session: Session,
) -> Result<Response> {
    // Verify CSRF token
    let stored_csrf: Option<String> = session
        .remove(SESSION_KEY_CSRF_TOKEN)
        .await
        .map_err(|e| AppError::Internal(e.into()))?;

    if stored_csrf.as_deref() != Some(params.state.as_str()) {
        return Err(AppError::OAuth("CSRF token mismatch".to_string()));
    }

    let pkce_verifier: Option<String> = session
        .remove(SESSION_KEY_PKCE_VERIFIER)
        .await
        .map_err(|e| AppError::Internal(e.into()))?;
    let role: Option<String> = session
        .remove::<Option<String>>(SESSION_KEY_SIGNUP_ROLE)
        .await
        .map_err(|e| AppError::Internal(e.into()))?
        .flatten();

    let client_secret = state
        .config
        .google_client_secret
        .as_ref()
        .ok_or_else(|| AppError::Upstream("Google client secret not configured".to_string()))?;

    let access_token = google::exchange_code(
        &params.code,
        &state.config.google_client_id,
        client_secret,
        &google_redirect_uri(&state),
        pkce_verifier.as_deref(),
    )
    .await
    .map_err(|e| AppError::OAuth(e.to_string()))?;

    let identity = google::fetch_user_info(&state.config.google_userinfo_url, &access_token)
        .await
        .map_err(|e| AppError::OAuth(e.to_string()))?;

    let (user, tokens) = state
        .auth
        .google_sign_in(identity, role.as_deref(), ip.as_deref())
        .await?;

    tracing::info!(user_id = %user.id, "Google sign-in completed");

    let landing = mailer::build_link(
        state.config.frontend_base(),
        FRONTEND_OAUTH_PATH,
        "token",
        &tokens.access_token,
    )
    .map_err(|e| AppError::Internal(e.into()))?;

    let cookie = refresh_cookie(
        &tokens.refresh_token,
        tokens.refresh_expires_at,
        state.config.production,
    );

    Ok((
        AppendHeaders([(header::SET_COOKIE, cookie)]),
        Redirect::to(&landing),
    )
        .into_response())
}

async fn forgot_password(
    State(state): State<AppState>,
    AppJson(body): AppJson<EmailRequest>,
) -> Result<ApiResponse<()>> {
    let email = body
        .email
        .filter(|e| !e.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("Email is required.".to_string()))?;

    state.auth.forgot_password(&email).await?;

    Ok(ApiResponse::message("Password reset email sent successfully."))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResetPasswordRequest {
    token: Option<String>,
    new_password: Option<String>,
}

async fn reset_password(
    State(state): State<AppState>,
    AppJson(body): AppJson<ResetPasswordRequest>,
) -> Result<ApiResponse<()>> {
    let (Some(token), Some(new_password)) = (
        body.token.filter(|t| !t.is_empty()),
        body.new_password.filter(|p| !p.is_empty()),
    ) else {
        return Err(AppError::BadRequest(
            "Token and new password are required.".to_string(),
        ));
    };

    state.auth.reset_password(&token, &new_password).await?;

    Ok(ApiResponse::message("Password has been reset successfully."))
}

/// Returns the signed-in user
async fn me(AuthUser(user): AuthUser) -> ApiResponse<User> {
    ApiResponse::ok("Current user", user)
}

/// Creates the auth router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/refresh", post(refresh))
        .route("/logout", post(logout))
        .route("/verify-email", get(verify_email))
        .route("/resend-verification", post(resend_verification))
        .route("/google-auth", post(google_auth))
        .route("/google/login", get(google_login))
        .route("/google/callback", get(google_callback))
        .route("/forgot-password", post(forgot_password))
        .route("/reset-password", post(reset_password))
        .route("/me", get(me))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use chrono::Duration;

    #[test]
    fn test_refresh_cookie_attributes() {
        let cookie = refresh_cookie("abc123", Utc::now() + Duration::days(7), true);

        assert!(cookie.starts_with("refreshToken=abc123"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Secure"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(cookie.contains("Path=/api/auth"));
        assert!(cookie.contains("Max-Age="));
    }

    #[test]
    fn test_cleared_cookie_expires_immediately() {
        let cookie = clear_refresh_cookie(false);

        assert!(cookie.starts_with("refreshToken=;"));
        assert!(cookie.contains("Max-Age=0"));
        assert!(!cookie.contains("Secure"));
    }

    #[test]
    fn test_refresh_token_read_from_cookie_header() {
        let mut headers = HeaderMap::new();
        assert_eq!(refresh_token_from_cookies(&headers), None);

        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("id=xyz; refreshToken=deadbeef; theme=dark"),
        );
        assert_eq!(
            refresh_token_from_cookies(&headers).as_deref(),
            Some("deadbeef")
        );

        headers.insert(header::COOKIE, HeaderValue::from_static("refreshToken="));
        assert_eq!(refresh_token_from_cookies(&headers), None);
    }
}
