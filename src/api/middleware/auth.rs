use std::net::SocketAddr;

use axum::{
    async_trait,
    extract::{ConnectInfo, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};

use super::session::AppState;
use crate::error::AppError;
use crate::models::user::{Role, User};
use crate::services::tokens::TokenError;

/// The signed-in user, reloaded from the database on every request
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

impl AuthUser {
    /// Rejects users whose role is not `role`
    pub fn require_role(&self, role: Role) -> Result<&User, AppError> {
        if self.0.role != role {
            tracing::debug!(user_id = %self.0.id, required = %role, "Role check failed");
            return Err(AppError::Forbidden(format!(
                "This action requires the {} role.",
                role
            )));
        }
        Ok(&self.0)
    }
}

/// Extracts the token from `Authorization: Bearer <token>`
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();

    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)
            .ok_or_else(|| AppError::Unauthorized("Not authorized, no token.".to_string()))?;

        let claims = state.auth.signer().decode(token).map_err(|e| match e {
            TokenError::Expired => AppError::Unauthorized("Access token expired.".to_string()),
            _ => AppError::Unauthorized("Not authorized, token failed.".to_string()),
        })?;

        let user = User::find_by_id(&state.pool, claims.sub)
            .await?
            .filter(|u| !u.is_deleted)
            .ok_or_else(|| AppError::Unauthorized("User no longer exists.".to_string()))?;

        if user.is_banned {
            return Err(AppError::Forbidden(
                "Your account has been suspended.".to_string(),
            ));
        }

        Ok(AuthUser(user))
    }
}

/// An authenticated user with the admin flag
#[derive(Debug, Clone)]
pub struct AdminUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let AuthUser(user) = AuthUser::from_request_parts(parts, state).await?;

        if !user.is_admin {
            tracing::info!(user_id = %user.id, "Non-admin denied admin route");
            return Err(AppError::Forbidden("Access Denied.".to_string()));
        }

        Ok(AdminUser(user))
    }
}

/// An admin whose admin role is SuperAdmin
#[derive(Debug, Clone)]
pub struct SuperAdmin(pub User);

#[async_trait]
impl FromRequestParts<AppState> for SuperAdmin {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let AdminUser(user) = AdminUser::from_request_parts(parts, state).await?;

        if !user.is_super_admin() {
            return Err(AppError::Forbidden(
                "Access Denied. SuperAdmin privileges required.".to_string(),
            ));
        }

        Ok(SuperAdmin(user))
    }
}

/// Client address: first `X-Forwarded-For` hop, else the peer address
#[derive(Debug, Clone, Default)]
pub struct ClientIp(pub Option<String>);

impl ClientIp {
    pub fn as_deref(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let forwarded = parts
            .headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string);

        let ip = forwarded.or_else(|| {
            parts
                .extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
        });

        Ok(ClientIp(ip))
    }
}
