use axum::{
    extract::State,
    routing::{get, patch, post},
    Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::middleware::{
    auth::{AdminUser, ClientIp, SuperAdmin},
    session::AppState,
};
use crate::api::{ApiResponse, AppJson, AppPath, AppQuery};
use crate::error::{AppError, Result};
use crate::models::{
    audit_log::{AuditAction, AuditLog},
    job::ModerationStatus,
    pagination::PageParams,
    refresh_token::RefreshToken,
    user::{AdminRole, User},
    Job,
};
use crate::services::mailer;

async fn list_users(
    State(state): State<AppState>,
    _admin: AdminUser,
    AppQuery(page): AppQuery<PageParams>,
) -> Result<ApiResponse<Vec<User>>> {
    let users = User::list(&state.pool, page.limit(), page.offset()).await?;
    let total = User::count(&state.pool).await?;

    Ok(ApiResponse::ok("Users retrieved", users).with_pagination(page.describe(total)))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BanState {
    user_id: Uuid,
    is_banned: bool,
}

/// Bans or unbans a user; banning ends every session they hold
async fn toggle_ban(
    State(state): State<AppState>,
    SuperAdmin(admin): SuperAdmin,
    ip: ClientIp,
    AppPath(user_id): AppPath<Uuid>,
) -> Result<ApiResponse<BanState>> {
    if user_id == admin.id {
        return Err(AppError::BadRequest("You cannot ban yourself.".to_string()));
    }

    let user = User::toggle_ban(&state.pool, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found.".to_string()))?;

    let action = if user.is_banned {
        let revoked = RefreshToken::revoke_all_for_user(&state.pool, user.id, ip.as_deref()).await?;
        tracing::info!(user_id = %user.id, revoked, "Sessions revoked for banned user");
        AuditAction::BanUser
    } else {
        AuditAction::UnbanUser
    };

    AuditLog::record(
        &state.pool,
        admin.id,
        action,
        user.id,
        "User",
        Some(format!("Target email: {}", user.email)),
    )
    .await?;

    let label = if user.is_banned { "Banned" } else { "Active" };

    Ok(ApiResponse::ok(
        format!("User marked as {}.", label),
        BanState {
            user_id: user.id,
            is_banned: user.is_banned,
        },
    ))
}

async fn pending_jobs(
    State(state): State<AppState>,
    _admin: AdminUser,
    AppQuery(page): AppQuery<PageParams>,
) -> Result<ApiResponse<Vec<Job>>> {
    let (jobs, total) =
        Job::list_pending_moderation(&state.pool, page.limit(), page.offset()).await?;

    Ok(ApiResponse::ok("Pending jobs retrieved", jobs).with_pagination(page.describe(total)))
}

#[derive(Debug, Deserialize)]
struct ModerationRequest {
    status: Option<ModerationStatus>,
    reason: Option<String>,
}

/// Only a final verdict may be recorded
fn moderation_verdict(status: Option<ModerationStatus>) -> Result<(ModerationStatus, AuditAction)> {
    match status {
        Some(ModerationStatus::Approved) => Ok((ModerationStatus::Approved, AuditAction::ApproveJob)),
        Some(ModerationStatus::Rejected) => Ok((ModerationStatus::Rejected, AuditAction::RejectJob)),
        _ => Err(AppError::BadRequest(
            "Status must be either Approved or Rejected.".to_string(),
        )),
    }
}

/// Approves or rejects a posting and tells the employer
async fn moderate_job(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    AppPath(job_id): AppPath<Uuid>,
    AppJson(body): AppJson<ModerationRequest>,
) -> Result<ApiResponse<Job>> {
    let (status, action) = moderation_verdict(body.status)?;
    let reason = body
        .reason
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty());

    let job = Job::set_moderation_status(&state.pool, job_id, status)
        .await?
        .ok_or_else(|| AppError::NotFound("Job not found.".to_string()))?;

    AuditLog::record(&state.pool, admin.id, action, job.id, "Job", reason.clone()).await?;

    if let Some(employer) = User::find_by_id(&state.pool, job.employer_id).await? {
        state.email_queue.enqueue(mailer::job_moderation_email(
            &employer.email,
            &job.title,
            status == ModerationStatus::Approved,
            reason.as_deref(),
        ));
    }

    Ok(ApiResponse::ok("Job moderation updated", job))
}

#[derive(Debug, Deserialize)]
struct CreateModeratorRequest {
    email: Option<String>,
    password: Option<String>,
}

async fn create_moderator(
    State(state): State<AppState>,
    SuperAdmin(admin): SuperAdmin,
    AppJson(body): AppJson<CreateModeratorRequest>,
) -> Result<ApiResponse<User>> {
    let (Some(email), Some(password)) = (body.email, body.password) else {
        return Err(AppError::BadRequest(
            "Email and password are required.".to_string(),
        ));
    };

    let moderator = state
        .auth
        .create_admin(&email, &password, AdminRole::Moderator)
        .await?;

    AuditLog::record(
        &state.pool,
        admin.id,
        AuditAction::CreateModerator,
        moderator.id,
        "User",
        Some(format!("Created moderator {}", moderator.email)),
    )
    .await?;

    Ok(ApiResponse::created("Moderator created successfully", moderator))
}

async fn audit_logs(
    State(state): State<AppState>,
    _admin: SuperAdmin,
    AppQuery(page): AppQuery<PageParams>,
) -> Result<ApiResponse<Vec<AuditLog>>> {
    let (entries, total) = AuditLog::list(&state.pool, page.limit(), page.offset()).await?;

    Ok(ApiResponse::ok("Audit logs retrieved", entries).with_pagination(page.describe(total)))
}

/// Creates the admin router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/:user_id/ban", patch(toggle_ban))
        .route("/jobs", get(pending_jobs))
        .route("/jobs/:job_id/moderate", patch(moderate_job))
        .route("/moderators", post(create_moderator))
        .route("/logs", get(audit_logs))
}
