use axum::{extract::State, routing::get, Router};

use crate::api::middleware::{auth::AuthUser, session::AppState};
use crate::api::{ApiResponse, AppJson};
use crate::error::{AppError, Result};
use crate::models::{
    profile::{JobSeekerProfile, UpdateJobSeekerProfile},
    user::Role,
};

async fn get_profile(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<ApiResponse<JobSeekerProfile>> {
    let seeker = auth.require_role(Role::JobSeeker)?;

    let profile = JobSeekerProfile::find_by_user_id(&state.pool, seeker.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Profile not found.".to_string()))?;

    Ok(ApiResponse::ok("Profile retrieved", profile))
}

/// Creates or patches the caller's profile; omitted fields are kept
async fn update_profile(
    State(state): State<AppState>,
    auth: AuthUser,
    AppJson(body): AppJson<UpdateJobSeekerProfile>,
) -> Result<ApiResponse<JobSeekerProfile>> {
    let seeker = auth.require_role(Role::JobSeeker)?;

    let profile = JobSeekerProfile::upsert(&state.pool, seeker.id, body).await?;

    tracing::info!(user_id = %seeker.id, "Job seeker profile updated");

    Ok(ApiResponse::ok("Profile updated successfully", profile))
}

/// Creates the job seeker router
pub fn router() -> Router<AppState> {
    Router::new().route("/profile", get(get_profile).put(update_profile))
}
