use axum::{
    extract::State,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::middleware::{auth::AuthUser, session::AppState};
use crate::api::{ApiResponse, AppJson};
use crate::db;
use crate::error::{AppError, Result};
use crate::models::{
    application::{Application, ApplicationHistoryEntry},
    profile::JobSeekerProfile,
    saved_job::{SavedJob, SavedJobEntry},
    user::Role,
    Job,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobIdRequest {
    job_id: Option<Uuid>,
}

impl JobIdRequest {
    fn require(self) -> Result<Uuid> {
        self.job_id
            .ok_or_else(|| AppError::BadRequest("jobId is required.".to_string()))
    }
}

/// Applies to an open job with the resume on file
async fn apply(
    State(state): State<AppState>,
    auth: AuthUser,
    AppJson(body): AppJson<JobIdRequest>,
) -> Result<ApiResponse<Application>> {
    let seeker = auth.require_role(Role::JobSeeker)?;
    let job_id = body.require()?;

    let job = Job::find_by_id(&state.pool, job_id)
        .await?
        .filter(Job::is_open_for_applications)
        .ok_or_else(|| AppError::NotFound("Job Unavailable".to_string()))?;

    let resume_url = JobSeekerProfile::find_by_user_id(&state.pool, seeker.id)
        .await?
        .and_then(|p| p.resume_url)
        .filter(|url| !url.trim().is_empty())
        .ok_or_else(|| AppError::NotFound("Profile or Resume not available".to_string()))?;

    let application = Application::submit(&state.pool, job.id, seeker.id, &resume_url)
        .await
        .map_err(|e| {
            if db::is_unique_violation(&e) {
                AppError::Conflict("Already applied.".to_string())
            } else {
                AppError::Database(e)
            }
        })?;

    tracing::info!(
        application_id = %application.id,
        job_id = %job.id,
        applicant_id = %seeker.id,
        "Application submitted"
    );

    Ok(ApiResponse::created(
        "Application submitted successfully!",
        application,
    ))
}

/// Lists the caller's applications, newest first
async fn history(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<ApiResponse<Vec<ApplicationHistoryEntry>>> {
    let seeker = auth.require_role(Role::JobSeeker)?;
    let entries = Application::history_for_applicant(&state.pool, seeker.id).await?;

    Ok(ApiResponse::ok("Applications retrieved", entries))
}

#[derive(Debug, Serialize)]
struct SaveState {
    saved: bool,
}

/// Saves or un-saves a job
async fn toggle_save(
    State(state): State<AppState>,
    auth: AuthUser,
    AppJson(body): AppJson<JobIdRequest>,
) -> Result<ApiResponse<SaveState>> {
    let seeker = auth.require_role(Role::JobSeeker)?;
    let job_id = body.require()?;

    if Job::find_by_id(&state.pool, job_id).await?.is_none() {
        return Err(AppError::NotFound("Job not Found".to_string()));
    }

    let saved = SavedJob::toggle(&state.pool, seeker.id, job_id).await?;
    let message = if saved {
        "Job Saved Successfully."
    } else {
        "Job Removed From Saved List."
    };

    Ok(ApiResponse::ok(message, SaveState { saved }))
}

async fn saved_jobs(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<ApiResponse<Vec<SavedJobEntry>>> {
    let seeker = auth.require_role(Role::JobSeeker)?;
    let entries = SavedJob::list_for_user(&state.pool, seeker.id).await?;

    Ok(ApiResponse::ok("Saved jobs retrieved", entries))
}

/// Creates the applications router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/apply", post(apply))
        .route("/history", get(history))
        .route("/save", post(toggle_save))
        .route("/saved", get(saved_jobs))
}
