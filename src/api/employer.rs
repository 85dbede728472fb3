use axum::{
    extract::State,
    routing::{get, patch},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::api::middleware::{auth::AuthUser, session::AppState};
use crate::api::{ApiResponse, AppJson, AppPath};
use crate::error::{AppError, Result};
use crate::models::{
    application::{ApplicantRow, Application, ApplicationStatus, RejectionReason},
    profile::{CompanyProfile, UpdateCompanyProfile},
    user::{Role, User},
    Job,
};
use crate::services::mailer;

const HIDDEN: &str = "HIDDEN";

async fn get_profile(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<ApiResponse<CompanyProfile>> {
    let employer = auth.require_role(Role::Employer)?;

    let profile = CompanyProfile::find_by_user_id(&state.pool, employer.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Company Profile Not Found.".to_string()))?;

    Ok(ApiResponse::ok("Company profile retrieved", profile))
}

async fn update_profile(
    State(state): State<AppState>,
    auth: AuthUser,
    AppJson(body): AppJson<UpdateCompanyProfile>,
) -> Result<ApiResponse<CompanyProfile>> {
    let employer = auth.require_role(Role::Employer)?;

    let profile = CompanyProfile::upsert(&state.pool, employer.id, body).await?;

    tracing::info!(user_id = %employer.id, "Company profile updated");

    Ok(ApiResponse::ok("Company profile updated successfully", profile))
}

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EmployerStats {
    pub total_jobs: usize,
    pub active_jobs: usize,
    pub total_applications: i64,
}

async fn stats(State(state): State<AppState>, auth: AuthUser) -> Result<ApiResponse<EmployerStats>> {
    let employer = auth.require_role(Role::Employer)?;

    let jobs = Job::list_by_employer(&state.pool, employer.id).await?;
    let total_applications = Application::count_for_employer(&state.pool, employer.id).await?;

    Ok(ApiResponse::ok(
        "Stats retrieved",
        EmployerStats {
            total_jobs: jobs.len(),
            active_jobs: jobs.iter().filter(|j| j.is_active).count(),
            total_applications,
        },
    ))
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ApplicantLinks {
    pub linkedin: Option<String>,
    pub portfolio: Option<String>,
    pub github: Option<String>,
}

/// An applicant as shown to the employer
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicantView {
    pub application_id: Uuid,
    pub status: ApplicationStatus,
    pub applied_at: chrono::DateTime<chrono::Utc>,
    pub applicant_name: String,
    pub email: String,
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headline: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub skills: Vec<String>,
    pub work_experience: JsonValue,
    pub education: JsonValue,
    pub resume_url: String,
    pub links: ApplicantLinks,
}

/// "Candidate #" plus the last four hex digits of the application id
pub fn candidate_alias(application_id: Uuid) -> String {
    let simple = application_id.simple().to_string();
    format!("Candidate #{}", simple[simple.len() - 4..].to_uppercase())
}

fn join_location(city: Option<&str>, country: Option<&str>) -> Option<String> {
    let parts: Vec<&str> = [city, country]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();
    (!parts.is_empty()).then(|| parts.join(", "))
}

/// Shapes an applicant row, masking identity when the job runs in blind mode
pub fn present_applicant(row: ApplicantRow, blind: bool) -> ApplicantView {
    let skills = row.skills.unwrap_or_default();
    let work_experience = row.work_experience.unwrap_or_else(|| JsonValue::Array(vec![]));
    let education = row.education.unwrap_or_else(|| JsonValue::Array(vec![]));

    if blind {
        let hidden = || Some(HIDDEN.to_string());
        return ApplicantView {
            application_id: row.application_id,
            status: row.status,
            applied_at: row.applied_at,
            applicant_name: candidate_alias(row.application_id),
            email: HIDDEN.to_string(),
            phone: hidden(),
            headline: None,
            location: None,
            skills,
            work_experience,
            education,
            resume_url: row.resume_url,
            links: ApplicantLinks {
                linkedin: hidden(),
                portfolio: hidden(),
                github: hidden(),
            },
        };
    }

    let name = format!(
        "{} {}",
        row.first_name.as_deref().unwrap_or_default(),
        row.last_name.as_deref().unwrap_or_default()
    )
    .trim()
    .to_string();

    ApplicantView {
        application_id: row.application_id,
        status: row.status,
        applied_at: row.applied_at,
        applicant_name: if name.is_empty() { row.email.clone() } else { name },
        location: join_location(row.city.as_deref(), row.country.as_deref()),
        email: row.email,
        phone: row.phone,
        headline: row.headline,
        skills,
        work_experience,
        education,
        resume_url: row.resume_url,
        links: ApplicantLinks {
            linkedin: row.linkedin_url,
            portfolio: row.portfolio_url,
            github: row.github_url,
        },
    }
}

/// Loads a job and checks the caller owns it; foreign jobs look missing
async fn owned_job(state: &AppState, employer: &User, job_id: Uuid) -> Result<Job> {
    Job::find_by_id(&state.pool, job_id)
        .await?
        .filter(|job| job.employer_id == employer.id)
        .ok_or_else(|| AppError::NotFound("Job not found or unauthorized.".to_string()))
}

async fn applicants(
    State(state): State<AppState>,
    auth: AuthUser,
    AppPath(job_id): AppPath<Uuid>,
) -> Result<ApiResponse<Vec<ApplicantView>>> {
    let employer = auth.require_role(Role::Employer)?;
    let job = owned_job(&state, employer, job_id).await?;

    let rows = Application::applicants_for_job(&state.pool, job.id).await?;
    let applicants = rows
        .into_iter()
        .map(|row| present_applicant(row, job.is_blind_mode))
        .collect();

    Ok(ApiResponse::ok("Applicants retrieved", applicants))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusUpdateRequest {
    status: Option<ApplicationStatus>,
    rejection_reason: Option<RejectionReason>,
}

/// Rejections need a reason; any other status clears it
fn resolve_status_update(
    status: Option<ApplicationStatus>,
    reason: Option<RejectionReason>,
) -> Result<(ApplicationStatus, Option<RejectionReason>)> {
    match status {
        None => Err(AppError::BadRequest("Status is required.".to_string())),
        Some(ApplicationStatus::Rejected) => match reason {
            Some(reason) => Ok((ApplicationStatus::Rejected, Some(reason))),
            None => Err(AppError::BadRequest(
                "Rejection reason is required when rejecting an application.".to_string(),
            )),
        },
        Some(status) => Ok((status, None)),
    }
}

/// Moves an application through the hiring pipeline and notifies the applicant
async fn update_status(
    State(state): State<AppState>,
    auth: AuthUser,
    AppPath(application_id): AppPath<Uuid>,
    AppJson(body): AppJson<StatusUpdateRequest>,
) -> Result<ApiResponse<Application>> {
    let employer = auth.require_role(Role::Employer)?;
    let (status, reason) = resolve_status_update(body.status, body.rejection_reason)?;

    let application = Application::find_by_id(&state.pool, application_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Application not found.".to_string()))?;

    let job = Job::find_by_id(&state.pool, application.job_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Job not found.".to_string()))?;

    if job.employer_id != employer.id {
        return Err(AppError::Forbidden(
            "You are not authorized to update this application.".to_string(),
        ));
    }

    let updated = Application::update_status(&state.pool, application.id, status, reason).await?;

    if let Some(applicant) = User::find_by_id(&state.pool, updated.applicant_id).await? {
        let reason_label = reason
            .and_then(|r| serde_json::to_value(r).ok())
            .and_then(|v| v.as_str().map(str::to_string));

        state.email_queue.enqueue(mailer::application_status_email(
            &applicant.email,
            &job.title,
            &job.company_name,
            status.label(),
            reason_label.as_deref(),
        ));
    }

    tracing::info!(
        application_id = %updated.id,
        status = status.label(),
        "Application status updated"
    );

    Ok(ApiResponse::ok("Application status updated", updated))
}

/// Creates the employer router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/profile", get(get_profile).put(update_profile))
        .route("/stats", get(stats))
        .route("/jobs/:job_id/applicants", get(applicants))
        .route("/applications/:application_id/status", patch(update_status))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn row(application_id: Uuid) -> ApplicantRow {
        ApplicantRow {
            application_id,
            status: ApplicationStatus::Applied,
            applied_at: Utc::now(),
            resume_url: "https://files.example.com/cv.pdf".to_string(),
            email: "ada@example.com".to_string(),
            first_name: Some("Ada".to_string()),
            last_name: Some("Obi".to_string()),
            phone: Some("+2348000000000".to_string()),
            headline: Some("Backend developer".to_string()),
            city: Some("Lagos".to_string()),
            country: Some("Nigeria".to_string()),
            skills: Some(vec!["Rust".to_string()]),
            work_experience: None,
            education: None,
            linkedin_url: Some("https://linkedin.com/in/ada".to_string()),
            portfolio_url: None,
            github_url: Some("https://github.com/ada".to_string()),
        }
    }

    #[test]
    fn test_candidate_alias_uses_last_four_hex_digits() {
        let id = Uuid::parse_str("6f1c2d3e-0000-4000-8000-00000000beef").unwrap();
        assert_eq!(candidate_alias(id), "Candidate #BEEF");
    }

    #[test]
    fn test_blind_mode_masks_identity() {
        let id = Uuid::parse_str("6f1c2d3e-0000-4000-8000-0000000a1b2c").unwrap();
        let view = present_applicant(row(id), true);

        assert_eq!(view.applicant_name, "Candidate #1B2C");
        assert_eq!(view.email, HIDDEN);
        assert_eq!(view.phone.as_deref(), Some(HIDDEN));
        assert_eq!(view.links.github.as_deref(), Some(HIDDEN));
        assert!(view.headline.is_none());
        assert!(view.location.is_none());
        assert_eq!(view.skills, vec!["Rust".to_string()]);

        let json = serde_json::to_value(&view).unwrap();
        assert!(json.get("headline").is_none());
        assert!(json.get("location").is_none());
    }

    #[test]
    fn test_open_mode_shows_profile() {
        let view = present_applicant(row(Uuid::new_v4()), false);

        assert_eq!(view.applicant_name, "Ada Obi");
        assert_eq!(view.email, "ada@example.com");
        assert_eq!(view.location.as_deref(), Some("Lagos, Nigeria"));
        assert_eq!(view.links.portfolio, None);
        assert_eq!(view.work_experience, JsonValue::Array(vec![]));
    }

    #[test]
    fn test_rejection_requires_reason() {
        assert!(matches!(
            resolve_status_update(Some(ApplicationStatus::Rejected), None),
            Err(AppError::BadRequest(_))
        ));
        assert_eq!(
            resolve_status_update(
                Some(ApplicationStatus::Rejected),
                Some(RejectionReason::PositionFilled)
            )
            .unwrap(),
            (
                ApplicationStatus::Rejected,
                Some(RejectionReason::PositionFilled)
            )
        );
        assert_eq!(
            resolve_status_update(
                Some(ApplicationStatus::Interview),
                Some(RejectionReason::Other)
            )
            .unwrap(),
            (ApplicationStatus::Interview, None)
        );
        assert!(resolve_status_update(None, None).is_err());
    }
}
