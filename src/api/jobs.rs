use axum::{extract::State, routing::get, Router};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::middleware::{auth::AuthUser, session::AppState};
use crate::api::{ApiResponse, AppJson, AppPath, AppQuery};
use crate::error::{AppError, Result};
use crate::models::{
    job::{CreateJobData, Job, JobFilter, JobType, WorkMode},
    pagination::PageParams,
    profile::CompanyProfile,
    user::Role,
};
use crate::services::validation::require_text;

const DEFAULT_CURRENCY: &str = "NGN";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobSearchQuery {
    keyword: Option<String>,
    location: Option<String>,
    job_type: Option<String>,
    work_mode: Option<String>,
    page: Option<i64>,
    limit: Option<i64>,
}

/// Parses a wire name such as `Full-Time` into its enum
fn parse_wire<T: serde::de::DeserializeOwned>(value: &str) -> Option<T> {
    serde_json::from_value(serde_json::Value::String(value.to_string())).ok()
}

fn build_filter(query: &JobSearchQuery) -> Result<JobFilter> {
    let job_type = match query.job_type.as_deref().filter(|v| !v.is_empty()) {
        Some(v) => Some(
            parse_wire::<JobType>(v)
                .ok_or_else(|| AppError::BadRequest(format!("Unknown jobType: {}", v)))?,
        ),
        None => None,
    };
    let work_mode = match query.work_mode.as_deref().filter(|v| !v.is_empty()) {
        Some(v) => Some(
            parse_wire::<WorkMode>(v)
                .ok_or_else(|| AppError::BadRequest(format!("Unknown workMode: {}", v)))?,
        ),
        None => None,
    };

    Ok(JobFilter {
        keyword: query.keyword.clone(),
        location: query.location.clone(),
        job_type,
        work_mode,
    })
}

/// Lists open, approved jobs
async fn search_jobs(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<JobSearchQuery>,
) -> Result<ApiResponse<Vec<Job>>> {
    let filter = build_filter(&query)?;
    let page = PageParams {
        page: query.page,
        limit: query.limit,
    };

    let (jobs, total) = Job::search(&state.pool, &filter, page.limit(), page.offset()).await?;

    Ok(ApiResponse::ok("Jobs retrieved", jobs).with_pagination(page.describe(total)))
}

async fn get_job(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> Result<ApiResponse<Job>> {
    let job = Job::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Job not Found".to_string()))?;

    Ok(ApiResponse::ok("Job retrieved", job))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateJobRequest {
    pub title: Option<String>,
    pub company_name: Option<String>,
    pub location: Option<String>,
    pub job_type: Option<JobType>,
    pub work_mode: Option<WorkMode>,
    pub description: Option<String>,
    pub requirements: Option<Vec<String>>,
    pub salary_min: Option<i64>,
    pub salary_max: Option<i64>,
    pub salary_currency: Option<String>,
    pub is_blind_mode: Option<bool>,
}

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Validates a posting; the company name falls back to the employer's profile
pub fn validate_new_job(
    req: CreateJobRequest,
    employer_id: Uuid,
    profile_company: Option<&str>,
) -> std::result::Result<CreateJobData, Vec<String>> {
    let mut errors = Vec::new();

    require_text(&mut errors, "Title", req.title.as_deref());
    require_text(&mut errors, "Location", req.location.as_deref());
    require_text(&mut errors, "Description", req.description.as_deref());

    let company_name =
        trimmed(req.company_name).or_else(|| profile_company.map(str::to_string));
    if company_name.is_none() {
        errors.push("Company name is required.".to_string());
    }
    if req.job_type.is_none() {
        errors.push("Job type is required.".to_string());
    }
    if req.work_mode.is_none() {
        errors.push("Work mode is required.".to_string());
    }

    if req.salary_min.map_or(false, |v| v < 0) || req.salary_max.map_or(false, |v| v < 0) {
        errors.push("Salary cannot be negative.".to_string());
    }
    if let (Some(min), Some(max)) = (req.salary_min, req.salary_max) {
        if min > max {
            errors.push("Minimum salary cannot exceed maximum salary.".to_string());
        }
    }

    match (company_name, req.job_type, req.work_mode) {
        (Some(company_name), Some(job_type), Some(work_mode)) if errors.is_empty() => {
            Ok(CreateJobData {
                employer_id,
                title: trimmed(req.title).unwrap_or_default(),
                company_name,
                location: trimmed(req.location).unwrap_or_default(),
                job_type,
                work_mode,
                description: trimmed(req.description).unwrap_or_default(),
                requirements: req
                    .requirements
                    .unwrap_or_default()
                    .into_iter()
                    .map(|r| r.trim().to_string())
                    .filter(|r| !r.is_empty())
                    .collect(),
                salary_min: req.salary_min,
                salary_max: req.salary_max,
                salary_currency: trimmed(req.salary_currency)
                    .unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
                is_blind_mode: req.is_blind_mode.unwrap_or(false),
            })
        }
        _ => Err(errors),
    }
}

/// Posts a job; it stays hidden until a moderator approves it
async fn create_job(
    State(state): State<AppState>,
    auth: AuthUser,
    AppJson(body): AppJson<CreateJobRequest>,
) -> Result<ApiResponse<Job>> {
    let employer = auth.require_role(Role::Employer)?;

    let profile = CompanyProfile::find_by_user_id(&state.pool, employer.id).await?;
    let data = validate_new_job(
        body,
        employer.id,
        profile.as_ref().map(|p| p.company_name.as_str()),
    )
    .map_err(AppError::validation)?;

    let job = Job::create(&state.pool, data).await?;

    tracing::info!(job_id = %job.id, employer_id = %employer.id, "Job posted");

    Ok(ApiResponse::created("Job Posted Successfully", job))
}

/// Creates the jobs router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(search_jobs).post(create_job))
        .route("/:id", get(get_job))
}
