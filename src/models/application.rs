use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "application_status", rename_all = "snake_case")]
pub enum ApplicationStatus {
    Applied,
    #[serde(rename = "In Review")]
    InReview,
    Interview,
    Offered,
    Rejected,
    Hired,
}

impl ApplicationStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ApplicationStatus::Applied => "Applied",
            ApplicationStatus::InReview => "In Review",
            ApplicationStatus::Interview => "Interview",
            ApplicationStatus::Offered => "Offered",
            ApplicationStatus::Rejected => "Rejected",
            ApplicationStatus::Hired => "Hired",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "rejection_reason", rename_all = "snake_case")]
pub enum RejectionReason {
    #[serde(rename = "Skill Mismatch")]
    SkillMismatch,
    #[serde(rename = "Experience Gap")]
    ExperienceGap,
    #[serde(rename = "Position Filled")]
    PositionFilled,
    #[serde(rename = "Salary Expectations")]
    SalaryExpectations,
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub id: Uuid,
    pub job_id: Uuid,
    pub applicant_id: Uuid,
    pub resume_url: String,
    pub status: ApplicationStatus,
    pub rejection_reason: Option<RejectionReason>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An applicant's own application with the job it targets
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationHistoryEntry {
    pub id: Uuid,
    pub job_id: Uuid,
    pub status: ApplicationStatus,
    pub rejection_reason: Option<RejectionReason>,
    pub created_at: DateTime<Utc>,
    pub job_title: String,
    pub company_name: String,
    pub location: String,
    pub job_is_active: bool,
}

/// An application joined with the applicant's profile, as an employer sees it
#[derive(Debug, Clone, FromRow)]
pub struct ApplicantRow {
    pub application_id: Uuid,
    pub status: ApplicationStatus,
    pub applied_at: DateTime<Utc>,
    pub resume_url: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub headline: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub skills: Option<Vec<String>>,
    pub work_experience: Option<JsonValue>,
    pub education: Option<JsonValue>,
    pub linkedin_url: Option<String>,
    pub portfolio_url: Option<String>,
    pub github_url: Option<String>,
}

impl Application {
    /// Records an application and bumps the job's counters in one transaction
    pub async fn submit(
        pool: &PgPool,
        job_id: Uuid,
        applicant_id: Uuid,
        resume_url: &str,
    ) -> Result<Self, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let application = sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO applications (job_id, applicant_id, resume_url)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(job_id)
        .bind(applicant_id)
        .bind(resume_url)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE jobs
            SET application_count = application_count + 1, last_activity_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(job_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(application)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let application = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM applications WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(application)
    }

    pub async fn history_for_applicant(
        pool: &PgPool,
        applicant_id: Uuid,
    ) -> Result<Vec<ApplicationHistoryEntry>, sqlx::Error> {
        let entries = sqlx::query_as::<_, ApplicationHistoryEntry>(
            r#"
            SELECT
                a.id, a.job_id, a.status, a.rejection_reason, a.created_at,
                j.title AS job_title, j.company_name, j.location, j.is_active AS job_is_active
            FROM applications a
            JOIN jobs j ON j.id = a.job_id
            WHERE a.applicant_id = $1
            ORDER BY a.created_at DESC
            "#,
        )
        .bind(applicant_id)
        .fetch_all(pool)
        .await?;

        Ok(entries)
    }

    pub async fn applicants_for_job(
        pool: &PgPool,
        job_id: Uuid,
    ) -> Result<Vec<ApplicantRow>, sqlx::Error> {
        let rows = sqlx::query_as::<_, ApplicantRow>(
            r#"
            SELECT
                a.id AS application_id, a.status, a.created_at AS applied_at, a.resume_url,
                u.email,
                p.first_name, p.last_name, p.phone, p.headline, p.city, p.country,
                p.skills, p.work_experience, p.education,
                p.linkedin_url, p.portfolio_url, p.github_url
            FROM applications a
            JOIN users u ON u.id = a.applicant_id
            LEFT JOIN job_seeker_profiles p ON p.user_id = a.applicant_id
            WHERE a.job_id = $1
            ORDER BY a.created_at DESC
            "#,
        )
        .bind(job_id)
        .fetch_all(pool)
        .await?;

        Ok(rows)
    }

    pub async fn update_status(
        pool: &PgPool,
        id: Uuid,
        status: ApplicationStatus,
        rejection_reason: Option<RejectionReason>,
    ) -> Result<Self, sqlx::Error> {
        let application = sqlx::query_as::<_, Self>(
            r#"
            UPDATE applications
            SET status = $2, rejection_reason = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(rejection_reason)
        .fetch_one(pool)
        .await?;

        Ok(application)
    }

    /// Total applications across every job of an employer
    pub async fn count_for_employer(pool: &PgPool, employer_id: Uuid) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM applications a
            JOIN jobs j ON j.id = a.job_id
            WHERE j.employer_id = $1
            "#,
        )
        .bind(employer_id)
        .fetch_one(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_wire_names() {
        assert_eq!(
            serde_json::to_string(&ApplicationStatus::InReview).unwrap(),
            "\"In Review\""
        );
        assert_eq!(
            serde_json::from_str::<RejectionReason>("\"Position Filled\"").unwrap(),
            RejectionReason::PositionFilled
        );
        assert_eq!(ApplicationStatus::InReview.label(), "In Review");
    }
}
