use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "job_type", rename_all = "snake_case")]
pub enum JobType {
    #[serde(rename = "Full-Time")]
    FullTime,
    #[serde(rename = "Part-Time")]
    PartTime,
    Contract,
    Internship,
    Freelance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "work_mode", rename_all = "snake_case")]
pub enum WorkMode {
    #[serde(rename = "On-Site")]
    OnSite,
    Remote,
    Hybrid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "moderation_status", rename_all = "snake_case")]
pub enum ModerationStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: Uuid,
    pub employer_id: Uuid,
    pub title: String,
    pub company_name: String,
    pub location: String,
    pub job_type: JobType,
    pub work_mode: WorkMode,
    pub description: String,
    pub requirements: Vec<String>,
    pub salary_min: Option<i64>,
    pub salary_max: Option<i64>,
    pub salary_currency: String,
    pub is_active: bool,
    pub application_count: i32,
    pub is_blind_mode: bool,
    pub last_activity_at: DateTime<Utc>,
    pub moderation_status: ModerationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateJobData {
    pub employer_id: Uuid,
    pub title: String,
    pub company_name: String,
    pub location: String,
    pub job_type: JobType,
    pub work_mode: WorkMode,
    pub description: String,
    pub requirements: Vec<String>,
    pub salary_min: Option<i64>,
    pub salary_max: Option<i64>,
    pub salary_currency: String,
    pub is_blind_mode: bool,
}

/// Public listing filters
#[derive(Debug, Clone, Default)]
pub struct JobFilter {
    pub keyword: Option<String>,
    pub location: Option<String>,
    pub job_type: Option<JobType>,
    pub work_mode: Option<WorkMode>,
}

/// Escapes LIKE metacharacters and wraps the term for substring matching
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

impl JobFilter {
    fn push_conditions(&self, builder: &mut QueryBuilder<'_, Postgres>) {
        builder.push(" WHERE is_active = TRUE AND moderation_status = 'approved'");

        if let Some(keyword) = self.keyword.as_deref().filter(|k| !k.trim().is_empty()) {
            let pattern = like_pattern(keyword.trim());
            builder
                .push(" AND (title ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR description ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR company_name ILIKE ")
                .push_bind(pattern)
                .push(")");
        }

        if let Some(location) = self.location.as_deref().filter(|l| !l.trim().is_empty()) {
            builder
                .push(" AND location ILIKE ")
                .push_bind(like_pattern(location.trim()));
        }

        if let Some(job_type) = self.job_type {
            builder.push(" AND job_type = ").push_bind(job_type);
        }

        if let Some(work_mode) = self.work_mode {
            builder.push(" AND work_mode = ").push_bind(work_mode);
        }
    }
}

impl Job {
    /// Creates a job posting awaiting moderation
    pub async fn create(pool: &PgPool, data: CreateJobData) -> Result<Self, sqlx::Error> {
        let job = sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO jobs (
                employer_id, title, company_name, location, job_type, work_mode,
                description, requirements, salary_min, salary_max, salary_currency,
                is_blind_mode
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING *
            "#,
        )
        .bind(data.employer_id)
        .bind(&data.title)
        .bind(&data.company_name)
        .bind(&data.location)
        .bind(data.job_type)
        .bind(data.work_mode)
        .bind(&data.description)
        .bind(&data.requirements)
        .bind(data.salary_min)
        .bind(data.salary_max)
        .bind(&data.salary_currency)
        .bind(data.is_blind_mode)
        .fetch_one(pool)
        .await?;

        Ok(job)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let job = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM jobs WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(job)
    }

    /// Publicly visible jobs matching `filter`, newest first, with the total count
    pub async fn search(
        pool: &PgPool,
        filter: &JobFilter,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Self>, i64), sqlx::Error> {
        let mut query = QueryBuilder::<Postgres>::new("SELECT * FROM jobs");
        filter.push_conditions(&mut query);
        query
            .push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        let jobs = query.build_query_as::<Self>().fetch_all(pool).await?;

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM jobs");
        filter.push_conditions(&mut count);
        let total = count.build_query_scalar::<i64>().fetch_one(pool).await?;

        Ok((jobs, total))
    }

    pub async fn list_by_employer(
        pool: &PgPool,
        employer_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let jobs = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM jobs
            WHERE employer_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(employer_id)
        .fetch_all(pool)
        .await?;

        Ok(jobs)
    }

    /// Jobs waiting for a moderation decision, oldest first
    pub async fn list_pending_moderation(
        pool: &PgPool,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Self>, i64), sqlx::Error> {
        let jobs = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM jobs
            WHERE moderation_status = 'pending'
            ORDER BY created_at ASC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM jobs WHERE moderation_status = 'pending'",
        )
        .fetch_one(pool)
        .await?;

        Ok((jobs, total))
    }

    pub async fn set_moderation_status(
        pool: &PgPool,
        id: Uuid,
        status: ModerationStatus,
    ) -> Result<Option<Self>, sqlx::Error> {
        let job = sqlx::query_as::<_, Self>(
            r#"
            UPDATE jobs
            SET moderation_status = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(status)
        .fetch_optional(pool)
        .await?;

        Ok(job)
    }

    pub fn is_open_for_applications(&self) -> bool {
        self.is_active && self.moderation_status == ModerationStatus::Approved
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("rust"), "%rust%");
        assert_eq!(like_pattern("100%_off"), "%100\\%\\_off%");
    }

    #[test]
    fn test_job_type_wire_names() {
        assert_eq!(
            serde_json::to_string(&JobType::FullTime).unwrap(),
            "\"Full-Time\""
        );
        assert_eq!(
            serde_json::from_str::<WorkMode>("\"On-Site\"").unwrap(),
            WorkMode::OnSite
        );
    }

    #[test]
    fn test_search_sql_only_lists_approved_active_jobs() {
        let filter = JobFilter {
            keyword: Some("engineer".to_string()),
            location: Some("   ".to_string()),
            job_type: Some(JobType::Contract),
            work_mode: None,
        };

        let mut query = QueryBuilder::<Postgres>::new("SELECT * FROM jobs");
        filter.push_conditions(&mut query);
        let sql = query.sql();

        assert!(sql.contains("is_active = TRUE AND moderation_status = 'approved'"));
        assert!(sql.contains("title ILIKE $1"));
        assert!(sql.contains("job_type = $4"));
        assert!(!sql.contains("location ILIKE"));
    }
}
