use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "experience_level", rename_all = "snake_case")]
pub enum ExperienceLevel {
    Intern,
    Junior,
    MidLevel,
    Senior,
    Lead,
    Manager,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct JobSeekerProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub bio: Option<String>,
    pub headline: Option<String>,
    pub resume_url: Option<String>,
    pub portfolio_url: Option<String>,
    pub linkedin_url: Option<String>,
    pub github_url: Option<String>,
    pub experience_level: ExperienceLevel,
    pub skills: Vec<String>,
    pub work_experience: JsonValue, // JSONB array
    pub education: JsonValue,       // JSONB array
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Editable job seeker fields; `None` leaves the stored value untouched
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateJobSeekerProfile {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub bio: Option<String>,
    pub headline: Option<String>,
    pub resume_url: Option<String>,
    pub portfolio_url: Option<String>,
    pub linkedin_url: Option<String>,
    pub github_url: Option<String>,
    pub experience_level: Option<ExperienceLevel>,
    pub skills: Option<Vec<String>>,
    pub work_experience: Option<JsonValue>,
    pub education: Option<JsonValue>,
}

impl JobSeekerProfile {
    pub async fn create_default(
        pool: &PgPool,
        user_id: Uuid,
        first_name: &str,
        last_name: &str,
    ) -> Result<Self, sqlx::Error> {
        let profile = sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO job_seeker_profiles (user_id, first_name, last_name, experience_level)
            VALUES ($1, $2, $3, 'junior')
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(first_name)
        .bind(last_name)
        .fetch_one(pool)
        .await?;

        Ok(profile)
    }

    pub async fn find_by_user_id(
        pool: &PgPool,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let profile = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM job_seeker_profiles WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        Ok(profile)
    }

    /// Inserts or patches the profile of `user_id`
    pub async fn upsert(
        pool: &PgPool,
        user_id: Uuid,
        data: UpdateJobSeekerProfile,
    ) -> Result<Self, sqlx::Error> {
        let profile = sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO job_seeker_profiles (
                user_id, first_name, last_name, phone, city, country, bio, headline,
                resume_url, portfolio_url, linkedin_url, github_url, experience_level,
                skills, work_experience, education
            )
            VALUES (
                $1, COALESCE($2, 'New'), COALESCE($3, 'User'), $4, $5, $6, $7, $8,
                $9, $10, $11, $12, COALESCE($13, 'junior'::experience_level),
                COALESCE($14, '{}'), COALESCE($15, '[]'::jsonb), COALESCE($16, '[]'::jsonb)
            )
            ON CONFLICT (user_id) DO UPDATE SET
                first_name = COALESCE($2, job_seeker_profiles.first_name),
                last_name = COALESCE($3, job_seeker_profiles.last_name),
                phone = COALESCE($4, job_seeker_profiles.phone),
                city = COALESCE($5, job_seeker_profiles.city),
                country = COALESCE($6, job_seeker_profiles.country),
                bio = COALESCE($7, job_seeker_profiles.bio),
                headline = COALESCE($8, job_seeker_profiles.headline),
                resume_url = COALESCE($9, job_seeker_profiles.resume_url),
                portfolio_url = COALESCE($10, job_seeker_profiles.portfolio_url),
                linkedin_url = COALESCE($11, job_seeker_profiles.linkedin_url),
                github_url = COALESCE($12, job_seeker_profiles.github_url),
                experience_level = COALESCE($13, job_seeker_profiles.experience_level),
                skills = COALESCE($14, job_seeker_profiles.skills),
                work_experience = COALESCE($15, job_seeker_profiles.work_experience),
                education = COALESCE($16, job_seeker_profiles.education),
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(data.first_name)
        .bind(data.last_name)
        .bind(data.phone)
        .bind(data.city)
        .bind(data.country)
        .bind(data.bio)
        .bind(data.headline)
        .bind(data.resume_url)
        .bind(data.portfolio_url)
        .bind(data.linkedin_url)
        .bind(data.github_url)
        .bind(data.experience_level)
        .bind(data.skills)
        .bind(data.work_experience)
        .bind(data.education)
        .fetch_one(pool)
        .await?;

        Ok(profile)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CompanyProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub company_name: String,
    pub description: Option<String>,
    pub website_url: Option<String>,
    pub logo_url: Option<String>,
    pub industry: Option<String>,
    pub size: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCompanyProfile {
    pub company_name: Option<String>,
    pub description: Option<String>,
    pub website_url: Option<String>,
    pub logo_url: Option<String>,
    pub industry: Option<String>,
    pub size: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub address: Option<String>,
}

impl CompanyProfile {
    pub async fn create_default(
        pool: &PgPool,
        user_id: Uuid,
        company_name: &str,
    ) -> Result<Self, sqlx::Error> {
        let profile = sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO company_profiles (user_id, company_name)
            VALUES ($1, $2)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(company_name)
        .fetch_one(pool)
        .await?;

        Ok(profile)
    }

    pub async fn find_by_user_id(
        pool: &PgPool,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let profile = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM company_profiles WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        Ok(profile)
    }

    pub async fn upsert(
        pool: &PgPool,
        user_id: Uuid,
        data: UpdateCompanyProfile,
    ) -> Result<Self, sqlx::Error> {
        let profile = sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO company_profiles (
                user_id, company_name, description, website_url, logo_url,
                industry, size, city, country, address
            )
            VALUES ($1, COALESCE($2, 'New Company'), $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (user_id) DO UPDATE SET
                company_name = COALESCE($2, company_profiles.company_name),
                description = COALESCE($3, company_profiles.description),
                website_url = COALESCE($4, company_profiles.website_url),
                logo_url = COALESCE($5, company_profiles.logo_url),
                industry = COALESCE($6, company_profiles.industry),
                size = COALESCE($7, company_profiles.size),
                city = COALESCE($8, company_profiles.city),
                country = COALESCE($9, company_profiles.country),
                address = COALESCE($10, company_profiles.address),
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(data.company_name)
        .bind(data.description)
        .bind(data.website_url)
        .bind(data.logo_url)
        .bind(data.industry)
        .bind(data.size)
        .bind(data.city)
        .bind(data.country)
        .bind(data.address)
        .fetch_one(pool)
        .await?;

        Ok(profile)
    }
}
