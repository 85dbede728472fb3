// Models module - Database entity representations

pub mod application;
pub mod audit_log;
pub mod job;
pub mod pagination;
pub mod profile;
pub mod refresh_token;
pub mod saved_job;
pub mod user;

pub use application::Application;
pub use audit_log::AuditLog;
pub use job::Job;
pub use profile::{CompanyProfile, JobSeekerProfile};
pub use refresh_token::RefreshToken;
pub use saved_job::SavedJob;
pub use user::User;
