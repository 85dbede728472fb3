use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use crate::models::user::Role;

pub const MIN_PASSWORD_LEN: usize = 6;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)+$")
        .expect("email regex compiles")
});

pub fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    email.len() <= 254 && EMAIL_RE.is_match(email)
}

pub fn password_error(password: &str) -> Option<String> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        Some(format!(
            "Password must be at least {} characters long.",
            MIN_PASSWORD_LEN
        ))
    } else {
        None
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub confirm_password: Option<String>,
    pub role: Option<String>,
}

impl RegisterRequest {
    pub fn is_empty(&self) -> bool {
        self.email.is_none()
            && self.password.is_none()
            && self.confirm_password.is_none()
            && self.role.is_none()
    }
}

/// Registration input that passed validation
#[derive(Debug, Clone)]
pub struct ValidRegistration {
    pub email: String,
    pub password: String,
    pub role: Role,
}

/// Validates a registration, collecting every problem rather than the first
pub fn validate_registration(req: &RegisterRequest) -> Result<ValidRegistration, Vec<String>> {
    let mut errors = Vec::new();

    match req.email.as_deref().map(str::trim) {
        None | Some("") => errors.push("Email is required.".to_string()),
        Some(email) if !is_valid_email(email) => {
            errors.push("Please provide a valid email address.".to_string())
        }
        Some(_) => {}
    }

    match req.password.as_deref() {
        None | Some("") => errors.push("Password is required.".to_string()),
        Some(password) => errors.extend(password_error(password)),
    }

    if req.confirm_password.is_none() || req.confirm_password != req.password {
        errors.push("Passwords do not match.".to_string());
    }

    // Admin accounts are never self-registered
    let role = match req.role.as_deref() {
        Some("JobSeeker") => Some(Role::JobSeeker),
        Some("Employer") => Some(Role::Employer),
        Some(_) => {
            errors.push("Role must be either JobSeeker or Employer.".to_string());
            None
        }
        None => {
            errors.push("Role is required.".to_string());
            None
        }
    };

    match (errors.is_empty(), role) {
        (true, Some(role)) => Ok(ValidRegistration {
            email: req.email.clone().unwrap_or_default().trim().to_lowercase(),
            password: req.password.clone().unwrap_or_default(),
            role,
        }),
        _ => Err(errors),
    }
}

/// Parses a role accepted for self-service sign-up (Google federation)
pub fn parse_signup_role(role: &str) -> Option<Role> {
    match role {
        "JobSeeker" => Some(Role::JobSeeker),
        "Employer" => Some(Role::Employer),
        _ => None,
    }
}

/// Pushes "<field> is required." for blank values
pub fn require_text(errors: &mut Vec<String>, field: &str, value: Option<&str>) {
    if value.map(str::trim).unwrap_or("").is_empty() {
        errors.push(format!("{} is required.", field));
    }
}
