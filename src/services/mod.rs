// Services module - Business logic

pub mod auth;
pub mod mailer;
pub mod oauth;
pub mod password;
pub mod tokens;
pub mod validation;
pub mod verification;
