// Background jobs

pub mod email_dispatch;
pub mod token_cleanup;
