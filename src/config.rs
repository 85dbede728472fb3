use secrecy::Secret;
use serde::Deserialize;

pub const DEFAULT_GOOGLE_TOKENINFO_URL: &str = "https://oauth2.googleapis.com/tokeninfo";
pub const DEFAULT_GOOGLE_USERINFO_URL: &str = "https://openidconnect.googleapis.com/v1/userinfo";
pub const DEFAULT_MAIL_FROM: &str = "Resumeefy <no-reply@resumeefy.com>";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub base_url: String,
    pub host: String,
    pub port: u16,
    /// Marks cookies Secure when true
    pub production: bool,

    // Tokens
    pub jwt_secret: Secret<String>,
    pub access_token_ttl_minutes: i64,
    pub refresh_token_ttl_days: i64,

    // Google sign-in
    pub google_client_id: String,
    pub google_client_secret: Option<Secret<String>>,
    pub google_tokeninfo_url: String,
    pub google_userinfo_url: String,

    // Outgoing mail (HTTP mail API). Unset means messages are only logged.
    pub mail_api_url: Option<String>,
    pub mail_api_key: Option<Secret<String>>,
    pub mail_from: String,

    /// Where password reset links point; falls back to base_url
    pub frontend_url: Option<String>,

    // First SuperAdmin, created at start-up when missing
    pub bootstrap_admin_email: Option<String>,
    pub bootstrap_admin_password: Option<Secret<String>>,

    // Per-IP request budget on /api
    pub rate_limit_max_requests: u32,
    pub rate_limit_window_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, config::ConfigError> {
        // Load .env file if it exists (for local development)
        let _ = dotenvy::dotenv();

        let config = config::Config::builder()
            .add_source(config::Environment::default().separator("__"))
            .build()?;

        Ok(Self {
            database_url: config.get("database_url")?,
            base_url: config.get("base_url")?,
            host: config.get("host").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: config.get("port")?,
            production: config.get("production").unwrap_or(false),

            jwt_secret: Secret::new(config.get("jwt_secret")?),
            access_token_ttl_minutes: config.get("access_token_ttl_minutes").unwrap_or(15),
            refresh_token_ttl_days: config.get("refresh_token_ttl_days").unwrap_or(7),

            google_client_id: config.get("google_client_id")?,
            google_client_secret: config
                .get::<String>("google_client_secret")
                .ok()
                .map(Secret::new),
            google_tokeninfo_url: config
                .get("google_tokeninfo_url")
                .unwrap_or_else(|_| DEFAULT_GOOGLE_TOKENINFO_URL.to_string()),
            google_userinfo_url: config
                .get("google_userinfo_url")
                .unwrap_or_else(|_| DEFAULT_GOOGLE_USERINFO_URL.to_string()),

            mail_api_url: config.get("mail_api_url").ok(),
            mail_api_key: config.get::<String>("mail_api_key").ok().map(Secret::new),
            mail_from: config
                .get("mail_from")
                .unwrap_or_else(|_| DEFAULT_MAIL_FROM.to_string()),

            frontend_url: config.get("frontend_url").ok(),

            bootstrap_admin_email: config.get("bootstrap_admin_email").ok(),
            bootstrap_admin_password: config
                .get::<String>("bootstrap_admin_password")
                .ok()
                .map(Secret::new),

            rate_limit_max_requests: config.get("rate_limit_max_requests").unwrap_or(100),
            rate_limit_window_secs: config.get("rate_limit_window_secs").unwrap_or(600),
        })
    }

    /// Base for links that land on the web client
    pub fn frontend_base(&self) -> &str {
        self.frontend_url.as_deref().unwrap_or(&self.base_url)
    }
}
