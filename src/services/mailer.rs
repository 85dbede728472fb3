use html_escape::{encode_double_quoted_attribute, encode_text};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use crate::config::Config;

/// Upper bound on a single mail API call
pub const MAIL_API_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(thiserror::Error, Debug)]
pub enum MailError {
    #[error("Mail API request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Mail API rejected message ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("Invalid link base URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// Outgoing mail transport
#[derive(Debug, Clone)]
pub enum Mailer {
    /// JSON POST to a transactional mail API with bearer auth
    Http {
        client: reqwest::Client,
        endpoint: String,
        api_key: Option<Secret<String>>,
        from: String,
        timeout: Duration,
    },
    /// Writes messages to the log instead of delivering them
    Log { from: String },
}

#[derive(Serialize)]
struct MailApiPayload<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    html: &'a str,
}

impl Mailer {
    pub fn from_config(config: &Config) -> Self {
        match &config.mail_api_url {
            Some(endpoint) => Mailer::Http {
                client: reqwest::Client::new(),
                endpoint: endpoint.clone(),
                api_key: config.mail_api_key.clone(),
                from: config.mail_from.clone(),
                timeout: MAIL_API_TIMEOUT,
            },
            None => {
                tracing::warn!("MAIL_API_URL not set; outgoing email will only be logged");
                Mailer::Log {
                    from: config.mail_from.clone(),
                }
            }
        }
    }

    pub fn transport_name(&self) -> &'static str {
        match self {
            Mailer::Http { .. } => "http",
            Mailer::Log { .. } => "log",
        }
    }

    pub async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        match self {
            Mailer::Http {
                client,
                endpoint,
                api_key,
                from,
                timeout,
            } => {
                let mut request = client
                    .post(endpoint)
                    .timeout(*timeout)
                    .json(&MailApiPayload {
                        from,
                        to: &message.to,
                        subject: &message.subject,
                        html: &message.html,
                    });

                if let Some(key) = api_key {
                    request = request.bearer_auth(key.expose_secret());
                }

                let response = request.send().await?;

                if !response.status().is_success() {
                    let status = response.status().as_u16();
                    let body = response.text().await.unwrap_or_default();
                    return Err(MailError::Rejected { status, body });
                }

                tracing::info!(to = %message.to, subject = %message.subject, "Email sent");
                Ok(())
            }
            Mailer::Log { from } => {
                tracing::info!(
                    from = %from,
                    to = %message.to,
                    subject = %message.subject,
                    body = %message.html,
                    "Email (log transport)"
                );
                Ok(())
            }
        }
    }
}

/// Appends `path` to the path of `base` and adds one query parameter
pub fn build_link(base: &str, path: &str, key: &str, value: &str) -> Result<String, MailError> {
    let mut url = Url::parse(base)?;
    url.path_segments_mut()
        .map_err(|_| MailError::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
        .pop_if_empty()
        .extend(path.split('/').filter(|segment| !segment.is_empty()));
    url.query_pairs_mut().append_pair(key, value);
    Ok(url.to_string())
}

pub fn verification_email(to: &str, link: &str) -> EmailMessage {
    EmailMessage {
        to: to.to_string(),
        subject: "Verify your Resumeefy account".to_string(),
        html: format!(
            "<h2>Welcome to Resumeefy!</h2>\
             <p>Please verify your email by clicking the link below:</p>\
             <p><a href=\"{link}\">Verify Email</a></p>\
             <p>This link expires in 24 hours.</p>",
            link = encode_double_quoted_attribute(link)
        ),
    }
}

pub fn password_reset_email(to: &str, link: &str) -> EmailMessage {
    EmailMessage {
        to: to.to_string(),
        subject: "Reset your Resumeefy password".to_string(),
        html: format!(
            "<h2>Password reset requested</h2>\
             <p>Click the link below to choose a new password. It expires in one hour.</p>\
             <p><a href=\"{link}\">Reset Password</a></p>\
             <p>If you did not ask for this, you can ignore this email.</p>",
            link = encode_double_quoted_attribute(link)
        ),
    }
}

pub fn application_status_email(
    to: &str,
    job_title: &str,
    company_name: &str,
    status: &str,
    rejection_reason: Option<&str>,
) -> EmailMessage {
    let reason = rejection_reason
        .map(|r| format!("<p>Reason: {}</p>", encode_text(r)))
        .unwrap_or_default();

    EmailMessage {
        to: to.to_string(),
        subject: format!("Update on your application: {}", job_title),
        html: format!(
            "<h2>Your application was updated</h2>\
             <p>Your application for <strong>{title}</strong> at {company} is now: \
             <strong>{status}</strong>.</p>{reason}",
            title = encode_text(job_title),
            company = encode_text(company_name),
            status = encode_text(status),
        ),
    }
}

pub fn job_moderation_email(
    to: &str,
    job_title: &str,
    approved: bool,
    reason: Option<&str>,
) -> EmailMessage {
    let (subject, verdict) = if approved {
        ("Your job posting is live", "approved and is now visible to job seekers")
    } else {
        ("Your job posting was not approved", "rejected by a moderator")
    };
    let reason = reason
        .map(|r| format!("<p>Moderator note: {}</p>", encode_text(r)))
        .unwrap_or_default();

    EmailMessage {
        to: to.to_string(),
        subject: subject.to_string(),
        html: format!(
            "<p>Your posting <strong>{title}</strong> was {verdict}.</p>{reason}",
            title = encode_text(job_title),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn message() -> EmailMessage {
        EmailMessage {
            to: "ada@example.com".to_string(),
            subject: "Hello".to_string(),
            html: "<p>Hi</p>".to_string(),
        }
    }

    fn http_mailer(endpoint: String) -> Mailer {
        Mailer::Http {
            client: reqwest::Client::new(),
            endpoint,
            api_key: Some(Secret::new("mail-key".to_string())),
            from: "Resumeefy <no-reply@resumeefy.com>".to_string(),
            timeout: MAIL_API_TIMEOUT,
        }
    }

    #[tokio::test]
    async fn test_http_mailer_posts_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/send"))
            .and(header("authorization", "Bearer mail-key"))
            .and(body_json(json!({
                "from": "Resumeefy <no-reply@resumeefy.com>",
                "to": "ada@example.com",
                "subject": "Hello",
                "html": "<p>Hi</p>"
            })))
            .respond_with(ResponseTemplate::new(202))
            .expect(1)
            .mount(&server)
            .await;

        let mailer = http_mailer(format!("{}/send", server.uri()));
        mailer.send(&message()).await.unwrap();
    }

    #[tokio::test]
    async fn test_http_mailer_reports_rejection() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(422).set_body_string("bad recipient"))
            .mount(&server)
            .await;

        let mailer = http_mailer(format!("{}/send", server.uri()));
        let err = mailer.send(&message()).await.unwrap_err();

        assert!(matches!(err, MailError::Rejected { status: 422, .. }));
    }

    #[tokio::test]
    async fn test_http_mailer_gives_up_on_slow_api() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(202).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;

        let mailer = Mailer::Http {
            client: reqwest::Client::new(),
            endpoint: format!("{}/send", server.uri()),
            api_key: None,
            from: "noreply@example.com".to_string(),
            timeout: Duration::from_millis(100),
        };
        let err = mailer.send(&message()).await.unwrap_err();

        assert!(matches!(err, MailError::Http(ref e) if e.is_timeout()));
    }

    #[tokio::test]
    async fn test_log_mailer_always_succeeds() {
        let mailer = Mailer::Log {
            from: "noreply@example.com".to_string(),
        };
        assert!(mailer.send(&message()).await.is_ok());
        assert_eq!(mailer.transport_name(), "log");
    }

    #[test]
    fn test_build_link() {
        let link = build_link(
            "http://localhost:5000",
            "/api/auth/verify-email",
            "code",
            "abc-_123",
        )
        .unwrap();
        assert_eq!(link, "http://localhost:5000/api/auth/verify-email?code=abc-_123");

        assert!(build_link("not a url", "/x", "k", "v").is_err());
        assert!(build_link("mailto:ops@example.com", "/x", "k", "v").is_err());
    }

    #[test]
    fn test_build_link_keeps_base_path() {
        let expected = "https://host.example/app/reset-password?token=t0k";

        for base in ["https://host.example/app", "https://host.example/app/"] {
            let link = build_link(base, "/reset-password", "token", "t0k").unwrap();
            assert_eq!(link, expected);
        }
    }

    #[test]
    fn test_templates_escape_user_values() {
        let email = application_status_email(
            "ada@example.com",
            "<script>alert(1)</script>",
            "Acme & Co",
            "Rejected",
            Some("Position Filled"),
        );

        assert!(!email.html.contains("<script>"));
        assert!(email.html.contains("&lt;script&gt;"));
        assert!(email.html.contains("Acme &amp; Co"));
        assert!(email.html.contains("Reason: Position Filled"));
    }
}
