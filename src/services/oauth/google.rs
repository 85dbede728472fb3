use oauth2::reqwest::async_http_client;
use oauth2::{
    basic::BasicClient, AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken,
    PkceCodeChallenge, PkceCodeVerifier, RedirectUrl, Scope,
    TokenResponse as OAuth2TokenResponse, TokenUrl,
};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(thiserror::Error, Debug)]
pub enum GoogleAuthError {
    #[error("OAuth URL construction failed: {0}")]
    UrlConstruction(String),

    #[error("Invalid redirect URI: {0}")]
    InvalidRedirectUri(String),

    #[error("Token exchange failed: {0}")]
    TokenExchange(String),

    #[error("Google request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid Google ID token")]
    InvalidIdToken,

    #[error("ID token was issued for another client")]
    AudienceMismatch,

    #[error("ID token issuer is not Google")]
    IssuerMismatch,

    #[error("Google account email is not verified")]
    EmailNotVerified,
}

pub const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_ISSUERS: [&str; 2] = ["accounts.google.com", "https://accounts.google.com"];
const GOOGLE_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Scopes for sign-in: identity and email only
pub const SIGN_IN_SCOPES: [&str; 3] = ["openid", "email", "profile"];

/// The identity Google vouches for, from either sign-in path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoogleIdentity {
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub picture: Option<String>,
}

/// tokeninfo returns every claim as a string; userinfo returns real booleans
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FlexBool {
    Bool(bool),
    Text(String),
}

impl FlexBool {
    fn is_true(&self) -> bool {
        match self {
            FlexBool::Bool(b) => *b,
            FlexBool::Text(s) => s.eq_ignore_ascii_case("true"),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenInfo {
    aud: String,
    iss: String,
    email: Option<String>,
    email_verified: Option<FlexBool>,
    given_name: Option<String>,
    family_name: Option<String>,
    picture: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    email: Option<String>,
    email_verified: Option<FlexBool>,
    given_name: Option<String>,
    family_name: Option<String>,
    picture: Option<String>,
}

fn into_identity(
    email: Option<String>,
    email_verified: Option<FlexBool>,
    given_name: Option<String>,
    family_name: Option<String>,
    picture: Option<String>,
) -> Result<GoogleIdentity, GoogleAuthError> {
    let email = email
        .filter(|e| !e.trim().is_empty())
        .ok_or(GoogleAuthError::InvalidIdToken)?;

    if !email_verified.map(|v| v.is_true()).unwrap_or(false) {
        return Err(GoogleAuthError::EmailNotVerified);
    }

    Ok(GoogleIdentity {
        email,
        first_name: given_name,
        last_name: family_name,
        picture,
    })
}

/// Verifies a client-supplied Google ID token against the tokeninfo endpoint
pub async fn verify_id_token(
    tokeninfo_url: &str,
    id_token: &str,
    client_id: &str,
) -> Result<GoogleIdentity, GoogleAuthError> {
    let client = reqwest::Client::new();
    let response = client
        .get(tokeninfo_url)
        .timeout(GOOGLE_REQUEST_TIMEOUT)
        .query(&[("id_token", id_token)])
        .header("Accept", "application/json")
        .send()
        .await?;

    if !response.status().is_success() {
        tracing::warn!(status = %response.status(), "Google rejected ID token");
        return Err(GoogleAuthError::InvalidIdToken);
    }

    let info: TokenInfo = response
        .json()
        .await
        .map_err(|_| GoogleAuthError::InvalidIdToken)?;

    if info.aud != client_id {
        return Err(GoogleAuthError::AudienceMismatch);
    }

    if !GOOGLE_ISSUERS.contains(&info.iss.as_str()) {
        return Err(GoogleAuthError::IssuerMismatch);
    }

    into_identity(
        info.email,
        info.email_verified,
        info.given_name,
        info.family_name,
        info.picture,
    )
}

/// Builds the Google OAuth client
fn build_oauth_client(
    client_id: &str,
    client_secret: &Secret<String>,
    redirect_uri: &str,
) -> Result<BasicClient, GoogleAuthError> {
    let redirect_url = RedirectUrl::new(redirect_uri.to_string())
        .map_err(|e| GoogleAuthError::InvalidRedirectUri(e.to_string()))?;

    let client = BasicClient::new(
        ClientId::new(client_id.to_string()),
        Some(ClientSecret::new(client_secret.expose_secret().clone())),
        AuthUrl::new(GOOGLE_AUTH_URL.to_string())
            .map_err(|e| GoogleAuthError::UrlConstruction(e.to_string()))?,
        Some(
            TokenUrl::new(GOOGLE_TOKEN_URL.to_string())
                .map_err(|e| GoogleAuthError::UrlConstruction(e.to_string()))?,
        ),
    )
    .set_redirect_uri(redirect_url);

    Ok(client)
}

/// Generates the Google sign-in URL
/// Returns (auth_url, csrf_token, pkce_verifier)
pub fn build_auth_url(
    client_id: &str,
    client_secret: &Secret<String>,
    redirect_uri: &str,
) -> Result<(String, String, String), GoogleAuthError> {
    let client = build_oauth_client(client_id, client_secret, redirect_uri)?;

    let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

    let (auth_url, csrf_token) = client
        .authorize_url(CsrfToken::new_random)
        .add_scopes(SIGN_IN_SCOPES.iter().map(|s| Scope::new(s.to_string())))
        .set_pkce_challenge(pkce_challenge)
        .url();

    Ok((
        auth_url.to_string(),
        csrf_token.secret().clone(),
        pkce_verifier.secret().clone(),
    ))
}

/// Exchanges an authorization code for an access token
pub async fn exchange_code(
    code: &str,
    client_id: &str,
    client_secret: &Secret<String>,
    redirect_uri: &str,
    pkce_verifier: Option<&str>,
) -> Result<String, GoogleAuthError> {
    let client = build_oauth_client(client_id, client_secret, redirect_uri)?;

    let mut token_request = client.exchange_code(AuthorizationCode::new(code.to_string()));

    if let Some(verifier) = pkce_verifier {
        token_request =
            token_request.set_pkce_verifier(PkceCodeVerifier::new(verifier.to_string()));
    }

    let exchange = token_request.request_async(async_http_client);
    let token_response = tokio::time::timeout(GOOGLE_REQUEST_TIMEOUT, exchange)
        .await
        .map_err(|_| GoogleAuthError::TokenExchange("request timed out".to_string()))?
        .map_err(|e| GoogleAuthError::TokenExchange(e.to_string()))?;

    Ok(token_response.access_token().secret().clone())
}

/// Reads the signed-in account from the OpenID userinfo endpoint
pub async fn fetch_user_info(
    userinfo_url: &str,
    access_token: &str,
) -> Result<GoogleIdentity, GoogleAuthError> {
    let client = reqwest::Client::new();
    let response = client
        .get(userinfo_url)
        .timeout(GOOGLE_REQUEST_TIMEOUT)
        .bearer_auth(access_token)
        .send()
        .await?
        .error_for_status()?;

    let info: UserInfo = response.json().await?;

    into_identity(
        info.email,
        info.email_verified,
        info.given_name,
        info.family_name,
        info.picture,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const CLIENT_ID: &str = "test-client.apps.googleusercontent.com";

    fn tokeninfo_body(aud: &str, verified: &str) -> serde_json::Value {
        json!({
            "iss": "https://accounts.google.com",
            "aud": aud,
            "sub": "1234567890",
            "email": "ada@example.com",
            "email_verified": verified,
            "given_name": "Ada",
            "family_name": "Lovelace",
            "exp": "1999999999"
        })
    }

    #[test]
    fn test_build_auth_url() {
        let client_secret = Secret::new("test-secret".to_string());
        let redirect_uri = "http://localhost:5000/api/auth/google/callback";

        let (auth_url, csrf_token, pkce_verifier) =
            build_auth_url(CLIENT_ID, &client_secret, redirect_uri).unwrap();

        assert!(auth_url.starts_with(GOOGLE_AUTH_URL));
        assert!(auth_url.contains("code_challenge="));
        assert!(auth_url.contains("openid"));
        assert!(!csrf_token.is_empty());
        assert!(!pkce_verifier.is_empty());
    }

    #[test]
    fn test_invalid_redirect_uri() {
        let client_secret = Secret::new("test-secret".to_string());
        let result = build_auth_url(CLIENT_ID, &client_secret, "not a valid uri!!!");

        assert!(matches!(result, Err(GoogleAuthError::InvalidRedirectUri(_))));
    }

    #[tokio::test]
    async fn test_verify_id_token_accepts_valid_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/tokeninfo"))
            .and(query_param("id_token", "good-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(tokeninfo_body(CLIENT_ID, "true")))
            .mount(&server)
            .await;

        let identity = verify_id_token(&format!("{}/tokeninfo", server.uri()), "good-token", CLIENT_ID)
            .await
            .unwrap();

        assert_eq!(identity.email, "ada@example.com");
        assert_eq!(identity.first_name.as_deref(), Some("Ada"));
        assert_eq!(identity.last_name.as_deref(), Some("Lovelace"));
    }

    #[tokio::test]
    async fn test_verify_id_token_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/tokeninfo"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(tokeninfo_body(CLIENT_ID, "true"))
                    .set_delay(GOOGLE_REQUEST_TIMEOUT + Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let result =
            verify_id_token(&format!("{}/tokeninfo", server.uri()), "token", CLIENT_ID).await;

        assert!(matches!(result, Err(GoogleAuthError::Http(ref e)) if e.is_timeout()));
    }

    #[tokio::test]
    async fn test_verify_id_token_checks_audience() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/tokeninfo"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(tokeninfo_body("someone-else", "true")),
            )
            .mount(&server)
            .await;

        let result =
            verify_id_token(&format!("{}/tokeninfo", server.uri()), "token", CLIENT_ID).await;

        assert!(matches!(result, Err(GoogleAuthError::AudienceMismatch)));
    }

    #[tokio::test]
    async fn test_verify_id_token_requires_verified_email() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/tokeninfo"))
            .respond_with(ResponseTemplate::new(200).set_body_json(tokeninfo_body(CLIENT_ID, "false")))
            .mount(&server)
            .await;

        let result =
            verify_id_token(&format!("{}/tokeninfo", server.uri()), "token", CLIENT_ID).await;

        assert!(matches!(result, Err(GoogleAuthError::EmailNotVerified)));
    }

    #[tokio::test]
    async fn test_verify_id_token_rejected_by_google() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/tokeninfo"))
            .respond_with(
                ResponseTemplate::new(400).set_body_json(json!({"error": "invalid_token"})),
            )
            .mount(&server)
            .await;

        let result =
            verify_id_token(&format!("{}/tokeninfo", server.uri()), "expired", CLIENT_ID).await;

        assert!(matches!(result, Err(GoogleAuthError::InvalidIdToken)));
    }

    #[tokio::test]
    async fn test_fetch_user_info() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/userinfo"))
            .and(header("authorization", "Bearer access-123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "sub": "42",
                "email": "grace@example.com",
                "email_verified": true,
                "given_name": "Grace"
            })))
            .mount(&server)
            .await;

        let identity = fetch_user_info(&format!("{}/userinfo", server.uri()), "access-123")
            .await
            .unwrap();

        assert_eq!(identity.email, "grace@example.com");
        assert_eq!(identity.last_name, None);
    }
}
