// API module - HTTP endpoints

pub mod admin;
pub mod applications;
pub mod auth;
pub mod employer;
pub mod health;
pub mod jobs;
pub mod jobseeker;
pub mod middleware;

use axum::{
    extract::{DefaultBodyLimit, FromRequest, FromRequestParts},
    http::{header, HeaderName, HeaderValue, Method, StatusCode},
    middleware::from_fn_with_state,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tower_http::{cors::CorsLayer, set_header::SetResponseHeaderLayer, trace::TraceLayer};

use crate::config::Config;
use crate::error::AppError;
use crate::models::pagination::Pagination;
use middleware::session::AppState;

/// Request bodies are small JSON documents
pub const BODY_LIMIT_BYTES: usize = 10 * 1024;

/// `axum::Json` whose rejection renders through `AppError`
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

/// Path parameters rejected through `AppError`
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct AppPath<T>(pub T);

/// Query string rejected through `AppError`
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct AppQuery<T>(pub T);

/// Response envelope shared by every endpoint
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    #[serde(skip)]
    status: StatusCode,
    pub succeeded: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            status: StatusCode::OK,
            succeeded: true,
            message: message.into(),
            data: Some(data),
            pagination: None,
        }
    }

    pub fn created(message: impl Into<String>, data: T) -> Self {
        Self {
            status: StatusCode::CREATED,
            ..Self::ok(message, data)
        }
    }

    pub fn with_pagination(mut self, pagination: Pagination) -> Self {
        self.pagination = Some(pagination);
        self
    }
}

impl ApiResponse<()> {
    /// Success with a message and no payload
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::OK,
            succeeded: true,
            message: message.into(),
            data: None,
            pagination: None,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

/// Hardening headers sent with every response unless a handler set them
fn security_headers() -> [(HeaderName, HeaderValue); 7] {
    [
        (header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff")),
        (header::X_FRAME_OPTIONS, HeaderValue::from_static("SAMEORIGIN")),
        (header::REFERRER_POLICY, HeaderValue::from_static("no-referrer")),
        (
            header::STRICT_TRANSPORT_SECURITY,
            HeaderValue::from_static("max-age=15552000; includeSubDomains"),
        ),
        (header::X_DNS_PREFETCH_CONTROL, HeaderValue::from_static("off")),
        (
            header::CONTENT_SECURITY_POLICY,
            HeaderValue::from_static("default-src 'self'; frame-ancestors 'self'; object-src 'none'"),
        ),
        (
            HeaderName::from_static("cross-origin-opener-policy"),
            HeaderValue::from_static("same-origin"),
        ),
    ]
}

fn with_security_headers(router: Router) -> Router {
    security_headers()
        .into_iter()
        .fold(router, |router, (name, value)| {
            router.layer(SetResponseHeaderLayer::if_not_present(name, value))
        })
}

/// Allows the web client origin, with credentials for the refresh cookie
fn cors_layer(config: &Config) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    match HeaderValue::from_str(config.frontend_base().trim_end_matches('/')) {
        Ok(origin) => layer.allow_origin(origin).allow_credentials(true),
        Err(_) => {
            tracing::warn!("Frontend URL is not a valid origin; CORS disabled");
            layer
        }
    }
}

async fn root() -> ApiResponse<()> {
    ApiResponse::message("Resumeefy API is running")
}

/// Builds the application router
pub fn router(state: AppState) -> Router {
    let cors = cors_layer(&state.config);

    let api = Router::new()
        .nest("/auth", auth::router())
        .nest("/jobs", jobs::router())
        .nest("/applications", applications::router())
        .nest("/jobseeker", jobseeker::router())
        .nest("/employer", employer::router())
        .nest("/admin", admin::router())
        .layer(from_fn_with_state(
            state.clone(),
            middleware::rate_limit::rate_limit,
        ));

    let app = Router::new()
        .route("/", get(root))
        .route("/health", get(health::health_check))
        .nest("/api", api)
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .layer(cors)
        .with_state(state);

    with_security_headers(app).layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_envelope_omits_absent_fields() {
        let response = ApiResponse::message("done").into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(body, serde_json::json!({ "succeeded": true, "message": "done" }));
    }

    #[tokio::test]
    async fn test_created_carries_data_and_pagination() {
        let response = ApiResponse::created("made", vec![1, 2])
            .with_pagination(Pagination {
                total: 2,
                total_pages: 1,
                current_page: 1,
                limit: 10,
            })
            .into_response();
        assert_eq!(response.status(), StatusCode::CREATED);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(body["data"], serde_json::json!([1, 2]));
        assert_eq!(body["pagination"]["totalPages"], 1);
    }
}
