mod insights;
mod search;

use std::sync::Arc;

use axum::{
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

use pulse_core::PostStore;
use pulse_engine::{EngineError, InsightEngine};

use crate::middleware::request_id;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<InsightEngine>,
    pub store: Arc<dyn PostStore>,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
struct HealthData {
    status: &'static str,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            "embedding_failed" => StatusCode::BAD_GATEWAY,
            "store_unavailable" => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

/// Maps engine failures onto wire-level error codes. Nothing is swallowed:
/// an empty result set is a 200, every error becomes a JSON body.
pub(super) fn map_engine_error(request_id: String, error: &EngineError) -> ApiError {
    match error {
        EngineError::InvalidQuery(msg) => {
            ApiError::new(request_id, "validation_error", msg.clone())
        }
        EngineError::Embedding(e) => {
            tracing::error!(error = %e, "embedding provider failed");
            ApiError::new(request_id, "embedding_failed", "embedding provider failed")
        }
        EngineError::Store(e) => {
            tracing::error!(error = %e, "post store unavailable");
            ApiError::new(request_id, "store_unavailable", "post store unavailable")
        }
        EngineError::Validation { errors } => {
            tracing::error!(error_count = errors.len(), "batch validation failed");
            ApiError::new(request_id, "internal_error", "batch validation failed")
        }
    }
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static("x-request-id"),
        ])
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/search", post(search::search))
        .route("/api/insights", post(insights::insights))
        .layer(
            ServiceBuilder::new()
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(HealthData { status: "healthy" })
}
