use axum::{extract::State, Extension, Json};
use serde::{Deserialize, Serialize};

use pulse_core::InsightBundle;

use crate::middleware::RequestId;

use super::{map_engine_error, ApiError, AppState, ResponseMeta};

fn default_top_k() -> usize {
    10
}

fn default_similarity_threshold() -> f32 {
    0.25
}

#[derive(Debug, Deserialize)]
pub(super) struct InsightsRequest {
    pub query: String,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,
}

#[derive(Debug, Serialize)]
pub(super) struct InsightsResponse {
    pub status: &'static str,
    pub insights: InsightBundle,
    pub meta: ResponseMeta,
}

pub(super) async fn insights(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(request): Json<InsightsRequest>,
) -> Result<Json<InsightsResponse>, ApiError> {
    let bundle = state
        .engine
        .get_insights(&request.query, request.top_k, request.similarity_threshold)
        .await
        .map_err(|e| map_engine_error(req_id.0.clone(), &e))?;

    // Archiving is best-effort: a classification the caller already has must
    // not fail because the archive write did.
    if let Err(e) = state.store.archive_insights(&request.query, &bundle).await {
        tracing::warn!(error = %e, query = %request.query, "failed to archive insight bundle");
    }

    Ok(Json(InsightsResponse {
        status: "success",
        insights: bundle,
        meta: ResponseMeta::new(req_id.0),
    }))
}
