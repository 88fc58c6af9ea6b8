use axum::{extract::State, Extension, Json};
use serde::{Deserialize, Serialize};

use pulse_core::SimilarityResult;

use crate::middleware::RequestId;

use super::{map_engine_error, ApiError, AppState, ResponseMeta};

fn default_top_k() -> usize {
    10
}

#[derive(Debug, Deserialize)]
pub(super) struct SearchRequest {
    pub query: String,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default)]
    pub engagement_threshold: f32,
    #[serde(default)]
    pub min_similarity: f32,
}

#[derive(Debug, Serialize)]
pub(super) struct SearchResponse {
    pub status: &'static str,
    pub results: Vec<SimilarityResult>,
    pub meta: ResponseMeta,
}

pub(super) async fn search(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(request): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, ApiError> {
    let results = state
        .engine
        .search(
            &request.query,
            request.top_k,
            request.engagement_threshold,
            request.min_similarity,
        )
        .await
        .map_err(|e| map_engine_error(req_id.0.clone(), &e))?;

    Ok(Json(SearchResponse {
        status: "success",
        results,
        meta: ResponseMeta::new(req_id.0),
    }))
}
