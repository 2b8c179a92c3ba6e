//! `POST /analyze`: run the audio analysis pipeline on a media URL.
//!
//! The pipeline is tied to this request. If the client disconnects, the handler
//! future is dropped, the cancellation token fires and the running tool is killed.

use axum::{Json, Router, debug_handler, extract::State, routing::post};
use garde::Validate;
use shared::api::{AnalysisResponse, AnalyzePayload};
use tokio_util::sync::CancellationToken;

use crate::{
    analysis::AnalysisError,
    error::AppError,
    middleware::{payload::AppJson, rate_limit::RateLimited},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/", post(analyze))
}

#[debug_handler]
async fn analyze(
    _: RateLimited,
    State(state): State<AppState>,
    AppJson(payload): AppJson<AnalyzePayload>,
) -> Result<Json<AnalysisResponse>, AppError> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let cancel = CancellationToken::new();
    let _cancel_on_drop = cancel.clone().drop_guard();

    let result = state
        .analyzer
        .analyze(&payload.url, cancel)
        .await
        .map_err(|err| match err {
            AnalysisError::InvalidUrl(message) => AppError::Validation(message),
            other => AppError::Internal(other.into()),
        })?;

    Ok(Json(AnalysisResponse {
        probability: result.probability,
        label: result.label,
    }))
}
