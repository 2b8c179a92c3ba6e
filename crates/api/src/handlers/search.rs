//! `GET /search?q=&k=`: similarity search over indexed photos.
//!
//! Proxied to the embedding service. Its status code and JSON body are returned
//! unchanged.

use axum::{
    Router, debug_handler,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use shared::api::SearchQuery;

use crate::{error::AppError, middleware::payload::AppQuery, state::AppState};

const DEFAULT_K: u32 = 50;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(search))
}

#[debug_handler]
async fn search(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<SearchQuery>,
) -> Result<Response, AppError> {
    let k = query.k.unwrap_or(DEFAULT_K);

    let results = state.embedder.search(&query.q, k).await?;

    let status = StatusCode::from_u16(results.status).unwrap_or(StatusCode::BAD_GATEWAY);

    Ok((
        status,
        [(header::CONTENT_TYPE, "application/json")],
        results.body,
    )
        .into_response())
}
