//! Health check endpoint for load balancers and monitoring.
//!
//! Returns 200 OK if the database is reachable, 503 Service Unavailable otherwise.

use axum::{Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::get};
use serde::Serialize;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(health_check))
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    database: bool,
}

async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let database = state.repos.status.ping().await.is_ok();

    let (status, label) = if database {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "unhealthy")
    };

    (
        status,
        Json(HealthResponse {
            status: label,
            database,
        }),
    )
}
