//! Password accounts.
//!
//! - `POST /signup` creates an account from username, email and password.
//! - `POST /login` exchanges an identifier (username or email) and password for a
//!   bearer token.
//!
//! Both are rate limited per client. Login failures never reveal whether the
//! identifier exists.

use axum::{Json, Router, debug_handler, extract::State, http::StatusCode, routing::post};
use garde::Validate;
use shared::api::{LoginPayload, MessageResponse, SignupPayload, TokenResponse};

use crate::{
    error::AppError,
    middleware::{payload::AppJson, rate_limit::RateLimited},
    services::CredentialError,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
}

#[debug_handler]
async fn signup(
    _: RateLimited,
    State(state): State<AppState>,
    AppJson(payload): AppJson<SignupPayload>,
) -> Result<(StatusCode, Json<MessageResponse>), AppError> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let user = state
        .credentials
        .create_account(&payload.username, &payload.email, &payload.password)
        .await
        .map_err(|err| match err {
            CredentialError::Conflict => {
                AppError::External(StatusCode::CONFLICT, "username or email already in use")
            }
            other => AppError::Internal(other.into()),
        })?;

    tracing::info!(user_id = user.id, username = %user.username, "account created");

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: "user created".to_string(),
        }),
    ))
}

#[debug_handler]
async fn login(
    _: RateLimited,
    State(state): State<AppState>,
    AppJson(payload): AppJson<LoginPayload>,
) -> Result<Json<TokenResponse>, AppError> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let user = state
        .credentials
        .authenticate(&payload.identifier, &payload.password)
        .await
        .map_err(|err| match err {
            CredentialError::InvalidCredentials => AppError::unauthorized("invalid credentials"),
            other => AppError::Internal(other.into()),
        })?;

    let token = state.tokens.issue(user.id)?;

    tracing::info!(user_id = user.id, "login");

    Ok(Json(TokenResponse { token }))
}
