//! Email second factor.
//!
//! Flow:
//! 1. `POST /2fa/setup` with a username emails a 6-digit code to the account's address
//! 2. `POST /2fa/verify` with username and code returns a bearer token
//!
//! Codes expire after `otp_ttl_secs`, are single use, and a new setup request
//! replaces any pending code. Both endpoints are rate limited per client.

use axum::{Json, Router, debug_handler, extract::State, http::StatusCode, routing::post};
use garde::Validate;
use shared::api::{MessageResponse, SetupTwoFactorPayload, TokenResponse, VerifyTwoFactorPayload};

use crate::{
    error::AppError,
    middleware::{payload::AppJson, rate_limit::RateLimited},
    services::OtpError,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/setup", post(setup))
        .route("/verify", post(verify))
}

#[debug_handler]
async fn setup(
    _: RateLimited,
    State(state): State<AppState>,
    AppJson(payload): AppJson<SetupTwoFactorPayload>,
) -> Result<Json<MessageResponse>, AppError> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let user = state
        .repos
        .users
        .find_by_username(&payload.username)
        .await?
        .ok_or(AppError::External(StatusCode::NOT_FOUND, "user not found"))?;

    state.otp.issue_code(&user.username, &user.email).await?;

    tracing::info!(user_id = user.id, "second factor code sent");

    Ok(Json(MessageResponse {
        message: "OTP sent".to_string(),
    }))
}

#[debug_handler]
async fn verify(
    _: RateLimited,
    State(state): State<AppState>,
    AppJson(payload): AppJson<VerifyTwoFactorPayload>,
) -> Result<Json<TokenResponse>, AppError> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    state
        .otp
        .verify_code(&payload.username, &payload.code)
        .map_err(|err| match err {
            OtpError::InvalidOrExpired => AppError::unauthorized("invalid or expired code"),
            other => AppError::Internal(other.into()),
        })?;

    // The account may have been removed since the code was issued
    let user = state
        .repos
        .users
        .find_by_username(&payload.username)
        .await?
        .ok_or(AppError::unauthorized("invalid or expired code"))?;

    let token = state.tokens.issue(user.id)?;

    tracing::info!(user_id = user.id, "second factor verified");

    Ok(Json(TokenResponse { token }))
}
