//! Bearer token authentication.
//!
//! Usage: Add `AuthUser` as an extractor parameter to require authentication.
//! The user's id is the `sub` claim of the token issued at login.
//!
//! ```ignore
//! async fn my_handler(user: AuthUser, ...) -> ... {
//!     // user.id is available here
//! }
//! ```

use axum::{
    Json, RequestPartsExt,
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use shared::api::ErrorResponse;

use crate::state::AppState;

/// Authenticated user extracted from a valid bearer token.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub id: i64,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|_| AuthError::MissingToken)?;

        let id = state.tokens.verify(bearer.token()).map_err(|err| {
            tracing::debug!(error = %err, "rejected bearer token");
            AuthError::InvalidToken
        })?;

        Ok(AuthUser { id })
    }
}

#[derive(Debug)]
pub enum AuthError {
    MissingToken,
    InvalidToken,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let message = match self {
            AuthError::MissingToken => "missing authorization token",
            AuthError::InvalidToken => "invalid or expired token",
        };

        (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse {
                error: message.to_string(),
            }),
        )
            .into_response()
    }
}
