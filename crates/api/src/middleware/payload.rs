//! Body and query extractors whose rejections use the API's JSON error shape.
//!
//! axum's own `Json`, `Query` and `Multipart` reject with plain text and a mix of
//! 400/415/422. These wrappers turn every decoding failure into a 400
//! `{"error": ...}`, except oversized bodies, which stay 413.

use axum::{
    Json,
    extract::{FromRequest, FromRequestParts, Multipart, Query, Request},
    http::request::Parts,
};
use serde::de::DeserializeOwned;

use crate::error::AppError;

/// JSON request body.
pub struct AppJson<T>(pub T);

impl<T, S> FromRequest<S> for AppJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::rejected(rejection.status(), rejection.body_text()))?;

        Ok(AppJson(value))
    }
}

/// Query string.
pub struct AppQuery<T>(pub T);

impl<T, S> FromRequestParts<S> for AppQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| AppError::rejected(rejection.status(), rejection.body_text()))?;

        Ok(AppQuery(value))
    }
}

/// `multipart/form-data` body. Errors while reading fields are mapped by the
/// handler with [`AppError::rejected`].
pub struct AppMultipart(pub Multipart);

impl<S> FromRequest<S> for AppMultipart
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let multipart = Multipart::from_request(req, state)
            .await
            .map_err(|rejection| AppError::rejected(rejection.status(), rejection.body_text()))?;

        Ok(AppMultipart(multipart))
    }
}
