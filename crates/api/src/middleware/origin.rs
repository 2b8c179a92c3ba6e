//! Scheme and host of the current request, for building absolute URLs.

use std::convert::Infallible;

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};

use crate::state::AppState;

/// `scheme://host` without a trailing slash.
///
/// The configured `public_url` wins. Otherwise the `Host` header is used with
/// `http`, or with `X-Forwarded-Proto` when forwarded headers are trusted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestOrigin(pub String);

impl FromRequestParts<AppState> for RequestOrigin {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(public) = state
            .config
            .public_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
        {
            return Ok(RequestOrigin(public.trim_end_matches('/').to_string()));
        }

        let forwarded_proto = state
            .config
            .trust_forwarded_for
            .then(|| {
                parts
                    .headers
                    .get("x-forwarded-proto")
                    .and_then(|value| value.to_str().ok())
                    .and_then(|value| value.split(',').next())
                    .map(str::trim)
            })
            .flatten()
            .filter(|proto| matches!(*proto, "http" | "https"));

        let scheme = forwarded_proto.unwrap_or("http");

        let host = parts
            .headers
            .get(header::HOST)
            .and_then(|value| value.to_str().ok())
            .or_else(|| parts.uri.authority().map(|authority| authority.as_str()))
            .unwrap_or("localhost");

        Ok(RequestOrigin(format!("{scheme}://{host}")))
    }
}
