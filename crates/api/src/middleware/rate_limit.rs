//! Per-client admission for unauthenticated, abuse-prone endpoints.
//!
//! Add `RateLimited` as the first extractor of a handler. Denied requests get
//! 429 before the body is read.

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::{StatusCode, request::Parts},
};

use crate::{error::AppError, state::AppState};

/// Marker extractor: the client had a token available.
#[derive(Debug)]
pub struct RateLimited;

impl FromRequestParts<AppState> for RateLimited {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let client = client_id(parts, state.config.trust_forwarded_for);

        if state.stores.rate_limiter.admit(&client) {
            Ok(RateLimited)
        } else {
            tracing::warn!(client = %client, path = %parts.uri.path(), "rate limited");
            Err(AppError::External(
                StatusCode::TOO_MANY_REQUESTS,
                "too many requests, slow down",
            ))
        }
    }
}

/// Client identifier used as the bucket key: the first `X-Forwarded-For` hop when
/// trusted, otherwise the peer IP.
pub fn client_id(parts: &Parts, trust_forwarded_for: bool) -> String {
    if trust_forwarded_for {
        let forwarded = parts
            .headers
            .get("x-forwarded-for")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(',').next())
            .map(str::trim)
            .filter(|value| !value.is_empty());

        if let Some(ip) = forwarded {
            return ip.to_string();
        }
    }

    parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
