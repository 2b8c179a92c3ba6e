//! Shared API request/response types used by the API server and its clients.

use chrono::{DateTime, Utc};
use garde::Validate;
use serde::{Deserialize, Serialize};

/// Create a new account.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct SignupPayload {
    #[garde(length(min = 3, max = 32), pattern(r"^[A-Za-z0-9_.-]+$"))]
    pub username: String,
    #[garde(email)]
    pub email: String,
    /// bcrypt only looks at the first 72 bytes.
    #[garde(length(bytes, min = 8, max = 72))]
    pub password: String,
}

/// Log in with a username or email address.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct LoginPayload {
    /// Username or email address.
    #[serde(alias = "email", alias = "username")]
    #[garde(length(min = 1, max = 254))]
    pub identifier: String,
    #[garde(length(bytes, min = 1, max = 72))]
    pub password: String,
}

/// Bearer token returned after login or second-factor verification.
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

/// Generic acknowledgement.
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Request a one-time passcode by email.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct SetupTwoFactorPayload {
    #[garde(length(min = 1, max = 32))]
    pub username: String,
}

/// Submit the one-time passcode received by email.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct VerifyTwoFactorPayload {
    #[garde(length(min = 1, max = 32))]
    pub username: String,
    #[garde(length(min = 6, max = 6), pattern(r"^[0-9]+$"))]
    pub code: String,
}

/// A stored photo. `url` is always absolute.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhotoResponse {
    pub id: i64,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Ask for a media link to be analyzed.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct AnalyzePayload {
    #[garde(url, length(max = 2048))]
    pub url: String,
}

/// Verdict from the audio analysis pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResponse {
    pub probability: f64,
    pub label: String,
}

/// Query parameters for similarity search over uploaded photos.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
    /// Number of hits to return (default 50).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub k: Option<u32>,
}

/// Error body returned by every failing endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
