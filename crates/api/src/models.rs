use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Photo metadata. `url` is the stored reference: either a path relative to the
/// service root (e.g. `uploads/1/2026/10/...jpg`) or an already-absolute URL.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Photo {
    pub id: i64,
    pub user_id: i64,
    pub url: String,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}
