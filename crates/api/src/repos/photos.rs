//! Photo metadata repository for PostgreSQL.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use crate::models::Photo;

/// Repository for photo metadata.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PhotoRepo: Send + Sync {
    /// Record a stored photo. Returns the row with its assigned id and timestamp.
    async fn insert(&self, user_id: i64, url: &str, note: Option<String>) -> Result<Photo>;

    /// All photos for an owner, newest first.
    async fn list_by_user(&self, user_id: i64) -> Result<Vec<Photo>>;
}

/// PostgreSQL implementation of PhotoRepo.
#[derive(Clone)]
pub struct PgPhotoRepo {
    pool: Pool<Postgres>,
}

impl PgPhotoRepo {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PhotoRepo for PgPhotoRepo {
    async fn insert(&self, user_id: i64, url: &str, note: Option<String>) -> Result<Photo> {
        let photo = sqlx::query_as::<_, Photo>(
            "INSERT INTO photos (user_id, url, note) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(user_id)
        .bind(url)
        .bind(note)
        .fetch_one(&self.pool)
        .await?;
        Ok(photo)
    }

    async fn list_by_user(&self, user_id: i64) -> Result<Vec<Photo>> {
        let photos = sqlx::query_as::<_, Photo>(
            "SELECT * FROM photos WHERE user_id = $1 ORDER BY created_at DESC, id DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(photos)
    }
}
