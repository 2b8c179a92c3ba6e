//! Database reachability check used by `/health`.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use sqlx::{Pool, Postgres};

/// How long a check may wait for a pooled connection and `SELECT 1`.
const PING_TIMEOUT: Duration = Duration::from_secs(2);

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StatusRepo: Send + Sync {
    /// Succeeds if the database answers a trivial query in time.
    async fn ping(&self) -> Result<()>;
}

#[derive(Clone)]
pub struct PgStatusRepo {
    pool: Pool<Postgres>,
}

impl PgStatusRepo {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StatusRepo for PgStatusRepo {
    async fn ping(&self) -> Result<()> {
        let query = sqlx::query_scalar::<_, i32>("SELECT 1").fetch_one(&self.pool);

        match tokio::time::timeout(PING_TIMEOUT, query).await {
            Ok(Ok(1)) => Ok(()),
            Ok(Ok(other)) => anyhow::bail!("unexpected result from SELECT 1: {other}"),
            Ok(Err(err)) => Err(err.into()),
            Err(_) => anyhow::bail!("database check timed out"),
        }
    }
}
