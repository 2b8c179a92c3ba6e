//! User repository for PostgreSQL.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use crate::models::User;

/// Outcome of inserting a user. A taken username or email is not an error.
#[derive(Debug, Clone)]
pub enum CreateUser {
    Created(User),
    Conflict,
}

/// Repository for user operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepo: Send + Sync {
    /// Find a user by username.
    async fn find_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Find a user whose username or email equals `identifier`.
    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<User>>;

    /// Insert a user with an already-hashed password.
    async fn create(&self, username: &str, email: &str, password_hash: &str)
    -> Result<CreateUser>;
}

/// PostgreSQL implementation of UserRepo.
#[derive(Clone)]
pub struct PgUserRepo {
    pool: Pool<Postgres>,
}

impl PgUserRepo {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepo for PgUserRepo {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<User>> {
        // Prefer the username match if one account's email equals another's username
        let user = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE username = $1 OR email = $1 \
             ORDER BY (username = $1) DESC LIMIT 1",
        )
        .bind(identifier)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn create(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<CreateUser> {
        let result = sqlx::query_as::<_, User>(
            "INSERT INTO users (username, email, password_hash) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(user) => Ok(CreateUser::Created(user)),
            Err(sqlx::Error::Database(err)) if err.is_unique_violation() => {
                Ok(CreateUser::Conflict)
            }
            Err(err) => Err(err.into()),
        }
    }
}
