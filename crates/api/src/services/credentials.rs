//! Account creation and password authentication.
//!
//! Passwords are hashed with bcrypt on the blocking pool. Unknown identifiers and
//! wrong passwords produce the same error, and both pay for one bcrypt verification,
//! so callers cannot tell which accounts exist.

use std::sync::Arc;

use anyhow::Result;

use crate::{
    models::User,
    repos::{CreateUser, UserRepo},
};

#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("username or email already in use")]
    Conflict,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// Hashes, stores and checks account passwords.
#[derive(Clone)]
pub struct Credentials {
    users: Arc<dyn UserRepo>,
    cost: u32,
    /// Verified against when the identifier is unknown.
    dummy_hash: Arc<str>,
}

impl Credentials {
    pub fn new(users: Arc<dyn UserRepo>, cost: u32) -> Result<Self> {
        let dummy_hash = bcrypt::hash("memora-placeholder-password", cost)?;

        Ok(Self {
            users,
            cost,
            dummy_hash: dummy_hash.into(),
        })
    }

    pub async fn create_account(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<User, CredentialError> {
        let hash = hash_password(password.to_owned(), self.cost).await?;

        match self.users.create(username, email, &hash).await? {
            CreateUser::Created(user) => Ok(user),
            CreateUser::Conflict => Err(CredentialError::Conflict),
        }
    }

    pub async fn authenticate(
        &self,
        identifier: &str,
        password: &str,
    ) -> Result<User, CredentialError> {
        let user = self.users.find_by_identifier(identifier).await?;

        let hash = match &user {
            Some(user) => user.password_hash.clone(),
            None => self.dummy_hash.to_string(),
        };

        let matches = verify_password(password.to_owned(), hash).await?;

        match user {
            Some(user) if matches => Ok(user),
            _ => Err(CredentialError::InvalidCredentials),
        }
    }
}

async fn hash_password(password: String, cost: u32) -> Result<String> {
    Ok(tokio::task::spawn_blocking(move || bcrypt::hash(password, cost)).await??)
}

async fn verify_password(password: String, hash: String) -> Result<bool> {
    // A malformed stored hash counts as a mismatch rather than a server error
    Ok(tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash).unwrap_or(false)).await?)
}
