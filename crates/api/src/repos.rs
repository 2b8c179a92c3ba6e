//! Database repositories (PostgreSQL).
//!
//! Each repository is abstracted behind a trait to enable mocking in tests.
//!
//! ## Repositories
//!
//! - **users** - Account lookup and creation
//! - **photos** - Photo metadata, listed newest first per owner
//! - **status** - Database health check
//!
//! ## Usage in Handlers
//!
//! Repositories are accessed via `state.repos`:
//!
//! ```ignore
//! async fn handler(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
//!     let user = state.repos.users.find_by_username("alice").await?;
//!     let photos = state.repos.photos.list_by_user(user_id).await?;
//! }
//! ```

mod photos;
mod status;
mod users;

pub use photos::{PgPhotoRepo, PhotoRepo};
pub use status::{PgStatusRepo, StatusRepo};
pub use users::{CreateUser, PgUserRepo, UserRepo};

#[cfg(test)]
pub use photos::MockPhotoRepo;
#[cfg(test)]
pub use status::MockStatusRepo;
#[cfg(test)]
pub use users::MockUserRepo;

use std::sync::Arc;

/// Collection of all database repositories.
#[derive(Clone)]
pub struct Repos {
    pub users: Arc<dyn UserRepo>,
    pub photos: Arc<dyn PhotoRepo>,
    pub status: Arc<dyn StatusRepo>,
}
