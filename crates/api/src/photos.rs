//! Photo ingestion.
//!
//! An upload is written to storage, its EXIF location (if any) is reverse geocoded,
//! the metadata row is inserted and the embedding service is notified in the
//! background. Only storage and the insert can fail an upload.
//!
//! ## Usage in Handlers
//!
//! ```ignore
//! let photo = PhotoIngest::from_state(&state)
//!     .ingest(user.id, Upload { filename, bytes }, note)
//!     .await?;
//! let url = photos::resolve_url(&origin, &photo.url);
//! ```

mod exif;
mod ingest;
mod storage;

pub use ingest::{PhotoIngest, Upload};
pub use storage::{LocalPhotoStorage, PhotoStorage, StoredFile};

#[cfg(test)]
pub use storage::MockPhotoStorage;

/// Turn a stored reference into an absolute URL. Absolute references pass through;
/// relative ones are joined onto `origin` (scheme + host, no trailing path).
pub fn resolve_url(origin: &str, reference: &str) -> String {
    if reference.starts_with("http://") || reference.starts_with("https://") {
        return reference.to_string();
    }

    format!(
        "{}/{}",
        origin.trim_end_matches('/'),
        reference.trim_start_matches('/')
    )
}
