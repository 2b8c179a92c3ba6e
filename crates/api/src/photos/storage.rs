//! Durable storage for uploaded photo bytes.

use std::path::PathBuf;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{Datelike, Utc};

/// URL prefix the storage root is served under.
const PUBLIC_PREFIX: &str = "uploads";

const MAX_FILENAME_LEN: usize = 100;

#[derive(Debug, Clone, PartialEq)]
pub struct StoredFile {
    /// Reference recorded in the database, relative to the service root.
    pub reference: String,
    /// Location on disk.
    pub path: PathBuf,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PhotoStorage: Send + Sync {
    /// Persist bytes under a path namespaced by owner and upload time.
    async fn save(&self, owner: i64, filename: &str, bytes: &[u8]) -> Result<StoredFile>;

    /// Delete a previously stored file.
    async fn remove(&self, file: &StoredFile) -> Result<()>;
}

/// Stores photos on the local filesystem under `root/{owner}/{YYYY}/{MM}/`.
pub struct LocalPhotoStorage {
    root: PathBuf,
}

impl LocalPhotoStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl PhotoStorage for LocalPhotoStorage {
    async fn save(&self, owner: i64, filename: &str, bytes: &[u8]) -> Result<StoredFile> {
        let now = Utc::now();
        let dir = format!("{owner}/{:04}/{:02}", now.year(), now.month());
        let name = format!(
            "{}_{}",
            now.timestamp_nanos_opt().unwrap_or_default(),
            sanitize_filename(filename)
        );

        let target_dir = self.root.join(&dir);
        tokio::fs::create_dir_all(&target_dir).await?;

        let path = target_dir.join(&name);
        tokio::fs::write(&path, bytes).await?;

        Ok(StoredFile {
            reference: format!("{PUBLIC_PREFIX}/{dir}/{name}"),
            path,
        })
    }

    async fn remove(&self, file: &StoredFile) -> Result<()> {
        tokio::fs::remove_file(&file.path).await?;
        Ok(())
    }
}

/// Reduce a client-supplied filename to a safe single path component.
fn sanitize_filename(filename: &str) -> String {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or_default();

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .take(MAX_FILENAME_LEN)
        .collect();

    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "photo".to_string()
    } else {
        cleaned.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn save_writes_bytes_under_owner_and_month() {
        let dir = TempDir::new().unwrap();
        let storage = LocalPhotoStorage::new(dir.path());

        let stored = storage.save(7, "beach.jpg", b"jpeg-bytes").await.unwrap();

        let now = Utc::now();
        let prefix = format!("uploads/7/{:04}/{:02}/", now.year(), now.month());
        assert!(stored.reference.starts_with(&prefix), "{}", stored.reference);
        assert!(stored.reference.ends_with("_beach.jpg"));
        assert!(stored.path.starts_with(dir.path()));
        assert_eq!(tokio::fs::read(&stored.path).await.unwrap(), b"jpeg-bytes");
    }

    #[tokio::test]
    async fn same_filename_twice_gets_distinct_paths() {
        let dir = TempDir::new().unwrap();
        let storage = LocalPhotoStorage::new(dir.path());

        let first = storage.save(1, "a.png", b"1").await.unwrap();
        let second = storage.save(1, "a.png", b"2").await.unwrap();

        assert_ne!(first.path, second.path);
    }

    #[tokio::test]
    async fn remove_deletes_the_file() {
        let dir = TempDir::new().unwrap();
        let storage = LocalPhotoStorage::new(dir.path());
        let stored = storage.save(1, "a.png", b"x").await.unwrap();

        storage.remove(&stored).await.unwrap();

        assert!(!stored.path.exists());
    }

    #[test]
    fn sanitize_strips_directories_and_odd_characters() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("C:\\Users\\me\\IMG 0001.JPG"), "IMG_0001.JPG");
        assert_eq!(sanitize_filename("summer (1).heic"), "summer__1_.heic");
    }

    #[test]
    fn sanitize_never_returns_empty_or_hidden_names() {
        assert_eq!(sanitize_filename(""), "photo");
        assert_eq!(sanitize_filename("dir/"), "photo");
        assert_eq!(sanitize_filename(".htaccess"), "htaccess");
        assert_eq!(sanitize_filename(".."), "photo");
    }

    #[test]
    fn sanitize_caps_length() {
        let long = "a".repeat(500) + ".jpg";
        assert_eq!(sanitize_filename(&long).len(), MAX_FILENAME_LEN);
    }
}
