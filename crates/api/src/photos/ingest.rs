use std::sync::Arc;

use anyhow::Result;

use super::{PhotoStorage, StoredFile, exif};
use crate::{
    models::Photo,
    repos::PhotoRepo,
    services::{EmbedRequest, EmbeddingClient, ReverseGeocoder},
    state::AppState,
};

/// An uploaded file as received from the client.
pub struct Upload {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Runs the upload pipeline for a single photo.
#[derive(Clone)]
pub struct PhotoIngest {
    storage: Arc<dyn PhotoStorage>,
    photos: Arc<dyn PhotoRepo>,
    geocoder: Arc<dyn ReverseGeocoder>,
    embedder: Arc<dyn EmbeddingClient>,
}

impl PhotoIngest {
    pub fn new(
        storage: Arc<dyn PhotoStorage>,
        photos: Arc<dyn PhotoRepo>,
        geocoder: Arc<dyn ReverseGeocoder>,
        embedder: Arc<dyn EmbeddingClient>,
    ) -> Self {
        Self {
            storage,
            photos,
            geocoder,
            embedder,
        }
    }

    pub fn from_state(state: &AppState) -> Self {
        Self::new(
            state.photo_storage.clone(),
            state.repos.photos.clone(),
            state.geocoder.clone(),
            state.embedder.clone(),
        )
    }

    /// Store the upload and record it for `owner`.
    ///
    /// Returns once the metadata row exists. The embedding notification is sent
    /// from a detached task afterwards and may arrive after later requests from the
    /// same user are served; its failure is only logged.
    pub async fn ingest(&self, owner: i64, upload: Upload, note: Option<String>) -> Result<Photo> {
        let note = note.filter(|n| !n.trim().is_empty());

        let stored = self
            .storage
            .save(owner, &upload.filename, &upload.bytes)
            .await?;

        let city = self.place_for(&upload.bytes).await;

        let photo = match self
            .photos
            .insert(owner, &stored.reference, note.clone())
            .await
        {
            Ok(photo) => photo,
            Err(err) => {
                if let Err(cleanup) = self.storage.remove(&stored).await {
                    tracing::warn!(
                        path = %stored.path.display(),
                        error = %cleanup,
                        "failed to remove orphaned upload"
                    );
                }
                return Err(err);
            }
        };

        tracing::info!(user_id = owner, photo_id = photo.id, "photo uploaded");

        self.notify_index(&photo, &stored, note.unwrap_or_default(), city);

        Ok(photo)
    }

    /// Place name for the photo's GPS position, empty when unknown.
    async fn place_for(&self, bytes: &[u8]) -> String {
        let Some((lat, lon)) = exif::gps_coordinates(bytes) else {
            return String::new();
        };

        match self.geocoder.place_name(lat, lon).await {
            Ok(place) => place.unwrap_or_default(),
            Err(err) => {
                tracing::warn!(lat, lon, error = %err, "reverse geocoding failed");
                String::new()
            }
        }
    }

    fn notify_index(&self, photo: &Photo, stored: &StoredFile, note: String, city: String) {
        let image_path = std::path::absolute(&stored.path)
            .unwrap_or_else(|_| stored.path.clone())
            .to_string_lossy()
            .into_owned();

        let request = EmbedRequest {
            image_path,
            note,
            city,
            id: photo.id,
        };

        let embedder = self.embedder.clone();
        tokio::spawn(async move {
            if let Err(err) = embedder.embed(&request).await {
                tracing::warn!(photo_id = request.id, error = %err, "embedding notification failed");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::time::Duration;

    use tokio::sync::mpsc;

    use super::*;
    use crate::photos::MockPhotoStorage;
    use crate::photos::exif::fixtures::tiff_with_gps;
    use crate::repos::MockPhotoRepo;
    use crate::services::{MockEmbeddingClient, MockReverseGeocoder};
    use crate::test_utils::mock_photo;

    fn stored_file() -> StoredFile {
        StoredFile {
            reference: "uploads/1/2026/10/42_beach.jpg".into(),
            path: PathBuf::from("/srv/memora/uploads/1/2026/10/42_beach.jpg"),
        }
    }

    fn storage_saving() -> MockPhotoStorage {
        let mut storage = MockPhotoStorage::new();
        storage
            .expect_save()
            .withf(|owner, filename, bytes| {
                *owner == 1 && filename == "beach.jpg" && !bytes.is_empty()
            })
            .returning(|_, _, _| Ok(stored_file()));
        storage
    }

    fn recording_embedder() -> (MockEmbeddingClient, mpsc::UnboundedReceiver<EmbedRequest>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut embedder = MockEmbeddingClient::new();
        embedder.expect_embed().returning(move |request| {
            tx.send(request.clone()).unwrap();
            Ok(())
        });
        (embedder, rx)
    }

    async fn next_request(rx: &mut mpsc::UnboundedReceiver<EmbedRequest>) -> EmbedRequest {
        tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("embed was not called")
            .unwrap()
    }

    #[tokio::test]
    async fn geotagged_upload_is_stored_geocoded_and_indexed() {
        let mut photos = MockPhotoRepo::new();
        photos
            .expect_insert()
            .withf(|owner, url, note| {
                *owner == 1
                    && url == "uploads/1/2026/10/42_beach.jpg"
                    && note.as_deref() == Some("sunset")
            })
            .returning(|owner, url, note| Ok(mock_photo(9, owner, url, note)));

        let mut geocoder = MockReverseGeocoder::new();
        geocoder
            .expect_place_name()
            .withf(|lat, lon| (lat - 38.7223).abs() < 1e-4 && (lon + 9.1393).abs() < 1e-4)
            .times(1)
            .returning(|_, _| Ok(Some("Lisbon".into())));

        let (embedder, mut rx) = recording_embedder();

        let ingest = PhotoIngest::new(
            Arc::new(storage_saving()),
            Arc::new(photos),
            Arc::new(geocoder),
            Arc::new(embedder),
        );

        let upload = Upload {
            filename: "beach.jpg".into(),
            bytes: tiff_with_gps(38.7223, -9.1393),
        };
        let photo = ingest
            .ingest(1, upload, Some("sunset".into()))
            .await
            .unwrap();

        assert_eq!(photo.id, 9);
        assert_eq!(photo.url, "uploads/1/2026/10/42_beach.jpg");

        let request = next_request(&mut rx).await;
        assert_eq!(
            request,
            EmbedRequest {
                image_path: "/srv/memora/uploads/1/2026/10/42_beach.jpg".into(),
                note: "sunset".into(),
                city: "Lisbon".into(),
                id: 9,
            }
        );
    }

    #[tokio::test]
    async fn upload_without_location_skips_geocoder() {
        let mut photos = MockPhotoRepo::new();
        photos
            .expect_insert()
            .withf(|_, _, note| note.is_none())
            .returning(|owner, url, note| Ok(mock_photo(3, owner, url, note)));

        let mut geocoder = MockReverseGeocoder::new();
        geocoder.expect_place_name().never();

        let (embedder, mut rx) = recording_embedder();

        let ingest = PhotoIngest::new(
            Arc::new(storage_saving()),
            Arc::new(photos),
            Arc::new(geocoder),
            Arc::new(embedder),
        );

        let upload = Upload {
            filename: "beach.jpg".into(),
            bytes: b"plain jpeg without exif".to_vec(),
        };
        ingest.ingest(1, upload, Some("   ".into())).await.unwrap();

        let request = next_request(&mut rx).await;
        assert_eq!(request.city, "");
        assert_eq!(request.note, "");
    }

    #[tokio::test]
    async fn geocoder_failure_does_not_fail_upload() {
        let mut photos = MockPhotoRepo::new();
        photos
            .expect_insert()
            .returning(|owner, url, note| Ok(mock_photo(4, owner, url, note)));

        let mut geocoder = MockReverseGeocoder::new();
        geocoder
            .expect_place_name()
            .returning(|_, _| Err(anyhow::anyhow!("nominatim unavailable")));

        let (embedder, mut rx) = recording_embedder();

        let ingest = PhotoIngest::new(
            Arc::new(storage_saving()),
            Arc::new(photos),
            Arc::new(geocoder),
            Arc::new(embedder),
        );

        let upload = Upload {
            filename: "beach.jpg".into(),
            bytes: tiff_with_gps(51.5, -0.12),
        };
        let photo = ingest.ingest(1, upload, None).await.unwrap();

        assert_eq!(photo.id, 4);
        assert_eq!(next_request(&mut rx).await.city, "");
    }

    #[tokio::test]
    async fn embedding_failure_does_not_fail_upload() {
        let mut photos = MockPhotoRepo::new();
        photos
            .expect_insert()
            .returning(|owner, url, note| Ok(mock_photo(5, owner, url, note)));

        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut embedder = MockEmbeddingClient::new();
        embedder.expect_embed().returning(move |_| {
            tx.send(()).unwrap();
            Err(anyhow::anyhow!("embedding service down"))
        });

        let ingest = PhotoIngest::new(
            Arc::new(storage_saving()),
            Arc::new(photos),
            Arc::new(MockReverseGeocoder::new()),
            Arc::new(embedder),
        );

        let upload = Upload {
            filename: "beach.jpg".into(),
            bytes: b"x".to_vec(),
        };
        let photo = ingest.ingest(1, upload, None).await.unwrap();

        assert_eq!(photo.id, 5);
        tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn storage_failure_aborts_before_insert() {
        let mut storage = MockPhotoStorage::new();
        storage
            .expect_save()
            .returning(|_, _, _| Err(anyhow::anyhow!("disk full")));
        storage.expect_remove().never();

        let mut photos = MockPhotoRepo::new();
        photos.expect_insert().never();

        let mut embedder = MockEmbeddingClient::new();
        embedder.expect_embed().never();

        let ingest = PhotoIngest::new(
            Arc::new(storage),
            Arc::new(photos),
            Arc::new(MockReverseGeocoder::new()),
            Arc::new(embedder),
        );

        let upload = Upload {
            filename: "beach.jpg".into(),
            bytes: b"x".to_vec(),
        };
        let err = ingest.ingest(1, upload, None).await.unwrap_err();

        assert!(err.to_string().contains("disk full"));
    }

    #[tokio::test]
    async fn insert_failure_removes_stored_file() {
        let mut storage = storage_saving();
        storage
            .expect_remove()
            .withf(|file| *file == stored_file())
            .times(1)
            .returning(|_| Ok(()));

        let mut photos = MockPhotoRepo::new();
        photos
            .expect_insert()
            .returning(|_, _, _| Err(anyhow::anyhow!("connection reset")));

        let mut embedder = MockEmbeddingClient::new();
        embedder.expect_embed().never();

        let ingest = PhotoIngest::new(
            Arc::new(storage),
            Arc::new(photos),
            Arc::new(MockReverseGeocoder::new()),
            Arc::new(embedder),
        );

        let upload = Upload {
            filename: "beach.jpg".into(),
            bytes: b"x".to_vec(),
        };

        assert!(ingest.ingest(1, upload, None).await.is_err());
    }
}
