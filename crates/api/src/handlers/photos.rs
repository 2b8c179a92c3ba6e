//! Photo upload and listing for the authenticated user.
//!
//! - `POST /photos` multipart form: `photo` (file, required), `note` (text, optional)
//! - `GET /photos` newest first
//!
//! Stored references are made absolute against the request origin before they
//! are returned, whether they were stored relative or absolute.

use axum::{
    Json, Router, debug_handler,
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    routing::post,
};
use shared::api::PhotoResponse;

use crate::{
    error::AppError,
    middleware::{auth::AuthUser, origin::RequestOrigin, payload::AppMultipart},
    models::Photo,
    photos::{self, PhotoIngest, Upload},
    state::AppState,
};

pub fn router(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/", post(upload_photo).get(list_photos))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
}

fn photo_response(origin: &str, photo: Photo) -> PhotoResponse {
    PhotoResponse {
        id: photo.id,
        url: photos::resolve_url(origin, &photo.url),
        note: photo.note,
        created_at: photo.created_at,
    }
}

#[debug_handler]
async fn upload_photo(
    user: AuthUser,
    RequestOrigin(origin): RequestOrigin,
    State(state): State<AppState>,
    AppMultipart(mut multipart): AppMultipart,
) -> Result<(StatusCode, Json<PhotoResponse>), AppError> {
    let mut upload = None;
    let mut note = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::rejected(e.status(), e.body_text()))?
    {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("photo") => {
                let filename = field.file_name().unwrap_or("photo").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::rejected(e.status(), e.body_text()))?;
                upload = Some(Upload {
                    filename,
                    bytes: bytes.to_vec(),
                });
            }
            Some("note") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::rejected(e.status(), e.body_text()))?;
                note = Some(text);
            }
            _ => {}
        }
    }

    let upload = upload
        .filter(|upload| !upload.bytes.is_empty())
        .ok_or_else(|| AppError::Validation("photo file is required".to_string()))?;

    let photo = PhotoIngest::from_state(&state)
        .ingest(user.id, upload, note)
        .await?;

    Ok((StatusCode::CREATED, Json(photo_response(&origin, photo))))
}

#[debug_handler]
async fn list_photos(
    user: AuthUser,
    RequestOrigin(origin): RequestOrigin,
    State(state): State<AppState>,
) -> Result<Json<Vec<PhotoResponse>>, AppError> {
    let photos = state.repos.photos.list_by_user(user.id).await?;

    Ok(Json(
        photos
            .into_iter()
            .map(|photo| photo_response(&origin, photo))
            .collect(),
    ))
}
