use std::sync::Arc;

use crate::{
    analysis::MediaAnalyzer,
    config::Config,
    photos::PhotoStorage,
    repos::Repos,
    services::{Credentials, EmbeddingClient, OtpManager, ReverseGeocoder, TokenService},
    stores::Stores,
};

#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// Database repositories.
    pub repos: Repos,
    /// In-process stores (rate limiter, pending passcodes).
    pub stores: Stores,
    /// Account creation and password checks.
    pub credentials: Credentials,
    /// Bearer token issue/verify.
    pub tokens: Arc<dyn TokenService>,
    /// Email second factor.
    pub otp: OtpManager,
    /// Uploaded photo bytes.
    pub photo_storage: Arc<dyn PhotoStorage>,
    pub geocoder: Arc<dyn ReverseGeocoder>,
    /// Photo indexing and similarity search.
    pub embedder: Arc<dyn EmbeddingClient>,
    /// Audio analysis pipeline.
    pub analyzer: Arc<dyn MediaAnalyzer>,
}
