//! Shared test utilities for API handler tests.
//!
//! Provides common mock factories and a flexible `TestStateBuilder` for constructing
//! `AppState` instances with only the mocks needed for each test.
//!
//! ## Usage
//!
//! ```ignore
//! use crate::test_utils::{TestStateBuilder, mock_user};
//!
//! let mut user_repo = MockUserRepo::new();
//! user_repo.expect_find_by_username().returning(|_| Ok(Some(mock_user("alice"))));
//!
//! let state = TestStateBuilder::new()
//!     .with_user_repo(user_repo)
//!     .build();
//! ```
//!
//! Unset collaborators are empty mocks and panic if called. Tokens are real HS256
//! tokens signed with a fixed test secret unless a `MockTokenService` is supplied.

use std::sync::Arc;

use chrono::{Duration, Utc};

use crate::analysis::MockMediaAnalyzer;
use crate::config::Config;
use crate::models::{Photo, User};
use crate::photos::MockPhotoStorage;
use crate::repos::{MockPhotoRepo, MockStatusRepo, MockUserRepo, Repos};
use crate::services::{
    Credentials, JwtTokenService, MockEmailSender, MockEmbeddingClient, MockReverseGeocoder,
    MockTokenService, OtpManager, TokenService,
};
use crate::state::AppState;
use crate::stores::{MockOtpStore, MockRateLimiter, Stores};

/// bcrypt cost used by tests (the minimum bcrypt accepts).
pub const TEST_BCRYPT_COST: u32 = 4;

/// Creates a test configuration with dummy values.
pub fn test_config() -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 8000,
        database_url: "postgres://test".to_string(),
        public_url: None,
        smtp_url: None,
        resend_api_key: None,
        email_from: "Memora <test@memora.test>".to_string(),
        jwt_secret: "test-secret".to_string(),
        token_ttl_hours: 1,
        bcrypt_cost: TEST_BCRYPT_COST,
        otp_ttl_secs: 300,
        rate_limit_burst: 3,
        rate_limit_per_second: 1.0,
        trust_forwarded_for: false,
        upload_dir: "uploads".to_string(),
        max_upload_bytes: 1024 * 1024,
        geocoder_url: "http://geocoder.test".to_string(),
        embedding_service_url: "http://embedding.test".to_string(),
        extractor_cmd: "yt-dlp".to_string(),
        transcoder_cmd: "ffmpeg".to_string(),
        inference_cmd: "python3 microservice/main.py".to_string(),
        tool_timeout_secs: 30,
        max_audio_bytes: 10 * 1024 * 1024,
        scratch_dir: None,
        env: "test".to_string(),
        sentry_dsn: None,
    }
}

/// Creates a mock user with a fixed (unusable) password hash.
pub fn mock_user(username: &str) -> User {
    User {
        id: 1,
        username: username.to_string(),
        email: format!("{username}@example.com"),
        password_hash: "$2b$04$invalidinvalidinvalidinvalidinvalidinvalidinvalidinva".to_string(),
        created_at: Utc::now(),
    }
}

/// Creates a mock user whose stored hash matches `password`.
pub fn mock_user_with_password(username: &str, password: &str, cost: u32) -> User {
    User {
        password_hash: bcrypt::hash(password, cost).unwrap(),
        ..mock_user(username)
    }
}

/// Creates a mock photo row.
pub fn mock_photo(id: i64, user_id: i64, url: &str, note: Option<String>) -> Photo {
    Photo {
        id,
        user_id,
        url: url.to_string(),
        note,
        created_at: Utc::now(),
    }
}

/// Builder for constructing test `AppState` with custom mocks.
///
/// Uses default (empty) mocks for any repo/store/service not explicitly set.
/// This allows tests to only configure the mocks they actually need.
#[derive(Default)]
pub struct TestStateBuilder {
    config: Option<Config>,
    user_repo: Option<MockUserRepo>,
    photo_repo: Option<MockPhotoRepo>,
    status_repo: Option<MockStatusRepo>,
    rate_limiter: Option<MockRateLimiter>,
    otp_store: Option<MockOtpStore>,
    email_sender: Option<MockEmailSender>,
    token_service: Option<MockTokenService>,
    photo_storage: Option<MockPhotoStorage>,
    geocoder: Option<MockReverseGeocoder>,
    embedder: Option<MockEmbeddingClient>,
    analyzer: Option<MockMediaAnalyzer>,
}

impl TestStateBuilder {
    /// Creates a new builder with no mocks configured.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    pub fn with_user_repo(mut self, repo: MockUserRepo) -> Self {
        self.user_repo = Some(repo);
        self
    }

    pub fn with_photo_repo(mut self, repo: MockPhotoRepo) -> Self {
        self.photo_repo = Some(repo);
        self
    }

    pub fn with_status_repo(mut self, repo: MockStatusRepo) -> Self {
        self.status_repo = Some(repo);
        self
    }

    pub fn with_rate_limiter(mut self, limiter: MockRateLimiter) -> Self {
        self.rate_limiter = Some(limiter);
        self
    }

    pub fn with_otp_store(mut self, store: MockOtpStore) -> Self {
        self.otp_store = Some(store);
        self
    }

    pub fn with_email_sender(mut self, sender: MockEmailSender) -> Self {
        self.email_sender = Some(sender);
        self
    }

    pub fn with_token_service(mut self, service: MockTokenService) -> Self {
        self.token_service = Some(service);
        self
    }

    pub fn with_photo_storage(mut self, storage: MockPhotoStorage) -> Self {
        self.photo_storage = Some(storage);
        self
    }

    pub fn with_geocoder(mut self, geocoder: MockReverseGeocoder) -> Self {
        self.geocoder = Some(geocoder);
        self
    }

    pub fn with_embedder(mut self, embedder: MockEmbeddingClient) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn with_analyzer(mut self, analyzer: MockMediaAnalyzer) -> Self {
        self.analyzer = Some(analyzer);
        self
    }

    /// Builds the `AppState` with configured mocks or defaults.
    pub fn build(self) -> AppState {
        let config = self.config.unwrap_or_else(test_config);

        let repos = Repos {
            users: Arc::new(self.user_repo.unwrap_or_else(MockUserRepo::new)),
            photos: Arc::new(self.photo_repo.unwrap_or_else(MockPhotoRepo::new)),
            status: Arc::new(self.status_repo.unwrap_or_else(MockStatusRepo::new)),
        };

        let stores = Stores {
            rate_limiter: Arc::new(self.rate_limiter.unwrap_or_else(MockRateLimiter::new)),
            otp: Arc::new(self.otp_store.unwrap_or_else(MockOtpStore::new)),
        };

        let tokens: Arc<dyn TokenService> = match self.token_service {
            Some(mock) => Arc::new(mock),
            None => Arc::new(JwtTokenService::new(
                &config.jwt_secret,
                Duration::hours(config.token_ttl_hours),
            )),
        };

        let credentials = Credentials::new(repos.users.clone(), config.bcrypt_cost).unwrap();

        let otp = OtpManager::new(
            stores.otp.clone(),
            Arc::new(self.email_sender.unwrap_or_else(MockEmailSender::new)),
            Duration::seconds(config.otp_ttl_secs),
        );

        AppState {
            config,
            repos,
            stores,
            credentials,
            tokens,
            otp,
            photo_storage: Arc::new(self.photo_storage.unwrap_or_else(MockPhotoStorage::new)),
            geocoder: Arc::new(self.geocoder.unwrap_or_else(MockReverseGeocoder::new)),
            embedder: Arc::new(self.embedder.unwrap_or_else(MockEmbeddingClient::new)),
            analyzer: Arc::new(self.analyzer.unwrap_or_else(MockMediaAnalyzer::new)),
        }
    }
}
