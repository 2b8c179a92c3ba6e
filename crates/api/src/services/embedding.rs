//! Client for the external embedding/search service that indexes uploaded photos.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Sent once per uploaded photo. No retry state is kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbedRequest {
    pub image_path: String,
    pub note: String,
    pub city: String,
    pub id: i64,
}

/// Raw search response, passed through to the caller untouched.
#[derive(Debug, Clone)]
pub struct SearchResults {
    pub status: u16,
    pub body: Vec<u8>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Ask the service to caption and index a photo.
    async fn embed(&self, request: &EmbedRequest) -> Result<()>;

    /// Similarity search over indexed photos.
    async fn search(&self, query: &str, k: u32) -> Result<SearchResults>;
}

/// HTTP implementation of EmbeddingClient.
pub struct HttpEmbeddingClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpEmbeddingClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        // Captioning a large image can take a while on CPU
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl EmbeddingClient for HttpEmbeddingClient {
    async fn embed(&self, request: &EmbedRequest) -> Result<()> {
        let response = self
            .http
            .post(format!("{}/embed", self.base_url))
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            anyhow::bail!("embed service error: {}", response.status());
        }

        Ok(())
    }

    async fn search(&self, query: &str, k: u32) -> Result<SearchResults> {
        let response = self
            .http
            .get(format!("{}/search", self.base_url))
            .query(&[("q", query.to_string()), ("k", k.to_string())])
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.bytes().await?.to_vec();

        Ok(SearchResults { status, body })
    }
}
