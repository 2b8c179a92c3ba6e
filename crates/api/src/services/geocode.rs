//! Reverse geocoding (coordinates to place name) via a Nominatim-compatible API.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;

/// Resolves a latitude/longitude pair to a human-readable place.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReverseGeocoder: Send + Sync {
    /// City, town or village at the coordinate, if the service knows one.
    async fn place_name(&self, lat: f64, lon: f64) -> Result<Option<String>>;
}

#[derive(Debug, Deserialize)]
struct ReverseResponse {
    #[serde(default)]
    address: Option<Address>,
}

#[derive(Debug, Default, Deserialize)]
struct Address {
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
}

impl Address {
    fn place(self) -> Option<String> {
        [self.city, self.town, self.village]
            .into_iter()
            .flatten()
            .find(|name| !name.trim().is_empty())
    }
}

/// Nominatim client (https://nominatim.org/release-docs/latest/api/Reverse/).
pub struct NominatimGeocoder {
    http: reqwest::Client,
    base_url: String,
}

impl NominatimGeocoder {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        // Nominatim's usage policy requires an identifying User-Agent
        let http = reqwest::Client::builder()
            .user_agent(concat!("memora/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl ReverseGeocoder for NominatimGeocoder {
    async fn place_name(&self, lat: f64, lon: f64) -> Result<Option<String>> {
        let response: ReverseResponse = self
            .http
            .get(format!("{}/reverse", self.base_url))
            .query(&[
                ("format", "jsonv2".to_string()),
                ("lat", lat.to_string()),
                ("lon", lon.to_string()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(response.address.and_then(Address::place))
    }
}
