use anyhow::{Context, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::{error::FetchError, model::CityImage};

use super::{ImageSource, truncate_body};

const DEFAULT_BASE_URL: &str = "https://api.unsplash.com";

/// Unsplash's `per_page` ceiling.
const MAX_PAGE_SIZE: usize = 30;

#[derive(Debug, Clone)]
pub struct UnsplashSource {
    access_key: String,
    base_url: String,
    pool_size: usize,
    http: Client,
}

impl UnsplashSource {
    pub fn new(access_key: String, timeout: Duration) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client for Unsplash")?;

        Ok(Self {
            access_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            pool_size: 20,
            http,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size.clamp(1, MAX_PAGE_SIZE);
        self
    }
}

#[async_trait]
impl ImageSource for UnsplashSource {
    async fn images(&self, place: &str) -> Result<Vec<CityImage>, FetchError> {
        let url = format!("{}/search/photos", self.base_url);
        let per_page = self.pool_size.to_string();

        let res = self
            .http
            .get(&url)
            .query(&[
                ("query", place),
                ("per_page", per_page.as_str()),
                ("client_id", self.access_key.as_str()),
            ])
            .send()
            .await
            .context("Failed to send request to Unsplash (photo search)")?;

        let status = res.status();
        let body = res
            .text()
            .await
            .context("Failed to read Unsplash response body")?;

        if !status.is_success() {
            return Err(anyhow!(
                "Unsplash photo search failed with status {}: {}",
                status,
                truncate_body(&body),
            )
            .into());
        }

        parse_search(&body)
    }
}

/// Decode a `/search/photos` body into the candidate pool.
pub fn parse_search(body: &str) -> Result<Vec<CityImage>, FetchError> {
    let parsed: UsSearchResponse =
        serde_json::from_str(body).context("Failed to parse Unsplash search JSON")?;

    Ok(parsed
        .results
        .into_iter()
        .map(|photo| CityImage {
            url: photo.urls.regular,
            description: photo.alt_description.or(photo.description),
        })
        .collect())
}

#[derive(Debug, Deserialize)]
struct UsUrls {
    regular: String,
}

#[derive(Debug, Deserialize)]
struct UsPhoto {
    urls: UsUrls,
    alt_description: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UsSearchResponse {
    #[serde(default)]
    results: Vec<UsPhoto>,
}
