//! HTTP fetcher for the Flickr REST API
//!
//! This module wraps the two API calls the pipeline needs:
//! - `flickr.photos.search` for one page of a user's public photos
//! - `flickr.photos.getInfo` for the details of one photo
//!
//! Every response is decoded from the `{"stat": ..., ...}` envelope; a
//! `fail` status is turned into [`FetchError::Api`]. There is no retry and
//! no rate limiting here.

use async_trait::async_trait;
use reqwest::{header::ACCEPT, Client};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use url::Url;

use crate::config::{FlickrConfig, DEFAULT_BASE_URL};
use crate::crawler::{DetailSource, PageSource};
use crate::models::{PhotoInfo, PhotoSummary, SearchPage};
use crate::utils::error::FetchError;

const STATUS_FAIL: &str = "fail";

#[derive(Debug, Deserialize)]
struct SearchBody {
    photos: SearchPage,
}

#[derive(Debug, Deserialize)]
struct InfoBody {
    photo: PhotoInfo,
}

/// Flickr API fetcher
///
/// Cheap to share: the underlying `reqwest::Client` is reference counted,
/// so one fetcher serves every worker.
#[derive(Debug, Clone)]
pub struct FlickrFetcher {
    /// HTTP client with configured timeout and compression
    client: Client,

    /// REST endpoint
    base_url: Url,

    /// API key sent with every request
    api_key: String,

    /// Owner of the listed photostream
    user_id: String,

    /// Page size for listing calls
    per_page: u32,
}

impl FlickrFetcher {
    /// Create a new fetcher against the public endpoint
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Http` if the HTTP client cannot be created
    pub fn new(api_key: &str, user_id: &str) -> Result<Self, FetchError> {
        Self::with_config(&FlickrConfig {
            api_key: api_key.to_string(),
            user_id: user_id.to_string(),
            ..Default::default()
        })
    }

    /// Create a new fetcher from configuration
    ///
    /// # Errors
    ///
    /// Returns `FetchError::InvalidUrl` for a malformed base URL and
    /// `FetchError::Http` if the HTTP client cannot be created
    pub fn with_config(config: &FlickrConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(format!("fetchr/{}", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .gzip(true)
            .build()?;

        let base = if config.base_url.is_empty() {
            DEFAULT_BASE_URL
        } else {
            config.base_url.as_str()
        };
        let base_url =
            Url::parse(base).map_err(|e| FetchError::InvalidUrl(format!("{base}: {e}")))?;

        Ok(Self {
            client,
            base_url,
            api_key: config.api_key.clone(),
            user_id: config.user_id.clone(),
            per_page: config.per_page,
        })
    }

    /// Create a new fetcher with a custom base URL for testing
    ///
    /// # Errors
    ///
    /// Returns `FetchError::InvalidUrl` if `base_url` cannot be parsed
    pub fn with_base_url(
        base_url: &str,
        api_key: &str,
        user_id: &str,
    ) -> Result<Self, FetchError> {
        Self::with_config(&FlickrConfig {
            api_key: api_key.to_string(),
            user_id: user_id.to_string(),
            base_url: base_url.to_string(),
            ..Default::default()
        })
    }

    /// Set the listing page size
    #[must_use]
    pub fn per_page(mut self, per_page: u32) -> Self {
        self.per_page = per_page;
        self
    }

    /// Fetch one page of the user's public photos
    ///
    /// # Errors
    ///
    /// Returns a `FetchError` for transport failures, non-success status,
    /// undecodable bodies and API-level failures
    pub async fn search_page(&self, page: u32) -> Result<SearchPage, FetchError> {
        let page_param = page.to_string();
        let per_page = self.per_page.to_string();
        let params = [
            ("method", "flickr.photos.search"),
            ("api_key", self.api_key.as_str()),
            ("user_id", self.user_id.as_str()),
            ("page", page_param.as_str()),
            ("per_page", per_page.as_str()),
            // public photos only
            ("privacy_filter", "1"),
            // photos only, no screenshots
            ("content_type", "1"),
            ("extras", "original_format"),
        ];

        tracing::trace!(page, "Requesting search page");

        let body: SearchBody = self.call(&params).await?;
        Ok(body.photos)
    }

    /// Fetch full info for one photo
    ///
    /// # Errors
    ///
    /// Same failure modes as [`FlickrFetcher::search_page`]
    pub async fn photo_info(&self, photo_id: &str, secret: &str) -> Result<PhotoInfo, FetchError> {
        let params = [
            ("method", "flickr.photos.getInfo"),
            ("api_key", self.api_key.as_str()),
            ("photo_id", photo_id),
            ("secret", secret),
        ];

        tracing::trace!(photo_id, "Requesting photo info");

        let body: InfoBody = self.call(&params).await?;
        Ok(body.photo)
    }

    /// Build the request URL with the common JSON parameters
    fn build_url(&self, params: &[(&str, &str)]) -> Url {
        let mut url = self.base_url.clone();
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("format", "json");
            query.append_pair("nojsoncallback", "1");
            for (key, value) in params {
                query.append_pair(key, value);
            }
        }
        url
    }

    async fn call<T: DeserializeOwned>(&self, params: &[(&str, &str)]) -> Result<T, FetchError> {
        let url = self.build_url(params);

        let response = self
            .client
            .get(url)
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let bytes = response.bytes().await?;
        Self::decode_envelope(&bytes)
    }

    /// Decode a response body, mapping `"stat": "fail"` to an API error
    pub fn decode_envelope<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, FetchError> {
        let value: Value = serde_json::from_slice(bytes)?;

        if value.get("stat").and_then(Value::as_str) == Some(STATUS_FAIL) {
            // `code` arrives as a number or a quoted number
            let code = value.get("code").and_then(|c| {
                c.as_i64()
                    .or_else(|| c.as_str().and_then(|s| s.parse().ok()))
            });
            let message = value
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            return Err(FetchError::Api { code, message });
        }

        Ok(serde_json::from_value(value)?)
    }
}

#[async_trait]
impl PageSource for FlickrFetcher {
    async fn fetch_page(&self, page: u32) -> Result<SearchPage, FetchError> {
        self.search_page(page).await
    }
}

#[async_trait]
impl DetailSource for FlickrFetcher {
    async fn fetch_detail(&self, summary: &PhotoSummary) -> Result<PhotoInfo, FetchError> {
        self.photo_info(&summary.common.id, summary.secret()).await
    }
}
