//! HTTP client for the catalog's `records` endpoint.

use std::time::Duration;

use reqwest::{Client, Url};

use crate::error::OpenDataError;
use crate::paginate::PageSource;
use crate::types::{Page, PageBody};

/// HTTP client for one dataset's `records` endpoint.
///
/// Issues exactly one GET per page with `limit` and `offset` query
/// parameters. Non-2xx responses and unreadable bodies are returned as typed
/// errors; nothing is retried here. The caller decides whether to fall back
/// to older data.
pub struct OpenDataClient {
    pub(super) client: Client,
    pub(super) api_url: Url,
}

impl OpenDataClient {
    /// Creates an `OpenDataClient` with configured timeout and `User-Agent`.
    ///
    /// # Errors
    ///
    /// - [`OpenDataError::InvalidApiUrl`] if `api_url` does not parse as an
    ///   absolute http(s) URL.
    /// - [`OpenDataError::Http`] if the underlying `reqwest::Client` cannot be
    ///   constructed (e.g., invalid TLS config).
    pub fn new(api_url: &str, timeout_secs: u64, user_agent: &str) -> Result<Self, OpenDataError> {
        let api_url = Self::parse_api_url(api_url)?;
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;
        Ok(Self { client, api_url })
    }

    /// Builds a client from the shared application config.
    ///
    /// # Errors
    ///
    /// Same as [`Self::new`].
    pub fn from_app_config(config: &ratp_core::AppConfig) -> Result<Self, OpenDataError> {
        Self::new(
            &config.api_url,
            config.request_timeout_secs,
            &config.user_agent,
        )
    }

    /// Fetches the page of `limit` records starting at `offset`.
    ///
    /// # Errors
    ///
    /// - [`OpenDataError::UnexpectedStatus`] on any non-2xx status.
    /// - [`OpenDataError::Http`] on a network, timeout or TLS failure.
    /// - [`OpenDataError::Deserialize`] if the body is neither a results envelope
    ///   nor a JSON array of objects.
    pub async fn fetch_page(&self, offset: u64, limit: u32) -> Result<Page, OpenDataError> {
        let url = self.records_url(offset, limit);
        tracing::debug!(%url, offset, limit, "requesting records page");

        let response = self
            .client
            .get(url.as_str())
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            return Err(OpenDataError::UnexpectedStatus {
                status: status.as_u16(),
                url,
            });
        }

        let body = response.text().await?;
        let parsed =
            serde_json::from_str::<PageBody>(&body).map_err(|e| OpenDataError::Deserialize {
                context: format!("records page at offset {offset}"),
                source: e,
            })?;

        Ok(Page::from(parsed))
    }

    /// Appends `limit` and `offset` to the configured endpoint, keeping any
    /// query parameters it already carries (e.g. a `where` clause).
    pub(super) fn records_url(&self, offset: u64, limit: u32) -> String {
        let mut url = self.api_url.clone();
        url.query_pairs_mut()
            .append_pair("limit", &limit.to_string())
            .append_pair("offset", &offset.to_string());
        url.to_string()
    }

    fn parse_api_url(api_url: &str) -> Result<Url, OpenDataError> {
        let url = Url::parse(api_url).map_err(|e| OpenDataError::InvalidApiUrl {
            api_url: api_url.to_owned(),
            reason: e.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(OpenDataError::InvalidApiUrl {
                api_url: api_url.to_owned(),
                reason: format!("unsupported scheme \"{}\"", url.scheme()),
            });
        }
        Ok(url)
    }
}

impl PageSource for OpenDataClient {
    async fn fetch_page(&self, offset: u64, limit: u32) -> Result<Page, OpenDataError> {
        OpenDataClient::fetch_page(self, offset, limit).await
    }
}

#[cfg(test)]
#[path = "../client_test.rs"]
mod tests;
