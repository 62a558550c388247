//! HTTP access to the product catalog and episode list.

use std::time::Duration;

use serde_json::Value;
use tracing::debug;

use crate::utils::url::endpoint_url;

const UPSTREAM_CONNECT_TIMEOUT_SECONDS: u64 = 10;
const TOTAL_ITEMS_HEADER: &str = "X-WP-Total";
const TOTAL_PAGES_HEADER: &str = "X-WP-TotalPages";

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("API request failed with status {0}")]
    Status(u16),
    #[error("API request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Unexpected API response: {0}")]
    Decode(String),
    #[error("{0}")]
    Url(String),
}

/// One page of raw catalog records plus the totals the catalog reported in
/// its response headers.
#[derive(Debug, Clone, Default)]
pub struct CatalogPage {
    pub records: Vec<Value>,
    pub total_items: Option<u64>,
    pub total_pages: Option<u64>,
}

#[derive(Clone)]
pub struct UpstreamClient {
    http: reqwest::Client,
    product_api_url: String,
    episode_api_url: String,
}

impl UpstreamClient {
    pub fn new(product_api_url: String, episode_api_url: String) -> Result<Self, String> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(UPSTREAM_CONNECT_TIMEOUT_SECONDS))
            .build()
            .map_err(|err| format!("Failed to build HTTP client: {err}"))?;
        Ok(Self {
            http,
            product_api_url,
            episode_api_url,
        })
    }

    /// `GET /products?per_page=N&page=P`. Non-2xx is a hard failure.
    pub async fn fetch_product_page(
        &self,
        page: u64,
        per_page: u32,
    ) -> Result<CatalogPage, FetchError> {
        let url = endpoint_url(&self.product_api_url, "products").map_err(FetchError::Url)?;
        debug!(page, per_page, "Fetching product page");
        let response = self
            .http
            .get(url)
            .query(&[("per_page", u64::from(per_page)), ("page", page)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let total_items = header_count(&response, TOTAL_ITEMS_HEADER);
        let total_pages = header_count(&response, TOTAL_PAGES_HEADER);
        let records = match read_json(response).await? {
            Value::Array(records) => records,
            Value::Null => Vec::new(),
            other => {
                return Err(FetchError::Decode(format!(
                    "expected a product array, got {}",
                    json_kind(&other)
                )))
            }
        };
        debug!(page, records = records.len(), ?total_pages, "Fetched product page");

        Ok(CatalogPage {
            records,
            total_items,
            total_pages,
        })
    }

    /// `GET /episodes`: the whole list in one response.
    pub async fn fetch_episodes(&self) -> Result<Vec<Value>, FetchError> {
        let url = endpoint_url(&self.episode_api_url, "episodes").map_err(FetchError::Url)?;
        debug!("Fetching episode list");
        let response = self.http.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        match read_json(response).await? {
            Value::Array(episodes) => Ok(episodes),
            Value::Null => Ok(Vec::new()),
            other => Err(FetchError::Decode(format!(
                "expected an episode array, got {}",
                json_kind(&other)
            ))),
        }
    }
}

async fn read_json(response: reqwest::Response) -> Result<Value, FetchError> {
    response
        .json::<Value>()
        .await
        .map_err(|err| FetchError::Decode(err.to_string()))
}

fn header_count(response: &reqwest::Response, name: &str) -> Option<u64> {
    response
        .headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse().ok())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
