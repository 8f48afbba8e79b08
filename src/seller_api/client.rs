use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use super::ATTRIBUTES_CHUNK;
use super::credentials::ApiCredentials;
use crate::error::{ToolkitError, ToolkitResult};

const PRODUCT_LIST_PATH: &str = "/v3/product/list";
const PRODUCT_ATTRIBUTES_PATH: &str = "/v4/product/info/attributes";
const PAGE_LIMIT: u32 = 1000;
const MAX_ATTEMPTS: u32 = 3;
const RETRY_BACKOFF: Duration = Duration::from_secs(2);

/// One page of `/v3/product/list`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductListPage {
    #[serde(default)]
    pub items: Vec<ProductListItem>,
    #[serde(default)]
    pub last_id: String,
    #[serde(default)]
    pub total: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProductListItem {
    pub product_id: u64,
}

/// The subset of `/v4/product/info/attributes` the dimensions report uses.
/// Numeric fields stay loosely typed: the API mixes numbers and strings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductAttributes {
    #[serde(default)]
    pub sku: Option<Value>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub offer_id: Option<String>,
    #[serde(default)]
    pub width: Option<Value>,
    #[serde(default)]
    pub height: Option<Value>,
    #[serde(default)]
    pub depth: Option<Value>,
    #[serde(default)]
    pub dimension_unit: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    result: T,
}

/// Seller API calls needed to build the dimensions report
#[async_trait]
pub trait SellerApi: Send + Sync {
    async fn product_list_page(&self, last_id: &str) -> ToolkitResult<ProductListPage>;

    async fn product_attributes(&self, product_ids: &[u64]) -> ToolkitResult<Vec<ProductAttributes>>;
}

/// reqwest-backed client for one seller account
pub struct HttpSellerApi {
    client: reqwest::Client,
    base_url: String,
    credentials: ApiCredentials,
    backoff: Duration,
}

impl HttpSellerApi {
    pub fn new(base_url: &str, credentials: ApiCredentials) -> ToolkitResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self::with_client(client, base_url, credentials))
    }

    pub fn with_client(client: reqwest::Client, base_url: &str, credentials: ApiCredentials) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
            backoff: RETRY_BACKOFF,
        }
    }

    /// Base delay between retries; attempt `n` waits `n * backoff`
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> ToolkitResult<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        let mut attempt = 1;
        loop {
            debug!("POST {} (attempt {}/{})", url, attempt, MAX_ATTEMPTS);
            let response = self
                .client
                .post(&url)
                .header("Client-Id", &self.credentials.client_id)
                .header("Api-Key", &self.credentials.api_key)
                .json(body)
                .send()
                .await?;

            let status = response.status();
            if status.is_success() {
                let envelope: Envelope<T> = response.json().await?;
                return Ok(envelope.result);
            }

            let body_text = response.text().await.unwrap_or_default();
            if is_retryable(status) && attempt < MAX_ATTEMPTS {
                warn!(
                    "Seller API {} returned {}, retrying ({}/{})",
                    path, status, attempt, MAX_ATTEMPTS
                );
                sleep(self.backoff * attempt).await;
                attempt += 1;
                continue;
            }

            return Err(ToolkitError::Api {
                endpoint: path.to_string(),
                status: status.as_u16(),
                body: body_text,
            });
        }
    }
}

#[async_trait]
impl SellerApi for HttpSellerApi {
    async fn product_list_page(&self, last_id: &str) -> ToolkitResult<ProductListPage> {
        let payload = json!({
            "filter": { "visibility": "ALL" },
            "limit": PAGE_LIMIT,
            "last_id": last_id,
        });
        let page: ProductListPage = self.post(PRODUCT_LIST_PATH, &payload).await?;
        info!(
            "Client {}: product list page with {} items ({} in total)",
            self.credentials.client_id,
            page.items.len(),
            page.total
        );
        Ok(page)
    }

    async fn product_attributes(&self, product_ids: &[u64]) -> ToolkitResult<Vec<ProductAttributes>> {
        let payload = json!({
            "filter": { "product_id": product_ids },
            "limit": ATTRIBUTES_CHUNK,
        });
        self.post(PRODUCT_ATTRIBUTES_PATH, &payload).await
    }
}

fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}
