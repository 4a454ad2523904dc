use crate::error::{Result, VastError};
use crate::models::AdResponse;
use async_trait::async_trait;
use log::{info, warn};
use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use std::path::Path;
use std::time::{Duration, Instant};

/// Resolves an ad-server URL into an ad response.
///
/// Called once per player instance. `None` means the ad server gave nothing
/// usable; the reason is the implementation's to log.
#[async_trait]
pub trait AdResolver: Send + Sync {
    async fn resolve(&self, url: &str) -> Option<AdResponse>;
}

/// Build the HTTP client shared by the resolver and tracking beacons
pub fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(3))
        .build()
        .map_err(|e| VastError::HttpError(format!("Failed to build HTTP client: {}", e)))
}

/// Resolver reading a JSON ad response from HTTP(S), `file://` or a local path
#[derive(Debug, Clone)]
pub struct HttpAdResolver {
    client: reqwest::Client,
}

impl HttpAdResolver {
    pub fn new() -> Result<Self> {
        Ok(Self::with_client(http_client()?))
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Fetch and decode an ad response from a URL or file path
    pub async fn fetch(&self, url_or_path: &str) -> Result<AdResponse> {
        let content = self.fetch_content(url_or_path).await?;
        let response: AdResponse = serde_json::from_str(&content)?;
        info!("Resolved {} ads from {}", response.ads.len(), url_or_path);
        Ok(response)
    }

    /// Fetch raw content from a URL or file path
    pub async fn fetch_content(&self, url_or_path: &str) -> Result<String> {
        if let Some(path) = url_or_path.strip_prefix("file://") {
            #[cfg(target_os = "windows")]
            let path = path.trim_start_matches('/');

            info!("Reading from file: {}", path);
            return Ok(tokio::fs::read_to_string(path).await?);
        }

        if Path::new(url_or_path).exists() {
            info!("Reading from local file: {}", url_or_path);
            return Ok(tokio::fs::read_to_string(url_or_path).await?);
        }

        fetch_from_url(&self.client, url_or_path).await
    }
}

#[async_trait]
impl AdResolver for HttpAdResolver {
    async fn resolve(&self, url: &str) -> Option<AdResponse> {
        match self.fetch(url).await {
            Ok(response) => Some(response),
            Err(e) => {
                warn!("Failed to resolve ad response from {}: {}", url, e);
                None
            }
        }
    }
}

/// Fetch and decode an ad response with a one-off resolver
pub async fn fetch_ad_response(url_or_path: &str) -> Result<AdResponse> {
    HttpAdResolver::new()?.fetch(url_or_path).await
}

async fn fetch_from_url(client: &reqwest::Client, url: &str) -> Result<String> {
    // Random request ID for tracking in logs
    let req_id: String = thread_rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(char::from)
        .collect();

    let url = url::Url::parse(url)?;
    info!("[{}] Fetching from URL: {}", req_id, url);

    let start_time = Instant::now();

    let response = client.get(url).send().await.map_err(|e| {
        warn!("[{}] Request failed after {:?}", req_id, start_time.elapsed());
        VastError::HttpError(format!("Failed to fetch URL: {}", e))
    })?;

    info!("[{}] Received response in {:?}", req_id, start_time.elapsed());

    if !response.status().is_success() {
        return Err(VastError::HttpError(format!(
            "Failed to fetch URL: HTTP status {}",
            response.status()
        )));
    }

    let body = response
        .text()
        .await
        .map_err(|e| VastError::HttpError(format!("Failed to read response body: {}", e)))?;

    info!("[{}] Total request completed in {:?}", req_id, start_time.elapsed());

    Ok(body)
}
