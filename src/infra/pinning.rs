//! HTTP client for a Pinata-compatible IPFS pinning service.
//!
//! Uploads go to the pinning API, reads go through the public gateway.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::domain::{ComplaintRecord, ContentId};

use super::retry::{Retry, RetryConfig};
use super::{ContentStore, FetchError, Result, UploadError, VaultError};

pub const DEFAULT_API_URL: &str = "https://api.pinata.cloud";
pub const DEFAULT_GATEWAY_URL: &str = "https://gateway.pinata.cloud";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);
pub const DEFAULT_FETCH_RETRIES: u32 = 2;

const PIN_FILE_PATH: &str = "/pinning/pinFileToIPFS";
const PIN_JSON_PATH: &str = "/pinning/pinJSONToIPFS";

/// Pinning service configuration
#[derive(Clone)]
pub struct PinningConfig {
    /// Base URL of the pinning API
    pub api_url: String,
    /// Base URL of the read gateway
    pub gateway_url: String,
    pub api_key: String,
    pub api_secret: String,
    /// Per-request timeout
    pub timeout: Duration,
    /// Extra immediate attempts for gateway reads
    pub fetch_retries: u32,
    /// Reject uploads above this size before sending them
    pub max_upload_bytes: Option<u64>,
}

impl PinningConfig {
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            gateway_url: DEFAULT_GATEWAY_URL.to_string(),
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            timeout: DEFAULT_TIMEOUT,
            fetch_retries: DEFAULT_FETCH_RETRIES,
            max_upload_bytes: None,
        }
    }

    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    pub fn with_gateway_url(mut self, url: impl Into<String>) -> Self {
        self.gateway_url = url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_fetch_retries(mut self, retries: u32) -> Self {
        self.fetch_retries = retries;
        self
    }

    pub fn with_max_upload_bytes(mut self, limit: u64) -> Self {
        self.max_upload_bytes = Some(limit);
        self
    }

    /// Load configuration from environment variables
    ///
    /// `PINATA_API_KEY` and `PINATA_API_SECRET` are required.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("PINATA_API_KEY").map_err(|_| {
            VaultError::Configuration("PINATA_API_KEY is required".to_string())
        })?;
        let api_secret = std::env::var("PINATA_API_SECRET").map_err(|_| {
            VaultError::Configuration("PINATA_API_SECRET is required".to_string())
        })?;

        let mut config = Self::new(api_key, api_secret);

        if let Ok(url) = std::env::var("PINATA_API_URL") {
            config.api_url = url;
        }
        if let Ok(url) = std::env::var("PINATA_GATEWAY_URL") {
            config.gateway_url = url;
        }
        if let Some(secs) = parse_env::<u64>("PINATA_TIMEOUT_SECS")? {
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(retries) = parse_env::<u32>("PINATA_FETCH_RETRIES")? {
            config.fetch_retries = retries;
        }
        config.max_upload_bytes = parse_env::<u64>("PINATA_MAX_UPLOAD_BYTES")?;

        Ok(config)
    }
}

impl fmt::Debug for PinningConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PinningConfig")
            .field("api_url", &self.api_url)
            .field("gateway_url", &self.gateway_url)
            .field("api_key", &"<redacted>")
            .field("api_secret", &"<redacted>")
            .field("timeout", &self.timeout)
            .field("fetch_retries", &self.fetch_retries)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .finish()
    }
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Result<Option<T>> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| VaultError::Configuration(format!("invalid {name}={raw}"))),
        Err(_) => Ok(None),
    }
}

/// Pin response body. Pinata answers with `IpfsHash`.
#[derive(Debug, Deserialize)]
struct PinResponse {
    #[serde(rename = "contentId", alias = "IpfsHash", alias = "cid")]
    content_id: String,
}

/// Content store backed by a remote pinning service
pub struct PinningClient {
    client: Client,
    config: PinningConfig,
    fetch_retry: Retry,
}

impl PinningClient {
    pub fn new(config: PinningConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| VaultError::Configuration(format!("failed to build HTTP client: {e}")))?;
        let fetch_retry = Retry::new(RetryConfig::immediate(config.fetch_retries));

        Ok(Self {
            client,
            config,
            fetch_retry,
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(PinningConfig::from_env()?)
    }

    pub fn config(&self) -> &PinningConfig {
        &self.config
    }

    fn api_endpoint(&self, path: &str) -> String {
        format!("{}{}", self.config.api_url.trim_end_matches('/'), path)
    }

    fn check_size(&self, size: u64) -> std::result::Result<(), UploadError> {
        match self.config.max_upload_bytes {
            Some(limit) if size > limit => Err(UploadError::SizeLimit { size }),
            _ => Ok(()),
        }
    }

    async fn read_pin_response(
        response: Response,
        size: u64,
    ) -> std::result::Result<ContentId, UploadError> {
        let status = response.status();
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(UploadError::Auth {
                    status: status.as_u16(),
                })
            }
            StatusCode::PAYLOAD_TOO_LARGE => return Err(UploadError::SizeLimit { size }),
            s if !s.is_success() => {
                let body = response.text().await.unwrap_or_default();
                return Err(UploadError::Rejected {
                    status: s.as_u16(),
                    body,
                });
            }
            _ => {}
        }

        let pinned: PinResponse = response
            .json()
            .await
            .map_err(|e| UploadError::InvalidResponse(e.to_string()))?;

        ContentId::parse(&pinned.content_id).map_err(|_| {
            UploadError::InvalidResponse(format!(
                "store returned malformed identifier: {}",
                pinned.content_id
            ))
        })
    }

    async fn fetch_once(&self, id: &ContentId) -> std::result::Result<Bytes, FetchError> {
        let url = self.gateway_url(id);
        debug!(version = id.version(), "Fetching from gateway");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(fetch_error_from)?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound);
        }
        if !status.is_success() {
            return Err(FetchError::Transport(format!("gateway returned status {status}")));
        }

        response.bytes().await.map_err(fetch_error_from)
    }
}

// Request URLs carry content ids and must not reach error text or logs.
fn upload_error_from(err: reqwest::Error) -> UploadError {
    if err.is_timeout() {
        UploadError::Timeout
    } else {
        UploadError::Network(err.without_url().to_string())
    }
}

fn fetch_error_from(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Transport(err.without_url().to_string())
    }
}

#[async_trait]
impl ContentStore for PinningClient {
    async fn put_blob(
        &self,
        name: &str,
        data: Bytes,
        content_type: &str,
    ) -> std::result::Result<ContentId, UploadError> {
        let size = data.len() as u64;
        self.check_size(size)?;

        let content_type = if content_type.is_empty() {
            "application/octet-stream"
        } else {
            content_type
        };
        let part = Part::bytes(data.to_vec())
            .file_name(name.to_string())
            .mime_str(content_type)
            .map_err(|e| UploadError::InvalidRequest(e.to_string()))?;
        let metadata = serde_json::json!({ "name": name }).to_string();
        let form = Form::new().part("file", part).text("pinataMetadata", metadata);

        let response = self
            .client
            .post(self.api_endpoint(PIN_FILE_PATH))
            .header("pinata_api_key", &self.config.api_key)
            .header("pinata_secret_api_key", &self.config.api_secret)
            .multipart(form)
            .send()
            .await
            .map_err(upload_error_from)?;

        let id = Self::read_pin_response(response, size).await?;
        info!(file = name, size = size, "Pinned evidence file");
        Ok(id)
    }

    async fn put_json(&self, record: &ComplaintRecord) -> std::result::Result<ContentId, UploadError> {
        let body = record
            .to_json_bytes()
            .map_err(|e| UploadError::InvalidRequest(e.to_string()))?;
        let size = body.len() as u64;
        self.check_size(size)?;

        let response = self
            .client
            .post(self.api_endpoint(PIN_JSON_PATH))
            .header("pinata_api_key", &self.config.api_key)
            .header("pinata_secret_api_key", &self.config.api_secret)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(upload_error_from)?;

        let id = Self::read_pin_response(response, size).await?;
        info!(size = size, "Pinned complaint document");
        Ok(id)
    }

    async fn get(&self, id: &ContentId) -> std::result::Result<Bytes, FetchError> {
        let outcome = self
            .fetch_retry
            .run_with_predicate("gateway fetch", || self.fetch_once(id), FetchError::is_transient)
            .await;

        if let Err(e) = &outcome.result {
            warn!(attempts = outcome.attempts, error = %e, "Gateway fetch failed");
        }
        outcome.into_result()
    }

    fn gateway_url(&self, id: &ContentId) -> String {
        format!("{}/ipfs/{}", self.config.gateway_url.trim_end_matches('/'), id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CID: &str = "QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG";

    #[test]
    fn test_gateway_url_trims_trailing_slash() {
        let config = PinningConfig::new("k", "s").with_gateway_url("https://ipfs.io/");
        let client = PinningClient::new(config).unwrap();
        let id = ContentId::parse(CID).unwrap();
        assert_eq!(client.gateway_url(&id), format!("https://ipfs.io/ipfs/{CID}"));
    }

    #[test]
    fn test_debug_redacts_credentials() {
        let config = PinningConfig::new("public-key", "very-secret");
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("very-secret"));
        assert!(!rendered.contains("public-key"));
    }

    #[test]
    fn test_pin_response_accepts_pinata_shape() {
        let pinata: PinResponse =
            serde_json::from_str(&format!(r#"{{"IpfsHash":"{CID}","PinSize":12}}"#)).unwrap();
        assert_eq!(pinata.content_id, CID);

        let generic: PinResponse =
            serde_json::from_str(&format!(r#"{{"contentId":"{CID}"}}"#)).unwrap();
        assert_eq!(generic.content_id, CID);
    }

    #[tokio::test]
    async fn test_size_limit_checked_before_network() {
        // Unroutable API URL: the request must never be attempted
        let config = PinningConfig::new("k", "s")
            .with_api_url("http://127.0.0.1:9")
            .with_max_upload_bytes(4);
        let client = PinningClient::new(config).unwrap();

        let err = client
            .put_blob("big.bin", Bytes::from_static(b"0123456789"), "application/octet-stream")
            .await
            .unwrap_err();
        assert_eq!(err, UploadError::SizeLimit { size: 10 });
    }
}
