//! HTTP client for the bridge's configuration API.
//!
//! The public operations follow the device contract: a request either
//! succeeds with HTTP 200 or it does not. Failures of any kind are logged
//! and reported as `None` or `false`.

use crate::config::TuiConfig;
use futures_util::{Stream, StreamExt};
use hygro_core::{DeviceConfig, CONFIG_PATH};
use reqwest::header::CONTENT_LENGTH;
use reqwest::{Body, Method, StatusCode};
use std::sync::Arc;
use std::time::Duration;

/// Upload bodies are fed to the transport in chunks of this size.
const UPLOAD_CHUNK: usize = 4 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum ApiClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Unexpected response: HTTP {0}")]
    Status(u16),
    #[error("Serialization error: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Config error: {0}")]
    Config(String),
}

/// Bytes moved so far and the expected total, when known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransferProgress {
    pub loaded: u64,
    pub total: Option<u64>,
}

impl TransferProgress {
    /// Completed fraction in `0.0..=1.0`; `None` if the total is unknown.
    pub fn ratio(&self) -> Option<f64> {
        match self.total {
            Some(0) => Some(1.0),
            Some(total) => Some((self.loaded as f64 / total as f64).clamp(0.0, 1.0)),
            None => None,
        }
    }
}

/// Decoded configuration together with the document it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigDocument {
    pub config: DeviceConfig,
    pub raw: String,
}

pub type ProgressFn = Arc<dyn Fn(TransferProgress) + Send + Sync>;

#[derive(Debug, Clone)]
pub struct DeviceClient {
    client: reqwest::Client,
    base_url: String,
}

impl DeviceClient {
    pub fn new(config: &TuiConfig) -> Result<Self, ApiClientError> {
        Self::with_base_url(
            &config.device_url,
            Duration::from_millis(config.request_timeout_ms),
        )
    }

    pub fn with_base_url(base_url: &str, timeout: Duration) -> Result<Self, ApiClientError> {
        let base_url = base_url.trim().trim_end_matches('/');
        if !is_absolute(base_url) {
            return Err(ApiClientError::Config(format!(
                "device url must be absolute: {}",
                base_url
            )));
        }
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URLs are used as given; anything else is relative to the
    /// device.
    pub fn resolve(&self, url: &str) -> String {
        if is_absolute(url) {
            url.to_string()
        } else if url.starts_with('/') {
            format!("{}{}", self.base_url, url)
        } else {
            format!("{}/{}", self.base_url, url)
        }
    }

    pub async fn get(&self, url: &str) -> Option<String> {
        let url = self.resolve(url);
        settle(&Method::GET, &url, self.try_get(&url).await)
    }

    pub async fn get_binary(&self, url: &str, progress: Option<ProgressFn>) -> Option<Vec<u8>> {
        let url = self.resolve(url);
        settle(&Method::GET, &url, self.try_get_binary(&url, progress).await)
    }

    pub async fn put(&self, url: &str, bytes: Vec<u8>, progress: Option<ProgressFn>) -> bool {
        self.send_bytes(Method::PUT, url, bytes, progress).await
    }

    /// Upload `bytes` with an arbitrary method.
    pub async fn send_bytes(
        &self,
        method: Method,
        url: &str,
        bytes: Vec<u8>,
        progress: Option<ProgressFn>,
    ) -> bool {
        let url = self.resolve(url);
        let result = self
            .try_send_bytes(method.clone(), &url, bytes, progress)
            .await;
        settle(&method, &url, result).is_some()
    }

    pub async fn delete(&self, url: &str) -> bool {
        let url = self.resolve(url);
        let result = match self.client.delete(&url).send().await {
            Ok(response) => check_status(response).map(|_| ()),
            Err(err) => Err(err.into()),
        };
        settle(&Method::DELETE, &url, result).is_some()
    }

    /// GET the configuration document and decode it, keeping the text as
    /// served.
    pub async fn fetch_document(&self) -> Option<ConfigDocument> {
        let raw = self.get(CONFIG_PATH).await?;
        match DeviceConfig::from_json(&raw) {
            Ok(config) => Some(ConfigDocument { config, raw }),
            Err(err) => {
                tracing::warn!(error = %err, "device returned an unreadable configuration");
                None
            }
        }
    }

    pub async fn fetch_config(&self) -> Option<DeviceConfig> {
        self.fetch_document().await.map(|doc| doc.config)
    }

    /// PUT the configuration. Readings are never sent back.
    pub async fn store_config(&self, config: &DeviceConfig) -> bool {
        let mut outgoing = config.clone();
        outgoing.clear_readings();
        match serde_json::to_vec(&outgoing) {
            Ok(body) => self.put(CONFIG_PATH, body, None).await,
            Err(err) => {
                tracing::warn!(error = %err, "failed to encode configuration");
                false
            }
        }
    }

    async fn try_get(&self, url: &str) -> Result<String, ApiClientError> {
        let response = check_status(self.client.get(url).send().await?)?;
        Ok(response.text().await?)
    }

    async fn try_get_binary(
        &self,
        url: &str,
        progress: Option<ProgressFn>,
    ) -> Result<Vec<u8>, ApiClientError> {
        let response = check_status(self.client.get(url).send().await?)?;
        let total = response.content_length();
        let mut body = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            body.extend_from_slice(&chunk?);
            if let Some(report) = &progress {
                report(TransferProgress {
                    loaded: body.len() as u64,
                    total,
                });
            }
        }
        Ok(body)
    }

    async fn try_send_bytes(
        &self,
        method: Method,
        url: &str,
        bytes: Vec<u8>,
        progress: Option<ProgressFn>,
    ) -> Result<(), ApiClientError> {
        let request = self
            .client
            .request(method, url)
            .header(CONTENT_LENGTH, bytes.len() as u64);
        let request = match progress {
            Some(report) => request.body(Body::wrap_stream(upload_stream(bytes, report))),
            None => request.body(bytes),
        };
        check_status(request.send().await?)?;
        Ok(())
    }
}

fn is_absolute(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// Only HTTP 200 counts as success.
fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ApiClientError> {
    let status = response.status();
    if status == StatusCode::OK {
        Ok(response)
    } else {
        Err(ApiClientError::Status(status.as_u16()))
    }
}

fn settle<T>(method: &Method, url: &str, result: Result<T, ApiClientError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::warn!(%method, %url, error = %err, "device request failed");
            None
        }
    }
}

/// Body stream that reports progress as the transport pulls each chunk.
fn upload_stream(
    bytes: Vec<u8>,
    report: ProgressFn,
) -> impl Stream<Item = Result<Vec<u8>, std::io::Error>> + Send + 'static {
    let total = bytes.len() as u64;
    let chunks: Vec<Vec<u8>> = bytes.chunks(UPLOAD_CHUNK).map(<[u8]>::to_vec).collect();
    let mut loaded = 0u64;
    futures_util::stream::iter(chunks.into_iter().map(move |chunk| {
        loaded += chunk.len() as u64;
        report(TransferProgress {
            loaded,
            total: Some(total),
        });
        Ok(chunk)
    }))
}
