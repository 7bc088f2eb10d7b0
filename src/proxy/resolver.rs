//! Exit address and address metadata resolution through the proxy

use crate::proxy::models::ProxyEndpoint;
use async_trait::async_trait;
use reqwest::{header, Client, Proxy as ReqwestProxy, StatusCode};
use serde::Deserialize;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::debug;

/// Default timeout for each outbound request in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Endpoint reporting the caller's apparent address
const EXIT_ADDRESS_URL: &str = "https://ipinfo.io/json";

/// Endpoint returning country and ASN data for an address
const METADATA_URL: &str = "https://ipinfo.io/widget/demo/";

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("HTTP status: {0}")]
    Status(StatusCode),

    #[error("Invalid response: {0}")]
    Payload(String),

    #[error("Invalid proxy URL: {0}")]
    InvalidProxy(String),
}

/// Apparent outbound address of the proxy and how long it took to learn it
#[derive(Debug, Clone, PartialEq)]
pub struct ExitAddress {
    pub ip: String,
    pub latency: Duration,
}

/// Resolves the exit address of the configured proxy
#[async_trait]
pub trait AddressResolver: Send + Sync {
    async fn resolve_exit(&self) -> Result<ExitAddress, ResolveError>;
}

/// Fetches the raw metadata payload for an address
#[async_trait]
pub trait MetadataResolver: Send + Sync {
    async fn resolve_metadata(&self, ip: &str) -> Result<String, ResolveError>;
}

#[derive(Debug, Deserialize)]
struct ExitAddressPayload {
    ip: String,
}

/// ipinfo.io client routed through a single proxy endpoint
///
/// Both lookups share one client, so the metadata request also travels
/// through the proxy. Idle connections are never reused: a rotating proxy
/// usually assigns its exit address per connection.
#[derive(Clone)]
pub struct IpinfoClient {
    client: Client,
    timeout: Duration,
}

impl IpinfoClient {
    /// Build a client for `endpoint` with the given per-request timeout
    pub fn new(endpoint: &ProxyEndpoint, timeout: Duration) -> Result<Self, ResolveError> {
        let proxy = if endpoint.proxy_type.is_socks() {
            let url = endpoint
                .url()
                .ok_or_else(|| ResolveError::InvalidProxy(endpoint.base_url()))?;
            ReqwestProxy::all(url)?
        } else {
            let proxy = ReqwestProxy::all(endpoint.base_url())?;
            match &endpoint.auth {
                Some(auth) => proxy.basic_auth(&auth.username, &auth.password),
                None => proxy,
            }
        };

        let client = Client::builder()
            .proxy(proxy)
            .timeout(timeout)
            .pool_max_idle_per_host(0)
            .danger_accept_invalid_certs(true)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client, timeout })
    }

    /// Issue a GET and return the body regardless of status
    async fn fetch(&self, url: &str) -> Result<(StatusCode, String), ResolveError> {
        let request = async {
            let response = self
                .client
                .get(url)
                .header(header::CONNECTION, "close")
                .send()
                .await?;
            let status = response.status();
            let body = response.text().await?;
            Ok::<_, reqwest::Error>((status, body))
        };

        match tokio::time::timeout(self.timeout, request).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(ResolveError::Timeout(self.timeout)),
        }
    }
}

#[async_trait]
impl AddressResolver for IpinfoClient {
    async fn resolve_exit(&self) -> Result<ExitAddress, ResolveError> {
        let start = Instant::now();
        let (status, body) = self.fetch(EXIT_ADDRESS_URL).await?;
        let latency = start.elapsed();

        let payload: ExitAddressPayload = serde_json::from_str(&body).map_err(|e| {
            debug!(%status, "exit address response was not usable: {}", e);
            if status.is_success() {
                ResolveError::Payload(e.to_string())
            } else {
                ResolveError::Status(status)
            }
        })?;

        Ok(ExitAddress {
            ip: payload.ip,
            latency,
        })
    }
}

#[async_trait]
impl MetadataResolver for IpinfoClient {
    async fn resolve_metadata(&self, ip: &str) -> Result<String, ResolveError> {
        let url = format!("{}{}", METADATA_URL, ip);
        let (status, body) = self.fetch(&url).await?;
        if !status.is_success() {
            debug!(%status, ip, "metadata lookup returned non-success status");
        }
        // The payload is judged by the parse stage, not by the status line.
        Ok(body)
    }
}
