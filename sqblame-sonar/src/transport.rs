//! HTTP transport abstraction

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use sqblame_core::{Credentials, ServerConfig};
use tracing::debug;

use crate::{Error, Result};

/// Status and body of a completed request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Trait for issuing GET requests against one server
///
/// Non-success statuses are returned as responses; only failures to get a
/// response at all are errors.
#[async_trait]
pub trait Transport: Send + Sync {
    /// GET `path` (relative to the server base URL) with query parameters
    async fn get(&self, path: &str, query: &[(String, String)]) -> Result<HttpResponse>;
}

/// Transport backed by a shared `reqwest::Client`
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    credentials: Credentials,
}

impl HttpTransport {
    /// Create a transport for a server
    pub fn new(
        base_url: impl Into<String>,
        credentials: Credentials,
        config: &ServerConfig,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("sqblame/", env!("CARGO_PKG_VERSION")))
            .timeout(config.timeout)
            .danger_accept_invalid_certs(config.insecure)
            .build()
            .map_err(|e| Error::Client(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, path: &str, query: &[(String, String)]) -> Result<HttpResponse> {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        debug!(url = %url, ?query, "GET");

        let mut request = self
            .client
            .get(&url)
            .header(ACCEPT, "application/json")
            .query(query);
        if let Some((username, password)) = self.credentials.basic_auth() {
            request = request.basic_auth(username, Some(password));
        }

        let transport_error = |e: reqwest::Error| Error::Transport {
            url: url.clone(),
            reason: if e.is_timeout() {
                "timed out".to_string()
            } else {
                e.to_string()
            },
        };

        let response = request.send().await.map_err(transport_error)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(transport_error)?;

        debug!(url = %url, status, bytes = body.len(), "Response received");

        Ok(HttpResponse { status, body })
    }
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("base_url", &self.base_url)
            .field("credentials", &self.credentials)
            .finish_non_exhaustive()
    }
}
