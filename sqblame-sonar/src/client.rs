//! SonarQube API client

use serde::Deserialize;
use sqblame_core::config::MAX_PAGE_SIZE;
use sqblame_core::{Credentials, QueryContext, ServerConfig};
use tracing::{debug, info};

use crate::transport::{HttpResponse, HttpTransport, Transport};
use crate::{Error, Result};

const AUTH_VALIDATE_PATH: &str = "api/authentication/validate";

/// SonarQube Web API client for one server
pub struct SonarClient {
    transport: Box<dyn Transport>,
    page_size: u32,
}

impl SonarClient {
    /// Create a client for the server a query targets
    pub fn new(
        query: &QueryContext,
        credentials: Credentials,
        config: &ServerConfig,
    ) -> Result<Self> {
        let transport = HttpTransport::new(query.base_url(), credentials, config)?;

        info!(
            server = %query.base_url(),
            page_size = config.page_size,
            insecure = config.insecure,
            "Created SonarQube client"
        );

        Ok(Self::with_transport(transport).with_page_size(config.page_size))
    }

    /// Create a client over any transport
    pub fn with_transport(transport: impl Transport + 'static) -> Self {
        Self {
            transport: Box::new(transport),
            page_size: MAX_PAGE_SIZE,
        }
    }

    /// Issues per search page, capped at the server maximum
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.clamp(1, MAX_PAGE_SIZE);
        self
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub(crate) async fn get(&self, path: &str, query: &[(String, String)]) -> Result<HttpResponse> {
        self.transport.get(path, query).await
    }

    /// Check that the server is reachable and accepts the credentials
    pub async fn test_connection(&self) -> Result<()> {
        #[derive(Deserialize)]
        struct Validation {
            #[serde(default)]
            valid: bool,
        }

        debug!("Validating SonarQube credentials");

        let response = self.get(AUTH_VALIDATE_PATH, &[]).await?;
        match response.status {
            _ if response.is_success() => {}
            401 | 403 => {
                return Err(Error::Unauthorized {
                    status: response.status,
                    body: response.body,
                })
            }
            status => {
                return Err(Error::Status {
                    endpoint: AUTH_VALIDATE_PATH.to_string(),
                    status,
                    body: response.body,
                })
            }
        }

        let validation: Validation =
            serde_json::from_str(&response.body).map_err(|e| Error::MalformedResponse {
                endpoint: AUTH_VALIDATE_PATH.to_string(),
                reason: e.to_string(),
            })?;

        if !validation.valid {
            return Err(Error::Unauthorized {
                status: response.status,
                body: response.body,
            });
        }

        info!("SonarQube connection successful");
        Ok(())
    }
}

impl std::fmt::Debug for SonarClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SonarClient")
            .field("page_size", &self.page_size)
            .finish_non_exhaustive()
    }
}
