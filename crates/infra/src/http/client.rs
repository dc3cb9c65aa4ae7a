use std::time::Duration;

use reqwest::{Client as ReqwestClient, RequestBuilder, Response};
use tenantlink_domain::TenantStoreError;
use tracing::debug;

use crate::errors::InfraError;

const DEFAULT_USER_AGENT: &str = concat!("tenantlink/", env!("CARGO_PKG_VERSION"));

/// Shared, thread-safe HTTP transport handle.
///
/// Cheap to clone; clones share one connection pool. Retrying is a lookup
/// policy concern, so `send` makes exactly one attempt.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: ReqwestClient,
}

impl HttpClient {
    /// Start building a new HTTP client.
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    /// Convenience constructor with default configuration.
    pub fn new() -> Result<Self, TenantStoreError> {
        Self::builder().build()
    }

    pub fn get<U>(&self, url: U) -> RequestBuilder
    where
        U: reqwest::IntoUrl,
    {
        self.client.get(url)
    }

    /// Underlying reqwest client, for collaborators that speak HTTP themselves.
    pub fn inner(&self) -> &ReqwestClient {
        &self.client
    }

    /// Execute the provided request builder once.
    ///
    /// Any status is returned as a response; only transport failures
    /// (including timeouts) are errors.
    pub async fn send(&self, builder: RequestBuilder) -> Result<Response, TenantStoreError> {
        let request = builder.build().map_err(|err| TenantStoreError::from(InfraError::from(err)))?;

        let method = request.method().clone();
        let url = request.url().clone();
        debug!(%method, %url, "sending HTTP request");

        match self.client.execute(request).await {
            Ok(response) => {
                debug!(%method, %url, status = %response.status(), "received HTTP response");
                Ok(response)
            }
            Err(err) => {
                debug!(%method, %url, error = %err, "HTTP request failed");
                Err(InfraError::from(err).into())
            }
        }
    }
}

/// Builder for [`HttpClient`].
#[derive(Debug)]
pub struct HttpClientBuilder {
    timeout: Duration,
    user_agent: Option<String>,
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self { timeout: Duration::from_secs(30), user_agent: None }
    }
}

impl HttpClientBuilder {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    pub fn build(self) -> Result<HttpClient, TenantStoreError> {
        let agent = self.user_agent.unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());
        let client = ReqwestClient::builder()
            .timeout(self.timeout)
            .user_agent(agent)
            .build().map_err(|err| TenantStoreError::from(InfraError::from(err)))?;

        Ok(HttpClient { client })
    }
}
