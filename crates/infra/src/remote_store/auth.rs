//! Bearer tokens for remote lookups
//!
//! Tokens come from an OAuth 2.0 client-credentials exchange. Nothing is
//! cached: each call discovers the token endpoint and requests a new token.

use async_trait::async_trait;
use tenantlink_common::auth::{ClientCredentials, DiscoveryPolicy, OAuthClient};
use tenantlink_domain::{DiscoverySettings, RemoteStoreConfig, Result, TenantStoreError};
use tracing::{debug, instrument};

use crate::errors::InfraError;
use crate::http::HttpClient;

/// Trait for providing access tokens
///
/// This trait allows dependency injection and testing with mock providers.
#[async_trait]
pub trait AccessTokenProvider: Send + Sync {
    /// Obtain a bearer token for the next request
    async fn access_token(&self) -> Result<String>;
}

/// Client-credentials token provider
pub struct ClientCredentialsTokenProvider {
    oauth: OAuthClient,
    authority: String,
    credentials: ClientCredentials,
}

impl ClientCredentialsTokenProvider {
    pub fn new(
        http: &HttpClient,
        authority: impl Into<String>,
        credentials: ClientCredentials,
        discovery: DiscoverySettings,
    ) -> Self {
        let oauth = OAuthClient::new(http.inner().clone()).with_discovery_policy(DiscoveryPolicy {
            require_https: discovery.require_https,
            validate_issuer_name: discovery.validate_issuer_name,
        });

        Self { oauth, authority: authority.into(), credentials }
    }

    /// Provider using the authentication settings of `config`
    pub fn from_config(http: &HttpClient, config: &RemoteStoreConfig) -> Self {
        let credentials = ClientCredentials::new(
            config.client_id.clone(),
            config.client_secret.clone(),
            Some(config.scope.clone()),
        );
        Self::new(http, config.authority.clone(), credentials, config.discovery)
    }

    fn ensure_configured(&self) -> Result<()> {
        let mut missing = Vec::new();
        if self.authority.trim().is_empty() {
            missing.push("Authority");
        }
        if self.credentials.client_id.trim().is_empty() {
            missing.push("ClientId");
        }
        if self.credentials.client_secret.trim().is_empty() {
            missing.push("ClientSecret");
        }
        if self.credentials.scope.is_none() {
            missing.push("Scope");
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(TenantStoreError::Config(format!(
                "Client credentials are incomplete: {}",
                missing.join(", ")
            )))
        }
    }
}

impl std::fmt::Debug for ClientCredentialsTokenProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCredentialsTokenProvider")
            .field("authority", &self.authority)
            .field("credentials", &self.credentials)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl AccessTokenProvider for ClientCredentialsTokenProvider {
    #[instrument(skip(self), fields(authority = %self.authority, client_id = %self.credentials.client_id))]
    async fn access_token(&self) -> Result<String> {
        self.ensure_configured()?;

        let token = self
            .oauth
            .client_credentials_token(&self.authority, &self.credentials)
            .await
            .map_err(|e| TenantStoreError::from(InfraError::from(e)))?;

        debug!(expires_in = ?token.expires_in, "Obtained access token");
        Ok(token.access_token)
    }
}
