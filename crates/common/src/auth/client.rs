//! OAuth 2.0 client-credentials client
//!
//! Handles the two network steps of a service-to-service token request:
//! - discovery of the token endpoint from the authority
//! - exchange of client credentials for an access token
//!
//! The client keeps no token state; every call is an independent exchange.

use reqwest::{Client, StatusCode};
use tracing::{debug, instrument};
use url::Url;

use super::discovery;
use super::types::{ClientCredentials, DiscoveryDocument, DiscoveryPolicy, OAuthError, TokenResponse};

/// Error type for OAuth client operations
#[derive(Debug)]
pub enum OAuthClientError {
    /// HTTP request failed
    RequestFailed(reqwest::Error),

    /// Discovery document could not be fetched or failed validation
    Discovery(String),

    /// OAuth server returned an error
    OAuthError(OAuthError),

    /// Failed to parse response
    ParseError(String),

    /// Token type other than `Bearer`
    UnsupportedTokenType(String),
}

impl std::fmt::Display for OAuthClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RequestFailed(e) => write!(f, "HTTP request failed: {e}"),
            Self::Discovery(msg) => write!(f, "Discovery failed: {msg}"),
            Self::OAuthError(e) => write!(f, "OAuth error: {e}"),
            Self::ParseError(msg) => write!(f, "Parse error: {msg}"),
            Self::UnsupportedTokenType(ty) => write!(f, "Unsupported token type: {ty}"),
        }
    }
}

impl std::error::Error for OAuthClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::RequestFailed(e) => Some(e),
            Self::OAuthError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for OAuthClientError {
    fn from(err: reqwest::Error) -> Self {
        Self::RequestFailed(err)
    }
}

/// OAuth 2.0 client for the client-credentials grant (RFC 6749 §4.4)
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct OAuthClient {
    client: Client,
    discovery_policy: DiscoveryPolicy,
}

impl OAuthClient {
    /// Create a client on top of a shared `reqwest::Client`
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client, discovery_policy: DiscoveryPolicy::default() }
    }

    /// Override the discovery policy
    #[must_use]
    pub const fn with_discovery_policy(mut self, policy: DiscoveryPolicy) -> Self {
        self.discovery_policy = policy;
        self
    }

    /// Discovery policy in use
    #[must_use]
    pub const fn discovery_policy(&self) -> &DiscoveryPolicy {
        &self.discovery_policy
    }

    /// Locate the token endpoint published by `authority`
    ///
    /// # Errors
    /// Returns [`OAuthClientError::Discovery`] if the authority is invalid, the
    /// document cannot be fetched or parsed, or it fails the discovery policy.
    #[instrument(skip(self))]
    pub async fn discover_token_endpoint(&self, authority: &str) -> Result<Url, OAuthClientError> {
        let authority = discovery::parse_authority(authority, &self.discovery_policy)
            .map_err(OAuthClientError::Discovery)?;
        let url = discovery::discovery_url(&authority);

        debug!(url = %url, "Fetching discovery document");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| OAuthClientError::Discovery(format!("Error connecting to {url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(OAuthClientError::Discovery(format!(
                "Error connecting to {url}: {status}"
            )));
        }

        let document: DiscoveryDocument = response.json().await.map_err(|e| {
            OAuthClientError::Discovery(format!("Invalid discovery document from {url}: {e}"))
        })?;

        discovery::token_endpoint(&document, &authority, &self.discovery_policy)
            .map_err(OAuthClientError::Discovery)
    }

    /// Exchange client credentials for an access token at `token_endpoint`
    ///
    /// # Errors
    /// Returns [`OAuthClientError::OAuthError`] with the server's error text when
    /// the exchange is refused, [`OAuthClientError::RequestFailed`] on transport
    /// failure and [`OAuthClientError::ParseError`] /
    /// [`OAuthClientError::UnsupportedTokenType`] for unusable responses.
    #[instrument(skip(self, credentials), fields(client_id = %credentials.client_id))]
    pub async fn request_token(
        &self,
        token_endpoint: &Url,
        credentials: &ClientCredentials,
    ) -> Result<TokenResponse, OAuthClientError> {
        let mut form: Vec<(&str, &str)> = vec![
            ("grant_type", "client_credentials"),
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.as_str()),
        ];
        if let Some(scope) = credentials.scope.as_deref() {
            form.push(("scope", scope));
        }

        let response = self.client.post(token_endpoint.clone()).form(&form).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(token_error(status, &body));
        }

        let token: TokenResponse =
            response.json().await.map_err(|e| OAuthClientError::ParseError(e.to_string()))?;

        if let Some(token_type) = token.token_type.as_deref() {
            if !token_type.eq_ignore_ascii_case("bearer") {
                return Err(OAuthClientError::UnsupportedTokenType(token_type.to_string()));
            }
        }
        if token.access_token.is_empty() {
            return Err(OAuthClientError::ParseError("empty access_token".to_string()));
        }

        debug!(expires_in = ?token.expires_in, "Access token issued");
        Ok(token)
    }

    /// Discover the token endpoint and exchange credentials in one call
    ///
    /// # Errors
    /// See [`Self::discover_token_endpoint`] and [`Self::request_token`].
    pub async fn client_credentials_token(
        &self,
        authority: &str,
        credentials: &ClientCredentials,
    ) -> Result<TokenResponse, OAuthClientError> {
        let token_endpoint = self.discover_token_endpoint(authority).await?;
        self.request_token(&token_endpoint, credentials).await
    }
}

fn token_error(status: StatusCode, body: &str) -> OAuthClientError {
    match serde_json::from_str::<OAuthError>(body) {
        Ok(error) => OAuthClientError::OAuthError(error),
        Err(_) if body.trim().is_empty() => {
            OAuthClientError::ParseError(format!("token endpoint returned status {status}"))
        }
        Err(_) => OAuthClientError::ParseError(format!(
            "token endpoint returned status {status}: {}",
            body.trim()
        )),
    }
}
