//! OAuth 2.0 client-credentials types
//!
//! Wire structures exchanged with an authorization server and the settings
//! needed to talk to it.

use std::fmt;

use serde::Deserialize;

/// Credentials a service uses to authenticate as itself
///
/// `Debug` output never contains the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientCredentials {
    /// OAuth client ID
    pub client_id: String,

    /// OAuth client secret
    pub client_secret: String,

    /// Space-separated scopes to request; omitted from the request when `None`
    pub scope: Option<String>,
}

impl ClientCredentials {
    /// Create credentials, treating a blank scope as "no scope"
    #[must_use]
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        scope: Option<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            scope: scope.filter(|s| !s.trim().is_empty()),
        }
    }
}

impl fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("scope", &self.scope)
            .finish()
    }
}

/// Rules applied to a discovery document before it is trusted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscoveryPolicy {
    /// Authority and token endpoint must use HTTPS (loopback hosts exempt)
    pub require_https: bool,

    /// The document's `issuer` must match the authority
    pub validate_issuer_name: bool,
}

impl Default for DiscoveryPolicy {
    fn default() -> Self {
        Self { require_https: true, validate_issuer_name: true }
    }
}

/// Subset of the OpenID Connect discovery document
///
/// Only `issuer` and `token_endpoint` are read; everything else is ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct DiscoveryDocument {
    pub issuer: Option<String>,
    pub token_endpoint: Option<String>,
}

/// OAuth token response from authorization server
///
/// Standard OAuth 2.0 token response format (RFC 6749 §5.1).
#[derive(Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: Option<String>,
    pub expires_in: Option<u64>,
    pub scope: Option<String>,
}

impl fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenResponse")
            .field("access_token", &"[REDACTED]")
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .field("scope", &self.scope)
            .finish()
    }
}

/// OAuth error response from authorization server
///
/// Standard OAuth 2.0 error response format (RFC 6749 §5.2).
#[derive(Debug, Clone, Deserialize)]
pub struct OAuthError {
    pub error: String,
    pub error_description: Option<String>,
}

impl fmt::Display for OAuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.error_description {
            Some(desc) => write!(f, "{}: {}", self.error, desc),
            None => write!(f, "{}", self.error),
        }
    }
}

impl std::error::Error for OAuthError {}
