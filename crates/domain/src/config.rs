//! Remote store configuration
//!
//! Plain data: loading from env/files lives in `tenantlink-infra`.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, TenantStoreError};

/// Default per-request transport timeout (30 seconds)
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default TTL for cached lookups (5 minutes)
pub const DEFAULT_CACHE_TTL_SECS: u64 = 300;

/// Default max capacity for the lookup cache (1000 entries)
pub const DEFAULT_CACHE_MAX_CAPACITY: u64 = 1000;

/// Settings for reaching the tenant context endpoint and its authority.
///
/// `Debug` output never contains the client secret.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteStoreConfig {
    /// Base URL of the tenant context service
    pub context_endpoint_url: String,

    /// Attach a bearer token to lookups
    pub authenticate: bool,

    /// OpenID Connect authority issuing tokens
    pub authority: String,
    pub client_id: String,
    pub client_secret: String,
    pub scope: String,

    pub request_timeout_secs: u64,
    pub discovery: DiscoverySettings,
    pub policy: PolicySettings,
}

impl Default for RemoteStoreConfig {
    fn default() -> Self {
        Self {
            context_endpoint_url: String::new(),
            authenticate: false,
            authority: String::new(),
            client_id: String::new(),
            client_secret: String::new(),
            scope: String::new(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            discovery: DiscoverySettings::default(),
            policy: PolicySettings::default(),
        }
    }
}

impl fmt::Debug for RemoteStoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteStoreConfig")
            .field("context_endpoint_url", &self.context_endpoint_url)
            .field("authenticate", &self.authenticate)
            .field("authority", &self.authority)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("scope", &self.scope)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("discovery", &self.discovery)
            .field("policy", &self.policy)
            .finish()
    }
}

impl RemoteStoreConfig {
    /// Unauthenticated config for `context_endpoint_url`
    pub fn new(context_endpoint_url: impl Into<String>) -> Self {
        Self { context_endpoint_url: context_endpoint_url.into(), ..Self::default() }
    }

    /// Enable bearer authentication with client credentials
    #[must_use]
    pub fn with_authentication(
        mut self,
        authority: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        scope: impl Into<String>,
    ) -> Self {
        self.authenticate = true;
        self.authority = authority.into();
        self.client_id = client_id.into();
        self.client_secret = client_secret.into();
        self.scope = scope.into();
        self
    }

    #[must_use]
    pub fn with_policy(mut self, policy: PolicySettings) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Context endpoint with trailing slashes removed
    #[must_use]
    pub fn endpoint_base(&self) -> &str {
        self.context_endpoint_url.trim().trim_end_matches('/')
    }

    /// Names of the authentication settings that are blank
    #[must_use]
    pub fn missing_auth_settings(&self) -> Vec<&'static str> {
        [
            ("Authority", &self.authority),
            ("ClientId", &self.client_id),
            ("ClientSecret", &self.client_secret),
            ("Scope", &self.scope),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect()
    }

    /// Fail fast when authentication is enabled but not fully configured.
    ///
    /// # Errors
    /// Returns [`TenantStoreError::Config`] naming the blank settings.
    pub fn ensure_can_authenticate(&self) -> Result<()> {
        if !self.authenticate {
            return Ok(());
        }
        let missing = self.missing_auth_settings();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(TenantStoreError::Config(format!(
                "The remote store is set to use authentication but is missing required \
                 configuration values: {}",
                missing.join(", ")
            )))
        }
    }

    /// Check the settings every store needs regardless of authentication.
    ///
    /// # Errors
    /// Returns [`TenantStoreError::Config`] for a blank endpoint or zero timeout.
    pub fn validate(&self) -> Result<()> {
        if self.endpoint_base().is_empty() {
            return Err(TenantStoreError::Config("context_endpoint_url is required".into()));
        }
        if self.request_timeout_secs == 0 {
            return Err(TenantStoreError::Config(
                "request_timeout_secs must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    /// Log non-secret settings
    pub fn log_config(&self) {
        tracing::info!(
            endpoint = %self.endpoint_base(),
            authenticate = self.authenticate,
            authority = %self.authority,
            client_id = %self.client_id,
            request_timeout_secs = self.request_timeout_secs,
            cache_enabled = self.policy.cache.enabled,
            cache_ttl_secs = self.policy.cache.ttl_secs,
            retry_max_attempts = self.policy.retry.max_attempts,
            circuit_breaker_enabled = self.policy.circuit_breaker.enabled,
            "Remote tenant store configuration loaded"
        );
    }
}

/// Rules applied to the authority's discovery document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoverySettings {
    /// HTTPS required for authority and token endpoint (loopback exempt)
    pub require_https: bool,

    /// Discovery `issuer` must match the authority
    pub validate_issuer_name: bool,
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self { require_https: true, validate_issuer_name: true }
    }
}

/// Policy applied around by-identifier lookups
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicySettings {
    pub cache: CacheSettings,
    pub retry: RetrySettings,
    pub circuit_breaker: CircuitBreakerSettings,
}

/// Lookup cache settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub enabled: bool,
    pub ttl_secs: u64,
    pub max_capacity: u64,

    /// Remember confirmed misses as well as hits
    pub cache_not_found: bool,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: DEFAULT_CACHE_TTL_SECS,
            max_capacity: DEFAULT_CACHE_MAX_CAPACITY,
            cache_not_found: true,
        }
    }
}

impl CacheSettings {
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// Retry settings for transient lookup failures
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Total attempts including the first; 1 disables retrying
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self { max_attempts: 3, initial_backoff_ms: 100, max_backoff_ms: 2000 }
    }
}

impl RetrySettings {
    #[must_use]
    pub const fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    #[must_use]
    pub const fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }
}

/// Circuit breaker settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerSettings {
    pub enabled: bool,

    /// Consecutive failures before the circuit opens
    pub failure_threshold: u64,

    /// How long the circuit stays open before a trial call
    pub open_timeout_secs: u64,
}

impl Default for CircuitBreakerSettings {
    fn default() -> Self {
        Self { enabled: true, failure_threshold: 5, open_timeout_secs: 30 }
    }
}

impl CircuitBreakerSettings {
    #[must_use]
    pub const fn open_timeout(&self) -> Duration {
        Duration::from_secs(self.open_timeout_secs)
    }
}
