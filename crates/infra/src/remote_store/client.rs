//! HTTP lookup client for the tenant context service
//!
//! Resolves tenants with `GET {endpoint}/id/{id}` and
//! `GET {endpoint}/identifier/{identifier}`. Identifier lookups run under the
//! lookup policy registered for the payload type; id lookups do not.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use reqwest::StatusCode;
use tenantlink_core::{lookup_operation, LookupPolicy, PolicyContext, PolicyRegistry};
use tenantlink_domain::{RemoteStoreConfig, RemoteTenantInfo, Result, TenantStoreError};
use tracing::{debug, instrument, warn};

use super::auth::AccessTokenProvider;
use crate::errors::InfraError;
use crate::http::HttpClient;

/// Which lookup endpoint to call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LookupPath {
    Id,
    Identifier,
}

impl LookupPath {
    const fn segment(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Identifier => "identifier",
        }
    }
}

/// Lookup client for payload type `P`
pub struct RemoteStoreClient<P: RemoteTenantInfo> {
    inner: Arc<ClientInner>,
    policy: Arc<dyn LookupPolicy<P>>,
    _payload: PhantomData<fn() -> P>,
}

/// State shared with policy-wrapped operations
struct ClientInner {
    http: HttpClient,
    config: RemoteStoreConfig,
    token_provider: Option<Arc<dyn AccessTokenProvider>>,
}

impl<P: RemoteTenantInfo> RemoteStoreClient<P> {
    /// Create a client, resolving its lookup policy by `P::TYPE_TAG`.
    ///
    /// # Errors
    /// Returns [`TenantStoreError::Config`] if the endpoint is blank or no
    /// policy is registered for the payload type.
    pub fn new(
        http: HttpClient,
        config: RemoteStoreConfig,
        token_provider: Option<Arc<dyn AccessTokenProvider>>,
        policies: &PolicyRegistry<P>,
    ) -> Result<Self> {
        config.validate()?;

        let policy = policies.get(P::TYPE_TAG).ok_or_else(|| {
            TenantStoreError::Config(format!(
                "No lookup policy registered for tenant type '{}'",
                P::TYPE_TAG
            ))
        })?;

        debug!(tenant_type = P::TYPE_TAG, policy = policy.name(), "Remote store client created");

        Ok(Self {
            inner: Arc::new(ClientInner { http, config, token_provider }),
            policy,
            _payload: PhantomData,
        })
    }

    pub fn config(&self) -> &RemoteStoreConfig {
        &self.inner.config
    }

    /// Fetch a tenant by internal id. Not wrapped by the lookup policy.
    ///
    /// # Errors
    /// See [`Self::get_by_identifier`].
    #[instrument(skip(self), fields(tenant_type = P::TYPE_TAG))]
    pub async fn get_by_id(&self, id: &str) -> Result<Option<P>> {
        self.inner.fetch::<P>(LookupPath::Id, id).await
    }

    /// Fetch a tenant by public identifier under the lookup policy.
    ///
    /// # Errors
    /// - [`TenantStoreError::Config`] when authentication is enabled but incomplete
    /// - [`TenantStoreError::Auth`] when no token could be obtained
    /// - [`TenantStoreError::Network`] on transport failure or unexpected status
    /// - [`TenantStoreError::Deserialization`] when the body is not JSON
    /// - any error raised by the policy itself, e.g. [`TenantStoreError::CircuitOpen`]
    #[instrument(skip(self), fields(tenant_type = P::TYPE_TAG, policy = self.policy.name()))]
    pub async fn get_by_identifier(&self, identifier: &str) -> Result<Option<P>> {
        // Misconfiguration is reported as is, never seen by the policy.
        self.inner.config.ensure_can_authenticate()?;

        let context = PolicyContext::for_identifier(identifier);
        let inner = Arc::clone(&self.inner);
        let key = identifier.to_string();

        let operation = lookup_operation(move || {
            let inner = Arc::clone(&inner);
            let key = key.clone();
            async move { inner.fetch::<P>(LookupPath::Identifier, &key).await }
        });

        self.policy.execute(&context, operation).await
    }
}

impl<P: RemoteTenantInfo> fmt::Debug for RemoteStoreClient<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteStoreClient")
            .field("tenant_type", &P::TYPE_TAG)
            .field("endpoint", &self.inner.config.endpoint_base())
            .field("authenticate", &self.inner.config.authenticate)
            .field("policy", &self.policy.name())
            .finish()
    }
}

impl ClientInner {
    async fn fetch<P: RemoteTenantInfo>(&self, path: LookupPath, key: &str) -> Result<Option<P>> {
        // Checked on every call so a misconfigured store fails before any I/O.
        self.config.ensure_can_authenticate()?;

        let url = format!(
            "{}/{}/{}",
            self.config.endpoint_base(),
            path.segment(),
            urlencoding::encode(key)
        );

        let mut request = self.http.get(&url);
        if self.config.authenticate {
            let provider = self.token_provider.as_ref().ok_or_else(|| {
                TenantStoreError::Config(
                    "Authentication is enabled but no access token provider is configured".into(),
                )
            })?;
            request = request.bearer_auth(provider.access_token().await?);
        }

        let response = self.http.send(request).await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            debug!(url = %url, "Tenant not found");
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(url = %url, status = %status, "Tenant lookup failed");
            return Err(status_error(status, &url, &body));
        }

        let body = response.text().await.map_err(|e| TenantStoreError::from(InfraError::from(e)))?;
        parse_payload::<P>(&body)
    }
}

fn status_error(status: StatusCode, url: &str, body: &str) -> TenantStoreError {
    let body = body.trim();
    let message = if body.is_empty() {
        format!("GET {url} returned {status}")
    } else {
        let snippet: String = body.chars().take(200).collect();
        format!("GET {url} returned {status}: {snippet}")
    };
    TenantStoreError::http_status(status.as_u16(), message)
}

/// Turn a successful response body into an optional payload.
///
/// Empty or `null` bodies and JSON of another shape are "not found"; a body
/// that is not JSON at all is a deserialization failure.
fn parse_payload<P: RemoteTenantInfo>(body: &str) -> Result<Option<P>> {
    if body.trim().is_empty() {
        return Ok(None);
    }

    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|e| TenantStoreError::from(InfraError::from(e)))?;
    if value.is_null() {
        return Ok(None);
    }

    match serde_json::from_value::<P>(value) {
        Ok(payload) if payload.id().trim().is_empty() => {
            debug!("Tenant payload has a blank id, treating as not found");
            Ok(None)
        }
        Ok(payload) => Ok(Some(payload)),
        Err(e) => {
            debug!(error = %e, "Response does not match tenant payload shape");
            Ok(None)
        }
    }
}
