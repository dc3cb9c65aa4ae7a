//! Tenant store adapter over [`RemoteStoreClient`]

use std::sync::Arc;

use async_trait::async_trait;
use tenantlink_core::TenantStore;
use tenantlink_domain::{
    to_tenant_record, RemoteStoreConfig, RemoteTenantInfo, Result, StoreOperation, TenantRecord,
    TenantStoreError,
};
use tracing::{debug, warn};

use super::auth::{AccessTokenProvider, ClientCredentialsTokenProvider};
use super::client::RemoteStoreClient;
use crate::http::HttpClient;
use crate::policies::default_policy_registry;

/// Identifier browsers request on their own; never a tenant.
pub const RESERVED_IDENTIFIER: &str = "favicon.ico";

/// Read-only [`TenantStore`] resolving tenants through a remote service.
#[derive(Debug)]
pub struct RemoteStore<P: RemoteTenantInfo> {
    client: RemoteStoreClient<P>,
}

impl<P: RemoteTenantInfo> RemoteStore<P> {
    pub fn new(client: RemoteStoreClient<P>) -> Self {
        Self { client }
    }

    /// Build transport, token provider, default policies and client from
    /// `config`.
    ///
    /// Authentication settings are not checked here; lookups report them.
    ///
    /// # Errors
    /// Returns [`TenantStoreError::Config`] for an invalid endpoint, timeout
    /// or policy settings.
    pub fn from_config(config: RemoteStoreConfig) -> Result<Self> {
        config.validate()?;
        config.log_config();

        let http = HttpClient::builder().timeout(config.request_timeout()).build()?;

        let token_provider: Option<Arc<dyn AccessTokenProvider>> = if config.authenticate {
            Some(Arc::new(ClientCredentialsTokenProvider::from_config(&http, &config)))
        } else {
            None
        };

        let registry = default_policy_registry::<P>(&config.policy)?;
        let client = RemoteStoreClient::new(http, config, token_provider, &registry)?;
        Ok(Self::new(client))
    }

    pub fn client(&self) -> &RemoteStoreClient<P> {
        &self.client
    }

    fn refuse(operation: StoreOperation) -> TenantStoreError {
        warn!(operation = %operation, tenant_type = P::TYPE_TAG, "Write attempted on remote tenant store");
        TenantStoreError::unsupported(operation)
    }
}

#[async_trait]
impl<P: RemoteTenantInfo> TenantStore for RemoteStore<P> {
    async fn try_get(&self, id: &str) -> Result<Option<TenantRecord>> {
        if id.trim().is_empty() {
            return Ok(None);
        }

        let payload = self.client.get_by_id(id).await?;
        Ok(to_tenant_record(payload.as_ref()))
    }

    async fn try_get_by_identifier(&self, identifier: &str) -> Result<Option<TenantRecord>> {
        if identifier.trim().is_empty() {
            return Ok(None);
        }
        if identifier.eq_ignore_ascii_case(RESERVED_IDENTIFIER) {
            debug!(identifier, "Ignoring reserved identifier");
            return Ok(None);
        }

        let payload = self.client.get_by_identifier(identifier).await?;
        Ok(to_tenant_record(payload.as_ref()))
    }

    async fn try_add(&self, _tenant: &TenantRecord) -> Result<bool> {
        Err(Self::refuse(StoreOperation::Add))
    }

    async fn try_remove(&self, _identifier: &str) -> Result<bool> {
        Err(Self::refuse(StoreOperation::Remove))
    }

    async fn try_update(&self, _tenant: &TenantRecord) -> Result<bool> {
        Err(Self::refuse(StoreOperation::Update))
    }
}
