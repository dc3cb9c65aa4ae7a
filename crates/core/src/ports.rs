//! Tenant store port

use async_trait::async_trait;
use tenantlink_domain::{Result, TenantRecord};

/// Read/write tenant store capability consumed by tenant resolution.
///
/// Lookups return `Ok(None)` when no tenant matches. Write methods return
/// whether the store accepted the change; stores that cannot accept writes
/// return an error instead of `Ok(false)`.
#[async_trait]
pub trait TenantStore: Send + Sync {
    /// Find a tenant by internal id
    async fn try_get(&self, id: &str) -> Result<Option<TenantRecord>>;

    /// Find a tenant by public identifier
    async fn try_get_by_identifier(&self, identifier: &str) -> Result<Option<TenantRecord>>;

    async fn try_add(&self, tenant: &TenantRecord) -> Result<bool>;

    async fn try_remove(&self, identifier: &str) -> Result<bool>;

    async fn try_update(&self, tenant: &TenantRecord) -> Result<bool>;
}
