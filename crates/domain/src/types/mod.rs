//! Tenant data types

pub mod remote;
pub mod tenant;

pub use remote::{to_tenant_record, RemoteTenantInfo, RemoteTenantPayload};
pub use tenant::{TenantItems, TenantRecord};
