//! # Tenantlink Core
//!
//! Pure logic layer - no infrastructure dependencies.
//!
//! This crate contains:
//! - The tenant store capability (port) implemented by adapters
//! - The lookup policy abstraction and its composition
//!
//! ## Architecture Principles
//! - Only depends on `tenantlink-domain`
//! - No HTTP, caching backend, or platform code
//! - All external dependencies via traits

pub mod policy;
pub mod ports;

pub use policy::{
    lookup_operation, LookupFuture, LookupOperation, LookupPolicy, LookupResult,
    PassThroughPolicy, PolicyContext, PolicyRegistry, PolicyStack, GET_BY_IDENTIFIER_OPERATION,
};
pub use ports::TenantStore;
