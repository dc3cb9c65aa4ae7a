//! # Tenantlink Infrastructure
//!
//! Infrastructure implementations of core ports.
//!
//! This crate contains:
//! - The HTTP transport handle and error conversions
//! - Configuration loading from environment and files
//! - The remote tenant store: credential provider, lookup client, adapter
//! - Concrete lookup policies (cache, retry, circuit breaker)
//!
//! ## Architecture
//! - Implements traits defined in `tenantlink-core`
//! - Depends on `tenantlink-common`, `tenantlink-domain` and `tenantlink-core`
//! - Contains all "impure" code (network I/O, clocks, caches)

pub mod config;
pub mod errors;
pub mod http;
pub mod policies;
pub mod remote_store;

// Re-export commonly used items
pub use errors::InfraError;
pub use http::{HttpClient, HttpClientBuilder};
pub use policies::{
    default_policy_registry, policy_stack_from_settings, CachePolicy, CachedEntry,
    CircuitBreakerPolicy, RetryLookupPolicy,
};
pub use remote_store::{
    AccessTokenProvider, ClientCredentialsTokenProvider, RemoteStore, RemoteStoreClient,
    RESERVED_IDENTIFIER,
};
