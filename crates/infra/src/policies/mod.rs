//! Concrete lookup policies
//!
//! The default stack for by-identifier lookups is, outermost first:
//!
//! ```text
//! cache ──► retry ──► circuit breaker ──► HTTP lookup
//! ```
//!
//! A cache hit never reaches the network. A miss is retried on transient
//! errors, and every attempt passes the breaker, so an open circuit stops
//! retries immediately.

pub mod cache;
pub mod circuit_breaker;
pub mod retry;

use std::sync::Arc;

use tenantlink_core::{PolicyRegistry, PolicyStack};
use tenantlink_domain::{PolicySettings, RemoteTenantInfo, Result};

pub use cache::{CachePolicy, CachedEntry};
pub use circuit_breaker::CircuitBreakerPolicy;
pub use retry::RetryLookupPolicy;

/// Build the policy stack described by `settings`.
///
/// Disabled layers are left out; with everything disabled the stack simply
/// runs the lookup.
///
/// # Errors
/// Returns `TenantStoreError::Config` for invalid retry or breaker settings.
pub fn policy_stack_from_settings<T>(settings: &PolicySettings) -> Result<PolicyStack<T>>
where
    T: Clone + Send + Sync + 'static,
{
    let mut stack = PolicyStack::new();

    if settings.cache.enabled {
        stack.push(Arc::new(CachePolicy::<T>::new(&settings.cache)));
    }
    if settings.retry.max_attempts > 1 {
        stack.push(Arc::new(RetryLookupPolicy::new(&settings.retry)?));
    }
    if settings.circuit_breaker.enabled {
        stack.push(Arc::new(CircuitBreakerPolicy::new(&settings.circuit_breaker)?));
    }

    tracing::debug!(layers = ?stack.layer_names(), "Lookup policy stack built");
    Ok(stack)
}

/// Registry holding the settings-derived stack under `P::TYPE_TAG`.
///
/// # Errors
/// See [`policy_stack_from_settings`].
pub fn default_policy_registry<P: RemoteTenantInfo>(
    settings: &PolicySettings,
) -> Result<PolicyRegistry<P>> {
    let stack = policy_stack_from_settings::<P>(settings)?;
    Ok(PolicyRegistry::new().with(P::TYPE_TAG, Arc::new(stack)))
}
