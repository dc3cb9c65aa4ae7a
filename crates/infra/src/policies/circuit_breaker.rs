//! Circuit breaker policy for lookups

use async_trait::async_trait;
use tenantlink_common::resilience::{
    CircuitBreaker, CircuitBreakerConfig, CircuitBreakerMetrics, CircuitState, Clock, SystemClock,
};
use tenantlink_core::{LookupOperation, LookupPolicy, LookupResult, PolicyContext};
use tenantlink_domain::{CircuitBreakerSettings, Result, TenantStoreError};
use tracing::warn;

/// Stops calling the tenant service after repeated failures.
///
/// Only transient errors (see [`TenantStoreError::is_retryable`]) count
/// towards opening the circuit. Rejected calls fail with
/// [`TenantStoreError::CircuitOpen`]; errors of admitted calls are returned
/// unchanged.
#[derive(Debug, Clone)]
pub struct CircuitBreakerPolicy<C: Clock = SystemClock> {
    breaker: CircuitBreaker<C>,
}

impl CircuitBreakerPolicy<SystemClock> {
    /// # Errors
    /// Returns [`TenantStoreError::Config`] for a zero failure threshold.
    pub fn new(settings: &CircuitBreakerSettings) -> Result<Self> {
        Self::with_clock(settings, SystemClock)
    }
}

impl<C: Clock> CircuitBreakerPolicy<C> {
    /// Create the policy with a custom clock (useful for testing)
    ///
    /// # Errors
    /// Returns [`TenantStoreError::Config`] for a zero failure threshold.
    pub fn with_clock(settings: &CircuitBreakerSettings, clock: C) -> Result<Self> {
        let config = CircuitBreakerConfig::builder()
            .failure_threshold(settings.failure_threshold)
            .timeout(settings.open_timeout())
            .build()
            .map_err(|e| TenantStoreError::Config(e.to_string()))?;

        let breaker = CircuitBreaker::with_clock(config, clock)
            .map_err(|e| TenantStoreError::Config(e.to_string()))?;

        Ok(Self { breaker })
    }

    pub fn state(&self) -> CircuitState {
        self.breaker.state()
    }

    pub fn metrics(&self) -> CircuitBreakerMetrics {
        self.breaker.metrics()
    }

    pub fn reset(&self) {
        self.breaker.reset();
    }
}

#[async_trait]
impl<T, C> LookupPolicy<T> for CircuitBreakerPolicy<C>
where
    T: Clone + Send + Sync + 'static,
    C: Clock,
{
    fn name(&self) -> &str {
        "circuit-breaker"
    }

    async fn execute(
        &self,
        context: &PolicyContext,
        operation: LookupOperation<T>,
    ) -> LookupResult<T> {
        self.breaker.execute(|| operation(), TenantStoreError::is_retryable).await.map_err(|e| {
            e.into_inner_or(|| {
                warn!(key = %context.cache_key(), "Circuit open, lookup rejected");
                TenantStoreError::CircuitOpen
            })
        })
    }
}
