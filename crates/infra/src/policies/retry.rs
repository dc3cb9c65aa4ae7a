//! Retry policy for transient lookup failures

use async_trait::async_trait;
use tenantlink_common::resilience::policies::PredicateRetry;
use tenantlink_common::resilience::{RetryConfig, RetryError, RetryExecutor};
use tenantlink_core::{LookupOperation, LookupPolicy, LookupResult, PolicyContext};
use tenantlink_domain::{Result, RetrySettings, TenantStoreError};
use tracing::debug;

const BACKOFF_BASE: f64 = 2.0;

/// Retries only errors that report themselves as retryable
type TransientErrors = PredicateRetry<fn(&TenantStoreError) -> bool>;

/// Retries transient lookup failures with exponential backoff.
///
/// When the attempts run out, or the error is not transient, the last lookup
/// error is returned as is.
#[derive(Debug, Clone)]
pub struct RetryLookupPolicy {
    executor: RetryExecutor<TransientErrors>,
}

impl RetryLookupPolicy {
    /// # Errors
    /// Returns [`TenantStoreError::Config`] if `max_attempts` is zero.
    pub fn new(settings: &RetrySettings) -> Result<Self> {
        let config = RetryConfig::builder()
            .max_attempts(settings.max_attempts)
            .exponential_backoff(settings.initial_backoff(), BACKOFF_BASE, settings.max_backoff())
            .equal_jitter()
            .build()
            .map_err(|e| match e {
                RetryError::InvalidConfiguration { message } => TenantStoreError::Config(message),
                _ => TenantStoreError::Config("invalid retry settings".into()),
            })?;

        Ok(Self::with_config(config))
    }

    pub fn with_config(config: RetryConfig) -> Self {
        let policy: TransientErrors =
            PredicateRetry::new(TenantStoreError::is_retryable as fn(&TenantStoreError) -> bool);
        Self { executor: RetryExecutor::new(config, policy) }
    }

    pub const fn max_attempts(&self) -> u32 {
        self.executor.config().max_attempts
    }
}

#[async_trait]
impl<T> LookupPolicy<T> for RetryLookupPolicy
where
    T: Clone + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        "retry"
    }

    async fn execute(
        &self,
        context: &PolicyContext,
        operation: LookupOperation<T>,
    ) -> LookupResult<T> {
        self.executor.execute(|| operation()).await.map_err(|e| {
            debug!(key = %context.cache_key(), error = %e, "Lookup gave up");
            e.into_operation_error().unwrap_or_else(|| {
                TenantStoreError::Internal("retry finished without a lookup error".into())
            })
        })
    }
}
