//! Resilience patterns for fault tolerance
//!
//! This module provides **generic, reusable** building blocks:
//! - **Circuit Breaker**: stops calling a dependency that keeps failing and
//!   probes it again after a cool-down
//! - **Retry Logic**: configurable retry with exponential backoff and jitter
//!
//! Both are generic over the operation error type and know nothing about
//! tenants or HTTP. Domain-specific policies (which errors are transient,
//! what a rejected call turns into) are layered on top in `tenantlink-infra`.

pub mod circuit_breaker;
pub mod retry;

// Re-export circuit breaker types
pub use circuit_breaker::{
    CircuitBreaker, CircuitBreakerConfig, CircuitBreakerConfigBuilder, CircuitBreakerMetrics,
    CircuitState, Clock, ConfigError, ConfigResult, MockClock, ResilienceError, ResilienceResult,
    SystemClock,
};
// Re-export retry types
pub use retry::{
    policies, BackoffStrategy, Jitter, RetryConfig, RetryConfigBuilder,
    RetryDecision, RetryError, RetryExecutor, RetryPolicy, RetryResult,
};
