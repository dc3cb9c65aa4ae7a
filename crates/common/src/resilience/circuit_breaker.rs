//! Circuit breaker for guarding calls to an unreliable dependency
//!
//! The breaker counts consecutive failures. Once the failure threshold is
//! reached the circuit opens and calls are rejected without running the
//! operation. After the open timeout a single trial call is let through
//! (half-open): success closes the circuit, failure re-opens it.
//!
//! Callers decide which errors count as failures. Errors that do not count
//! leave the failure streak untouched.
//!
//! An admitted call holds a permit until it settles. A call dropped before
//! completing (cancelled, timed out by the caller) counts as a failure, so an
//! abandoned trial call re-opens the circuit instead of holding the half-open
//! slot forever.
//!
//! State lives behind a `std::sync::Mutex` that is only held for bookkeeping,
//! never across the awaited operation.

use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, info, instrument, warn};

//==============================================================================
// Time Abstraction for Testability
//==============================================================================

/// Source of monotonic time so open-timeout behavior can be tested without
/// sleeping.
pub trait Clock: Send + Sync + 'static {
    /// Current instant (monotonic time)
    fn now(&self) -> Instant;
}

/// Real system clock implementation for production use
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

impl<T: Clock> Clock for Arc<T> {
    fn now(&self) -> Instant {
        (**self).now()
    }
}

/// Manually advanced clock for deterministic tests
#[derive(Debug, Clone)]
pub struct MockClock {
    start: Instant,
    elapsed: Arc<Mutex<Duration>>,
}

impl MockClock {
    /// Create a new mock clock starting at the current instant
    pub fn new() -> Self {
        Self { start: Instant::now(), elapsed: Arc::new(Mutex::new(Duration::ZERO)) }
    }

    /// Advance the mock clock by a duration
    pub fn advance(&self, duration: Duration) {
        if let Ok(mut elapsed) = self.elapsed.lock() {
            *elapsed += duration;
        }
    }

    /// Time advanced so far
    pub fn elapsed(&self) -> Duration {
        self.elapsed.lock().map(|e| *e).unwrap_or(Duration::ZERO)
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MockClock {
    fn now(&self) -> Instant {
        self.start + self.elapsed()
    }
}

//==============================================================================
// Error Types
//==============================================================================

/// Invalid breaker configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },
}

/// Errors produced by a guarded call
///
/// Generic over the operation error `E` so callers get their own error back
/// untouched in [`ResilienceError::OperationFailed`].
#[derive(Debug, Error)]
pub enum ResilienceError<E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    /// Circuit breaker is open, rejecting calls
    #[error("Circuit breaker is open, rejecting calls")]
    CircuitOpen,

    /// The underlying operation failed
    #[error("Operation failed: {source}")]
    OperationFailed {
        #[source]
        source: E,
    },
}

impl<E> ResilienceError<E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    /// Unwrap the operation error, mapping a rejected call with `on_open`.
    pub fn into_inner_or(self, on_open: impl FnOnce() -> E) -> E {
        match self {
            Self::CircuitOpen => on_open(),
            Self::OperationFailed { source } => source,
        }
    }
}

/// Result type for resilience operations
pub type ResilienceResult<T, E> = Result<T, ResilienceError<E>>;

/// Configuration result type
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Circuit breaker states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Circuit is closed, allowing requests
    Closed,
    /// Circuit is open, rejecting requests
    Open,
    /// Circuit is half-open, allowing limited requests to test recovery
    HalfOpen,
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed => write!(f, "CLOSED"),
            Self::Open => write!(f, "OPEN"),
            Self::HalfOpen => write!(f, "HALF_OPEN"),
        }
    }
}

/// Configuration for circuit breaker behavior
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures before opening the circuit
    pub failure_threshold: u64,
    /// Time to wait before transitioning from open to half-open
    pub timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self { failure_threshold: 5, timeout: Duration::from_secs(30) }
    }
}

impl CircuitBreakerConfig {
    /// Create a configuration builder
    pub fn builder() -> CircuitBreakerConfigBuilder {
        CircuitBreakerConfigBuilder::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if self.failure_threshold == 0 {
            return Err(ConfigError::Invalid {
                message: "failure_threshold must be greater than 0".to_string(),
            });
        }

        Ok(())
    }
}

/// Builder for [`CircuitBreakerConfig`]
#[derive(Debug, Default)]
pub struct CircuitBreakerConfigBuilder {
    config: CircuitBreakerConfig,
}

impl CircuitBreakerConfigBuilder {
    pub fn failure_threshold(mut self, threshold: u64) -> Self {
        self.config.failure_threshold = threshold;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn build(self) -> ConfigResult<CircuitBreakerConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Snapshot of breaker counters for monitoring
#[derive(Debug, Clone)]
pub struct CircuitBreakerMetrics {
    pub state: CircuitState,
    pub consecutive_failures: u64,
    pub total_calls: u64,
    pub rejected_calls: u64,
    pub opened_at: Option<Instant>,
}

#[derive(Debug)]
struct BreakerState {
    state: CircuitState,
    consecutive_failures: u64,
    trial_in_flight: bool,
    total_calls: u64,
    rejected_calls: u64,
    opened_at: Option<Instant>,
}

impl BreakerState {
    const fn closed() -> Self {
        Self {
            state: CircuitState::Closed,
            consecutive_failures: 0,
            trial_in_flight: false,
            total_calls: 0,
            rejected_calls: 0,
            opened_at: None,
        }
    }
}

/// How an admitted call ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Success,
    Failure,
    /// Failed with an error the caller does not count against the dependency
    Neutral,
}

/// Admission to run one call. Settles as a failure if dropped unsettled.
struct Permit<'a, C: Clock> {
    breaker: &'a CircuitBreaker<C>,
    trial: bool,
    settled: bool,
}

impl<C: Clock> Permit<'_, C> {
    fn settle(mut self, outcome: Outcome) {
        self.settled = true;
        self.breaker.record(outcome, self.trial);
    }
}

impl<C: Clock> Drop for Permit<'_, C> {
    fn drop(&mut self) {
        if !self.settled {
            debug!(trial = self.trial, "Guarded call dropped before completing");
            self.breaker.record(Outcome::Failure, self.trial);
        }
    }
}

/// Async circuit breaker, cheap to clone (clones share state)
pub struct CircuitBreaker<C: Clock = SystemClock> {
    config: CircuitBreakerConfig,
    inner: Arc<Mutex<BreakerState>>,
    clock: Arc<C>,
}

impl<C: Clock> fmt::Debug for CircuitBreaker<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("config", &self.config)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl<C: Clock> Clone for CircuitBreaker<C> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            inner: Arc::clone(&self.inner),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<C: Clock> CircuitBreaker<C> {
    /// Create a circuit breaker reading time from `clock`
    pub fn with_clock(config: CircuitBreakerConfig, clock: C) -> ConfigResult<Self> {
        config.validate()?;

        Ok(Self {
            config,
            inner: Arc::new(Mutex::new(BreakerState::closed())),
            clock: Arc::new(clock),
        })
    }

    /// Run `operation` if the circuit allows it and record the outcome.
    ///
    /// Only errors for which `is_failure` returns `true` count towards
    /// opening the circuit; other errors are handed back without touching the
    /// failure streak.
    #[instrument(skip(self, operation, is_failure), fields(state = %self.state()))]
    pub async fn execute<F, Fut, T, E, P>(
        &self,
        operation: F,
        is_failure: P,
    ) -> ResilienceResult<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::error::Error + Send + Sync + 'static,
        P: FnOnce(&E) -> bool,
    {
        let Some(permit) = self.try_acquire() else {
            debug!("Circuit breaker rejecting call");
            return Err(ResilienceError::CircuitOpen);
        };

        match operation().await {
            Ok(value) => {
                permit.settle(Outcome::Success);
                Ok(value)
            }
            Err(error) => {
                if is_failure(&error) {
                    permit.settle(Outcome::Failure);
                    debug!(error = %error, "Circuit breaker: operation failed");
                } else {
                    permit.settle(Outcome::Neutral);
                    debug!(error = %error, "Circuit breaker: error not counted");
                }
                Err(ResilienceError::OperationFailed { source: error })
            }
        }
    }

    /// Current state, moving Open to HalfOpen when the timeout elapsed
    pub fn state(&self) -> CircuitState {
        let mut inner = self.lock();
        self.maybe_half_open(&mut inner);
        inner.state
    }

    /// Snapshot of the breaker counters
    pub fn metrics(&self) -> CircuitBreakerMetrics {
        let inner = self.lock();
        CircuitBreakerMetrics {
            state: inner.state,
            consecutive_failures: inner.consecutive_failures,
            total_calls: inner.total_calls,
            rejected_calls: inner.rejected_calls,
            opened_at: inner.opened_at,
        }
    }

    /// Reset the circuit breaker to closed state
    pub fn reset(&self) {
        *self.lock() = BreakerState::closed();
        info!("Circuit breaker reset");
    }

    fn try_acquire(&self) -> Option<Permit<'_, C>> {
        let mut inner = self.lock();
        self.maybe_half_open(&mut inner);

        let trial = match inner.state {
            CircuitState::Closed => Some(false),
            CircuitState::HalfOpen if !inner.trial_in_flight => {
                inner.trial_in_flight = true;
                Some(true)
            }
            CircuitState::HalfOpen | CircuitState::Open => None,
        };

        match trial {
            Some(trial) => {
                inner.total_calls += 1;
                Some(Permit { breaker: self, trial, settled: false })
            }
            None => {
                inner.rejected_calls += 1;
                None
            }
        }
    }

    fn record(&self, outcome: Outcome, trial: bool) {
        let mut inner = self.lock();
        if trial {
            inner.trial_in_flight = false;
        }

        match (inner.state, outcome) {
            (CircuitState::Closed, Outcome::Success) => inner.consecutive_failures = 0,
            (CircuitState::Closed, Outcome::Failure) => {
                inner.consecutive_failures += 1;
                if inner.consecutive_failures >= self.config.failure_threshold {
                    self.open(&mut inner);
                }
            }
            (CircuitState::HalfOpen, Outcome::Success) if trial => {
                let total = inner.total_calls;
                let rejected = inner.rejected_calls;
                *inner = BreakerState::closed();
                inner.total_calls = total;
                inner.rejected_calls = rejected;
                info!("Circuit breaker closed after successful trial call");
            }
            (CircuitState::HalfOpen, Outcome::Failure) if trial => {
                inner.consecutive_failures += 1;
                self.open(&mut inner);
            }
            // Neutral outcomes, and calls admitted before the last state
            // change finishing late.
            _ => {}
        }
    }

    fn open(&self, inner: &mut BreakerState) {
        inner.state = CircuitState::Open;
        inner.opened_at = Some(self.clock.now());
        inner.trial_in_flight = false;
        warn!(failures = inner.consecutive_failures, "Circuit breaker opened");
    }

    fn maybe_half_open(&self, inner: &mut BreakerState) {
        if inner.state != CircuitState::Open {
            return;
        }
        let Some(opened_at) = inner.opened_at else {
            return;
        };
        if self.clock.now().saturating_duration_since(opened_at) >= self.config.timeout {
            inner.state = CircuitState::HalfOpen;
            inner.trial_in_flight = false;
            debug!("Circuit breaker half-open");
        }
    }

    fn lock(&self) -> MutexGuard<'_, BreakerState> {
        // Bookkeeping never panics while holding the lock; recover the data
        // if a caller panicked elsewhere.
        self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
