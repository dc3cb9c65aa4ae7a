//! Lookup policies
//!
//! A policy wraps a tenant lookup and decides how it runs: served from a
//! cache, retried, short-circuited. Policies never translate the errors of the
//! lookup they wrap; whatever fails inside propagates to the caller.
//!
//! Policies are composed with [`PolicyStack`] and selected per tenant payload
//! type through a [`PolicyRegistry`].

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use tenantlink_domain::Result;
use tracing::debug;

/// Operation key for by-identifier lookups
pub const GET_BY_IDENTIFIER_OPERATION: &str = "GetByIdentifier-";

/// Outcome of a lookup: found, not found, or failed
pub type LookupResult<T> = Result<Option<T>>;

/// Boxed lookup future
pub type LookupFuture<T> = BoxFuture<'static, LookupResult<T>>;

/// Re-runnable lookup handed to a policy.
///
/// A policy may call it zero times (cache hit), once, or several times
/// (retry). Each call starts a fresh request.
pub type LookupOperation<T> = Arc<dyn Fn() -> LookupFuture<T> + Send + Sync>;

/// Box an async closure into a [`LookupOperation`]
pub fn lookup_operation<T, F, Fut>(f: F) -> LookupOperation<T>
where
    T: 'static,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = LookupResult<T>> + Send + 'static,
{
    Arc::new(move || -> LookupFuture<T> { Box::pin(f()) })
}

/// Execution context passed to a policy
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PolicyContext {
    operation_key: String,
    identifier: String,
}

impl PolicyContext {
    pub fn new(operation_key: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self { operation_key: operation_key.into(), identifier: identifier.into() }
    }

    /// Context for a by-identifier lookup
    pub fn for_identifier(identifier: impl Into<String>) -> Self {
        Self::new(GET_BY_IDENTIFIER_OPERATION, identifier)
    }

    #[must_use]
    pub fn operation_key(&self) -> &str {
        &self.operation_key
    }

    /// The lookup key the operation was invoked with
    #[must_use]
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Key under which results of this operation may be cached
    #[must_use]
    pub fn cache_key(&self) -> String {
        format!("{}{}", self.operation_key, self.identifier)
    }
}

/// Policy applied around a lookup
#[async_trait]
pub trait LookupPolicy<T>: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Run `operation` under this policy.
    ///
    /// # Errors
    /// Returns the operation's error unchanged, or an error produced by the
    /// policy itself (for example an open circuit).
    async fn execute(&self, context: &PolicyContext, operation: LookupOperation<T>)
        -> LookupResult<T>;
}

/// Runs the lookup directly
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThroughPolicy;

#[async_trait]
impl<T> LookupPolicy<T> for PassThroughPolicy
where
    T: Clone + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        "pass-through"
    }

    async fn execute(
        &self,
        _context: &PolicyContext,
        operation: LookupOperation<T>,
    ) -> LookupResult<T> {
        operation().await
    }
}

/// Ordered composition of policies, outermost first.
///
/// `[cache, retry, breaker]` means the cache sees the call first, a cache miss
/// goes through retry, and every attempt passes the breaker.
pub struct PolicyStack<T> {
    policies: Vec<Arc<dyn LookupPolicy<T>>>,
}

impl<T> PolicyStack<T>
where
    T: Clone + Send + Sync + 'static,
{
    #[must_use]
    pub fn new() -> Self {
        Self { policies: Vec::new() }
    }

    /// Append a policy inside the ones already added
    #[must_use]
    pub fn with(mut self, policy: Arc<dyn LookupPolicy<T>>) -> Self {
        self.policies.push(policy);
        self
    }

    pub fn push(&mut self, policy: Arc<dyn LookupPolicy<T>>) {
        self.policies.push(policy);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.policies.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }

    /// Names of the layers, outermost first
    #[must_use]
    pub fn layer_names(&self) -> Vec<&str> {
        self.policies.iter().map(|p| p.name()).collect()
    }
}

impl<T> Default for PolicyStack<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for PolicyStack<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PolicyStack")
            .field("layers", &self.policies.iter().map(|p| p.name()).collect::<Vec<_>>())
            .finish()
    }
}

#[async_trait]
impl<T> LookupPolicy<T> for PolicyStack<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        "stack"
    }

    async fn execute(
        &self,
        context: &PolicyContext,
        operation: LookupOperation<T>,
    ) -> LookupResult<T> {
        // Wrap from the innermost layer outwards.
        let mut wrapped: LookupOperation<T> = operation;
        for policy in self.policies.iter().rev() {
            let policy = Arc::clone(policy);
            let context = context.clone();
            let inner = wrapped;
            wrapped = Arc::new(move || -> LookupFuture<T> {
                let policy = Arc::clone(&policy);
                let context = context.clone();
                let inner = Arc::clone(&inner);
                Box::pin(async move { policy.execute(&context, inner).await })
            });
        }
        wrapped().await
    }
}

/// Explicit mapping from tenant type tag to the policy serving it
pub struct PolicyRegistry<T> {
    policies: HashMap<String, Arc<dyn LookupPolicy<T>>>,
}

impl<T> PolicyRegistry<T>
where
    T: Clone + Send + Sync + 'static,
{
    #[must_use]
    pub fn new() -> Self {
        Self { policies: HashMap::new() }
    }

    /// Register `policy` for `tag`, returning the policy it replaced
    pub fn register(
        &mut self,
        tag: impl Into<String>,
        policy: Arc<dyn LookupPolicy<T>>,
    ) -> Option<Arc<dyn LookupPolicy<T>>> {
        let tag = tag.into();
        debug!(tag = %tag, policy = policy.name(), "Registering lookup policy");
        self.policies.insert(tag, policy)
    }

    /// Builder-style [`Self::register`]
    #[must_use]
    pub fn with(mut self, tag: impl Into<String>, policy: Arc<dyn LookupPolicy<T>>) -> Self {
        self.register(tag, policy);
        self
    }

    #[must_use]
    pub fn get(&self, tag: &str) -> Option<Arc<dyn LookupPolicy<T>>> {
        self.policies.get(tag).cloned()
    }

    #[must_use]
    pub fn contains(&self, tag: &str) -> bool {
        self.policies.contains_key(tag)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.policies.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }
}

impl<T> Default for PolicyRegistry<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for PolicyRegistry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut tags: Vec<&String> = self.policies.keys().collect();
        tags.sort();
        f.debug_struct("PolicyRegistry").field("tags", &tags).finish()
    }
}
