//! Error types used throughout the tenant store

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Write operations a read-only store refuses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreOperation {
    Add,
    Remove,
    Update,
}

impl StoreOperation {
    /// Verb used in the refusal message
    #[must_use]
    pub const fn verb(self) -> &'static str {
        match self {
            Self::Add => "create",
            Self::Remove => "delete",
            Self::Update => "edit",
        }
    }
}

impl fmt::Display for StoreOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Add => "add",
            Self::Remove => "remove",
            Self::Update => "update",
        };
        f.write_str(name)
    }
}

/// Coarse classification of a [`TenantStoreError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    Configuration,
    Authentication,
    Network,
    Deserialization,
    UnsupportedOperation,
    Policy,
    Internal,
}

/// Main error type for tenant store operations
///
/// "Not found" is not an error: lookups return `Ok(None)` for it.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "detail")]
pub enum TenantStoreError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Network error: {message}")]
    Network { message: String, status: Option<u16> },

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("A remote store should not be able to {} tenants", .operation.verb())]
    Unsupported { operation: StoreOperation },

    #[error("Circuit breaker is open, rejecting lookups")]
    CircuitOpen,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl TenantStoreError {
    /// Transport failure without an HTTP status
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network { message: message.into(), status: None }
    }

    /// Non-success HTTP status
    pub fn http_status(status: u16, message: impl Into<String>) -> Self {
        Self::Network { message: message.into(), status: Some(status) }
    }

    #[must_use]
    pub const fn unsupported(operation: StoreOperation) -> Self {
        Self::Unsupported { operation }
    }

    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) => ErrorKind::Configuration,
            Self::Auth(_) => ErrorKind::Authentication,
            Self::Network { .. } => ErrorKind::Network,
            Self::Deserialization(_) => ErrorKind::Deserialization,
            Self::Unsupported { .. } => ErrorKind::UnsupportedOperation,
            Self::CircuitOpen => ErrorKind::Policy,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Only transport failures are worth another attempt.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Network { .. })
    }

    /// HTTP status carried by a network failure, if any
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Network { status, .. } => *status,
            _ => None,
        }
    }
}

/// Result type alias for tenant store operations
pub type Result<T> = std::result::Result<T, TenantStoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_messages_name_the_operation() {
        assert_eq!(
            TenantStoreError::unsupported(StoreOperation::Add).to_string(),
            "A remote store should not be able to create tenants"
        );
        assert_eq!(
            TenantStoreError::unsupported(StoreOperation::Remove).to_string(),
            "A remote store should not be able to delete tenants"
        );
        assert_eq!(
            TenantStoreError::unsupported(StoreOperation::Update).to_string(),
            "A remote store should not be able to edit tenants"
        );
    }

    #[test]
    fn only_network_errors_retry() {
        assert!(TenantStoreError::network("reset").is_retryable());
        assert!(TenantStoreError::http_status(503, "unavailable").is_retryable());
        assert!(!TenantStoreError::Config("x".into()).is_retryable());
        assert!(!TenantStoreError::Auth("x".into()).is_retryable());
        assert!(!TenantStoreError::Deserialization("x".into()).is_retryable());
        assert!(!TenantStoreError::CircuitOpen.is_retryable());
    }

    #[test]
    fn kinds_and_status() {
        let err = TenantStoreError::http_status(502, "bad gateway");
        assert_eq!(err.kind(), ErrorKind::Network);
        assert_eq!(err.status(), Some(502));
        assert_eq!(TenantStoreError::CircuitOpen.kind(), ErrorKind::Policy);
        assert_eq!(
            TenantStoreError::unsupported(StoreOperation::Update).kind(),
            ErrorKind::UnsupportedOperation
        );
    }

    #[test]
    fn errors_serialize_with_type_tag() {
        let json = serde_json::to_value(TenantStoreError::Config("missing".into())).unwrap();
        assert_eq!(json["type"], "Config");
        assert_eq!(json["detail"], "missing");
    }
}
