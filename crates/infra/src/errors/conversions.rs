//! Conversions from external infrastructure errors into domain errors.

use reqwest::Error as HttpError;
use tenantlink_common::auth::OAuthClientError;
use tenantlink_domain::TenantStoreError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub TenantStoreError);

impl From<InfraError> for TenantStoreError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<TenantStoreError> for InfraError {
    fn from(value: TenantStoreError) -> Self {
        InfraError(value)
    }
}

/// Extension trait to make the conversion logic explicit in tests and within
/// this module.
trait IntoStoreError {
    fn into_store_error(self) -> TenantStoreError;
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → TenantStoreError */
/* -------------------------------------------------------------------------- */

impl IntoStoreError for HttpError {
    fn into_store_error(self) -> TenantStoreError {
        let url = self.url().map(ToString::to_string).unwrap_or_else(|| "<unknown>".into());

        if self.is_timeout() {
            return TenantStoreError::network(format!("request to {url} timed out"));
        }
        if self.is_connect() {
            return TenantStoreError::network(format!("failed to connect to {url}: {self}"));
        }
        if self.is_builder() {
            return TenantStoreError::Config(format!("invalid request: {self}"));
        }
        if self.is_decode() {
            return TenantStoreError::Deserialization(format!(
                "failed to decode response from {url}: {self}"
            ));
        }
        if let Some(status) = self.status() {
            return TenantStoreError::http_status(
                status.as_u16(),
                format!("{url} responded with {status}"),
            );
        }
        TenantStoreError::network(format!("http error: {self}"))
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_store_error())
    }
}

/* -------------------------------------------------------------------------- */
/* OAuthClientError → TenantStoreError */
/* -------------------------------------------------------------------------- */

impl IntoStoreError for OAuthClientError {
    fn into_store_error(self) -> TenantStoreError {
        TenantStoreError::Auth(self.to_string())
    }
}

impl From<OAuthClientError> for InfraError {
    fn from(value: OAuthClientError) -> Self {
        InfraError(value.into_store_error())
    }
}

/* -------------------------------------------------------------------------- */
/* serde_json::Error → TenantStoreError */
/* -------------------------------------------------------------------------- */

impl IntoStoreError for serde_json::Error {
    fn into_store_error(self) -> TenantStoreError {
        TenantStoreError::Deserialization(format!(
            "invalid JSON at line {} column {}: {self}",
            self.line(),
            self.column()
        ))
    }
}

impl From<serde_json::Error> for InfraError {
    fn from(value: serde_json::Error) -> Self {
        InfraError(value.into_store_error())
    }
}
