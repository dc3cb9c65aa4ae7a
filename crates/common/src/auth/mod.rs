//! OAuth 2.0 client-credentials infrastructure
//!
//! Service-to-service authentication against an OpenID Connect authority:
//!
//! ```text
//! ┌──────────────┐  GET /.well-known/openid-configuration  ┌───────────┐
//! │ OAuthClient  │ ──────────────────────────────────────► │ authority │
//! │              │  POST token_endpoint (client_credentials)│           │
//! └──────────────┘ ──────────────────────────────────────► └───────────┘
//! ```
//!
//! # Module Organization
//!
//! - **[`types`]**: wire types (`TokenResponse`, `OAuthError`,
//!   `DiscoveryDocument`) and settings (`ClientCredentials`,
//!   `DiscoveryPolicy`)
//! - **[`discovery`]**: discovery URL construction and document validation
//! - **[`client`]**: the HTTP client performing discovery and token exchange

pub mod client;
pub mod discovery;
pub mod types;

pub use client::{OAuthClient, OAuthClientError};
pub use types::{ClientCredentials, DiscoveryDocument, DiscoveryPolicy, OAuthError, TokenResponse};
