//! Read-only tenant store backed by a remote tenant context service
//!
//! ```text
//! RemoteStore ──► lookup policy (by identifier only) ──► RemoteStoreClient
//!                                                          │
//!                                                          ├─► AccessTokenProvider
//!                                                          └─► GET {endpoint}/id/{id}
//!                                                              GET {endpoint}/identifier/{identifier}
//! ```

pub mod auth;
pub mod client;
pub mod store;

pub use auth::{AccessTokenProvider, ClientCredentialsTokenProvider};
pub use client::RemoteStoreClient;
pub use store::{RemoteStore, RESERVED_IDENTIFIER};
