//! # Tenantlink Domain
//!
//! Domain types and models for Tenantlink.
//!
//! This crate contains:
//! - Tenant records and the remote wire payload they are mapped from
//! - Domain error types and Result definitions
//! - Configuration structures
//!
//! ## Architecture
//! - No dependencies on other Tenantlink crates
//! - No I/O; pure domain models and data structures

pub mod config;
pub mod errors;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
