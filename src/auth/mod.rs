//! Authentication module for Azure services
//!
//! This module provides access tokens for Azure resources using the
//! platform managed identity, or DefaultAzureCredential when running
//! locally.

pub mod cache;
pub mod managed_identity;
pub mod provider;

pub use cache::TokenCache;
pub use managed_identity::*;
pub use provider::*;
