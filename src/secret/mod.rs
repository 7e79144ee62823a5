//! Secret retrieval module
//!
//! Reads secrets from Azure Key Vault with a managed identity token.

pub mod client;
pub mod models;

pub use client::*;
pub use models::*;
