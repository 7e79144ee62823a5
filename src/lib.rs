//! vaultfn - Azure Functions custom handler
//!
//! Serves two HTTP trigger functions that authenticate with the platform
//! managed identity: one returns an access token for a resource, the other
//! returns a secret read from Azure Key Vault.

pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
pub mod handler;
pub mod secret;
pub mod utils;

// Re-export commonly used types
pub use error::{Result, VaultfnError};
