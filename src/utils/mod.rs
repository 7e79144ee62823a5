//! Utility functions module
//!
//! HTTP client construction, transport error classification, retry with
//! backoff, and Key Vault name validation.

pub mod network;
pub mod retry;
pub mod validation;

pub use network::*;
pub use retry::*;
pub use validation::*;
