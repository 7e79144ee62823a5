//! CLI module for vaultfn
//!
//! Argument parsing for the handler binary and command execution.

pub mod commands;

pub use commands::*;
