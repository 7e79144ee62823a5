//! Azure Key Vault naming rules
//!
//! Names are checked before any request is built so that a bad
//! `KeyVaultName` or `SecretName` never turns into an arbitrary URL.

use crate::error::{Result, VaultfnError};
use regex::Regex;

const MAX_SECRET_NAME_LENGTH: usize = 127;
const MIN_VAULT_NAME_LENGTH: usize = 3;
const MAX_VAULT_NAME_LENGTH: usize = 24;

/// Check if a name is a valid Key Vault secret name (1-127 of `0-9a-zA-Z-`)
pub fn is_valid_secret_name(name: &str) -> Result<bool> {
    if name.is_empty() || name.len() > MAX_SECRET_NAME_LENGTH {
        return Ok(false);
    }

    let re = Regex::new(r"^[a-zA-Z0-9-]+$")?;
    Ok(re.is_match(name))
}

/// Check if a name is a valid Key Vault name
///
/// 3-24 characters, letters, digits and hyphens only, starting with a letter,
/// ending with a letter or digit, and without consecutive hyphens.
pub fn is_valid_vault_name(name: &str) -> Result<bool> {
    if name.len() < MIN_VAULT_NAME_LENGTH || name.len() > MAX_VAULT_NAME_LENGTH {
        return Ok(false);
    }

    if name.contains("--") {
        return Ok(false);
    }

    let re = Regex::new(r"^[a-zA-Z][a-zA-Z0-9-]*[a-zA-Z0-9]$")?;
    Ok(re.is_match(name))
}

pub fn validate_secret_name(name: &str) -> Result<()> {
    if is_valid_secret_name(name)? {
        Ok(())
    } else {
        Err(VaultfnError::invalid_secret_name(name))
    }
}

pub fn validate_vault_name(name: &str) -> Result<()> {
    if is_valid_vault_name(name)? {
        Ok(())
    } else {
        Err(VaultfnError::invalid_vault_name(name))
    }
}
