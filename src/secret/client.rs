//! Key Vault secret retrieval over the REST API
//!
//! Tokens come from the configured [`AzureAuthProvider`]; every call is a
//! plain authenticated `GET`. Nothing is retried or cached here.

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, StatusCode};
use std::sync::Arc;

use crate::auth::provider::AzureAuthProvider;
use crate::error::{Result, VaultfnError};
use crate::secret::models::KeyVaultSecret;
use crate::utils::network::{classify_network_error, create_http_client, NetworkConfig};
use crate::utils::validation::{validate_secret_name, validate_vault_name};

pub const KEY_VAULT_SCOPE: &str = "https://vault.azure.net/.default";
pub const KEY_VAULT_API_VERSION: &str = "7.4";

/// Build the data-plane URL of a vault
pub fn vault_url(vault_name: &str) -> Result<String> {
    validate_vault_name(vault_name)?;
    Ok(format!("https://{}.vault.azure.net", vault_name))
}

pub struct SecretClient {
    vault_url: String,
    auth_provider: Arc<dyn AzureAuthProvider>,
    http_client: Client,
}

impl SecretClient {
    /// Create a client for the named vault
    pub fn new(vault_name: &str, auth_provider: Arc<dyn AzureAuthProvider>) -> Result<Self> {
        Self::with_vault_url(vault_url(vault_name)?, auth_provider)
    }

    /// Create a client for an explicit vault URL
    pub fn with_vault_url<S: Into<String>>(
        vault_url: S,
        auth_provider: Arc<dyn AzureAuthProvider>,
    ) -> Result<Self> {
        let http_client = create_http_client(&NetworkConfig::default())?;

        Ok(Self {
            vault_url: vault_url.into().trim_end_matches('/').to_string(),
            auth_provider,
            http_client,
        })
    }

    pub fn vault_url(&self) -> &str {
        &self.vault_url
    }

    /// Fetch a secret, latest version unless `version` is given
    pub async fn get_secret(&self, secret_name: &str, version: Option<&str>) -> Result<KeyVaultSecret> {
        validate_secret_name(secret_name)?;

        let secret_url = match version {
            Some(version) => {
                validate_secret_name(version)?;
                format!(
                    "{}/secrets/{}/{}?api-version={}",
                    self.vault_url, secret_name, version, KEY_VAULT_API_VERSION
                )
            }
            None => format!(
                "{}/secrets/{}?api-version={}",
                self.vault_url, secret_name, KEY_VAULT_API_VERSION
            ),
        };

        let token = self.auth_provider.get_token(&[KEY_VAULT_SCOPE]).await?;

        let mut headers = HeaderMap::new();
        let mut bearer = HeaderValue::from_str(&format!("Bearer {}", token.token.secret()))
            .map_err(|e| VaultfnError::authentication(format!("Invalid token format: {}", e)))?;
        bearer.set_sensitive(true);
        headers.insert(AUTHORIZATION, bearer);

        tracing::debug!(secret = secret_name, vault = %self.vault_url, "Fetching secret");

        let response = self
            .http_client
            .get(&secret_url)
            .headers(headers)
            .send()
            .await
            .map_err(|e| classify_network_error(&e, "Azure Key Vault", &secret_url))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(match status {
                StatusCode::NOT_FOUND => VaultfnError::secret_not_found(secret_name),
                StatusCode::FORBIDDEN if error_text.contains("SecretDisabled") => {
                    VaultfnError::secret_disabled(secret_name)
                }
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    VaultfnError::permission_denied(format!(
                        "Access to secret '{}' denied: HTTP {} - {}",
                        secret_name, status, error_text
                    ))
                }
                _ => VaultfnError::azure_api(format!(
                    "Failed to get secret '{}': HTTP {} - {}",
                    secret_name, status, error_text
                )),
            });
        }

        let secret: KeyVaultSecret = response.json().await.map_err(|e| {
            VaultfnError::serialization(format!("Failed to parse secret response: {}", e))
        })?;

        if !secret.attributes.enabled {
            return Err(VaultfnError::secret_disabled(secret_name));
        }

        Ok(secret)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vault_url() {
        assert_eq!(vault_url("prod-kv").unwrap(), "https://prod-kv.vault.azure.net");
        assert!(matches!(
            vault_url("attacker.example.com#"),
            Err(VaultfnError::InvalidVaultName { .. })
        ));
    }
}
