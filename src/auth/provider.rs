//! Authentication provider trait and implementations
//!
//! This module defines the authentication provider trait used by the
//! function handlers and the factory that picks an implementation from
//! configuration.

use async_trait::async_trait;
use azure_core::auth::{AccessToken, TokenCredential};
use azure_identity::{DefaultAzureCredential, TokenCredentialOptions};
use std::sync::Arc;

use crate::auth::managed_identity::ManagedIdentityProvider;
use crate::config::{AuthConfig, AuthMethod};
use crate::error::{Result, VaultfnError};

/// Trait for Azure authentication providers
#[async_trait]
pub trait AzureAuthProvider: Send + Sync {
    /// Get an access token for the specified scopes
    async fn get_token(&self, scopes: &[&str]) -> Result<AccessToken>;

    /// Forget any tokens held in memory
    async fn clear_cache(&self) -> Result<()>;
}

/// Default Azure Credential Provider using DefaultAzureCredential
///
/// Lets the handler run outside Azure, e.g. with an Azure CLI login.
pub struct DefaultAzureCredentialProvider {
    credential: Arc<DefaultAzureCredential>,
}

impl DefaultAzureCredentialProvider {
    /// Create a new DefaultAzureCredentialProvider
    pub fn new() -> Result<Self> {
        let credential = Arc::new(
            DefaultAzureCredential::create(TokenCredentialOptions::default()).map_err(|e| {
                VaultfnError::authentication(format!(
                    "Failed to create DefaultAzureCredential: {}",
                    e
                ))
            })?,
        );

        Ok(Self { credential })
    }
}

#[async_trait]
impl AzureAuthProvider for DefaultAzureCredentialProvider {
    async fn get_token(&self, scopes: &[&str]) -> Result<AccessToken> {
        let token_response = self
            .credential
            .get_token(scopes)
            .await
            .map_err(|e| VaultfnError::authentication(format!("Failed to get token: {}", e)))?;

        Ok(token_response)
    }

    async fn clear_cache(&self) -> Result<()> {
        // The credential chain manages its own token cache
        Ok(())
    }
}

/// Authentication provider factory
pub struct AuthProviderFactory;

impl AuthProviderFactory {
    /// Create an authentication provider based on configuration
    pub fn create_provider(config: &AuthConfig) -> Result<Arc<dyn AzureAuthProvider>> {
        match config.method {
            AuthMethod::ManagedIdentity => {
                Ok(Arc::new(ManagedIdentityProvider::from_config(config)?))
            }
            AuthMethod::Default => {
                tracing::info!("Using DefaultAzureCredential");
                Ok(Arc::new(DefaultAzureCredentialProvider::new()?))
            }
        }
    }
}
