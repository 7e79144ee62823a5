//! Shared test helpers

#![allow(dead_code)]

use async_trait::async_trait;
use azure_core::auth::AccessToken;
use parking_lot::Mutex;
use time::OffsetDateTime;
use vaultfn::auth::AzureAuthProvider;
use vaultfn::{Result, VaultfnError};

/// Auth provider returning a fixed token and recording requested scopes
pub struct StaticTokenProvider {
    token: Option<String>,
    pub scopes: Mutex<Vec<String>>,
}

impl StaticTokenProvider {
    pub fn new(token: &str) -> Self {
        Self {
            token: Some(token.to_string()),
            scopes: Mutex::new(Vec::new()),
        }
    }

    /// A provider whose identity is not available
    pub fn failing() -> Self {
        Self {
            token: None,
            scopes: Mutex::new(Vec::new()),
        }
    }

    pub fn requested_scopes(&self) -> Vec<String> {
        self.scopes.lock().clone()
    }
}

#[async_trait]
impl AzureAuthProvider for StaticTokenProvider {
    async fn get_token(&self, scopes: &[&str]) -> Result<AccessToken> {
        self.scopes
            .lock()
            .extend(scopes.iter().map(|s| s.to_string()));

        match &self.token {
            Some(token) => Ok(AccessToken::new(
                token.clone(),
                OffsetDateTime::now_utc() + time::Duration::hours(1),
            )),
            None => Err(VaultfnError::authentication(
                "Managed identity endpoint returned HTTP 400 - identity not found",
            )),
        }
    }

    async fn clear_cache(&self) -> Result<()> {
        Ok(())
    }
}

pub const SECRET_BUNDLE: &str = r#"{
    "value": "s3cr3t-value",
    "id": "https://prod-kv.vault.azure.net/secrets/db-password/4387e9f3d6e14c459867679a90fd0f79",
    "attributes": {"enabled": true, "created": 1493938410, "updated": 1493938410}
}"#;

pub const DISABLED_SECRET_BUNDLE: &str = r#"{
    "value": "old-value",
    "id": "https://prod-kv.vault.azure.net/secrets/db-password/4387e9f3d6e14c459867679a90fd0f79",
    "attributes": {"enabled": false, "created": 1493938410, "updated": 1493938410}
}"#;
