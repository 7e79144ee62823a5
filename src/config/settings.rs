//! Configuration settings management
//!
//! This module handles loading configuration from multiple sources
//! and validation. Priority, lowest first: defaults, config file,
//! environment variables, command-line flags.

use crate::error::{Result, VaultfnError};
use crate::utils::validation::{validate_secret_name, validate_vault_name};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_TOKEN_SCOPE: &str = "https://graph.microsoft.com/.default";
pub const DEFAULT_IMDS_ENDPOINT: &str = "http://169.254.169.254/metadata/identity/oauth2/token";
pub const DEFAULT_REFRESH_SKEW_SECS: u64 = 300;
/// Access tokens never live longer than a day, so a wider window disables reuse
pub const MAX_REFRESH_SKEW_SECS: u64 = 24 * 60 * 60;

/// How the handler authenticates to Azure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    /// Platform managed identity (App Service endpoint or IMDS)
    ManagedIdentity,
    /// azure_identity's DefaultAzureCredential chain, for local runs
    Default,
}

impl std::str::FromStr for AuthMethod {
    type Err = VaultfnError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "managed_identity" | "managedidentity" | "msi" => Ok(Self::ManagedIdentity),
            "default" | "defaultazurecredential" => Ok(Self::Default),
            other => Err(VaultfnError::config(format!(
                "Unsupported authentication method: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub method: AuthMethod,
    /// Client id of a user-assigned identity; system-assigned when empty
    pub client_id: Option<String>,
    pub identity_endpoint: Option<String>,
    #[serde(skip_serializing)]
    pub identity_header: Option<String>,
    pub imds_endpoint: String,
    pub token_refresh_skew_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            method: AuthMethod::ManagedIdentity,
            client_id: None,
            identity_endpoint: None,
            identity_header: None,
            imds_endpoint: DEFAULT_IMDS_ENDPOINT.to_string(),
            token_refresh_skew_secs: DEFAULT_REFRESH_SKEW_SECS,
        }
    }
}

impl AuthConfig {
    pub fn token_refresh_skew(&self) -> Duration {
        Duration::from_secs(self.token_refresh_skew_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub debug: bool,
    pub port: u16,
    pub key_vault_name: String,
    pub secret_name: String,
    pub token_scope: String,
    pub auth: AuthConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            debug: false,
            port: DEFAULT_PORT,
            key_vault_name: String::new(),
            secret_name: String::new(),
            token_scope: DEFAULT_TOKEN_SCOPE.to_string(),
            auth: AuthConfig::default(),
        }
    }
}

impl Config {
    /// Names are optional at startup, but must be well-formed when present
    pub fn validate(&self) -> Result<()> {
        if !self.key_vault_name.is_empty() {
            validate_vault_name(&self.key_vault_name)?;
        }

        if !self.secret_name.is_empty() {
            validate_secret_name(&self.secret_name)?;
        }

        if self.token_scope.trim().is_empty() {
            return Err(VaultfnError::config("Token scope must not be empty"));
        }

        if self.auth.identity_endpoint.is_some() != self.auth.identity_header.is_some() {
            return Err(VaultfnError::config(
                "IDENTITY_ENDPOINT and IDENTITY_HEADER must be set together",
            ));
        }

        if self.auth.token_refresh_skew_secs > MAX_REFRESH_SKEW_SECS {
            return Err(VaultfnError::config(format!(
                "Token refresh skew must be at most {} seconds, got {}",
                MAX_REFRESH_SKEW_SECS, self.auth.token_refresh_skew_secs
            )));
        }

        Ok(())
    }

    /// Vault and secret names needed by the secret function
    pub fn secret_target(&self) -> Result<(&str, &str)> {
        if self.key_vault_name.is_empty() {
            return Err(VaultfnError::config("KeyVaultName is not configured"));
        }

        if self.secret_name.is_empty() {
            return Err(VaultfnError::config("SecretName is not configured"));
        }

        Ok((&self.key_vault_name, &self.secret_name))
    }
}

/// Load configuration with priority order:
/// 1. Environment variables
/// 2. Configuration file (when given and present)
/// 3. Default values
///
/// Command-line flags are applied on top by the binary.
pub async fn load_config(path: Option<&Path>) -> Result<Config> {
    let mut config = Config::default();

    if let Some(path) = path {
        if path.exists() {
            config = load_from_file(path).await?;
        } else {
            return Err(VaultfnError::config(format!(
                "Configuration file not found: {}",
                path.display()
            )));
        }
    }

    load_from_env(&mut config, |key| std::env::var(key).ok());

    Ok(config)
}

async fn load_from_file(path: &Path) -> Result<Config> {
    let contents = tokio::fs::read_to_string(path).await?;
    parse_config(&contents)
}

/// Try to parse as TOML first, then JSON as fallback
pub fn parse_config(contents: &str) -> Result<Config> {
    if let Ok(config) = toml::from_str::<Config>(contents) {
        return Ok(config);
    }

    let config = serde_json::from_str::<Config>(contents)?;
    Ok(config)
}

/// Apply environment overrides using `lookup` to read variables
pub fn load_from_env<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = lookup("DEBUG") {
        config.debug = value.to_lowercase() == "true" || value == "1";
    }

    if let Some(value) = lookup("FUNCTIONS_CUSTOMHANDLER_PORT") {
        match value.parse::<u16>() {
            Ok(port) => config.port = port,
            Err(_) => tracing::warn!("Ignoring invalid FUNCTIONS_CUSTOMHANDLER_PORT: {}", value),
        }
    }

    if let Some(value) = lookup("KeyVaultName") {
        config.key_vault_name = value;
    }

    if let Some(value) = lookup("SecretName") {
        config.secret_name = value;
    }

    if let Some(value) = lookup("TokenScope") {
        config.token_scope = value;
    }

    if let Some(value) = lookup("AUTH_METHOD") {
        match value.parse::<AuthMethod>() {
            Ok(method) => config.auth.method = method,
            Err(e) => tracing::warn!("Ignoring AUTH_METHOD: {}", e),
        }
    }

    if let Some(value) = lookup("AZURE_CLIENT_ID").filter(|v| !v.is_empty()) {
        config.auth.client_id = Some(value);
    }

    if let Some(value) = lookup("IDENTITY_ENDPOINT").filter(|v| !v.is_empty()) {
        config.auth.identity_endpoint = Some(value);
    }

    if let Some(value) = lookup("IDENTITY_HEADER").filter(|v| !v.is_empty()) {
        config.auth.identity_header = Some(value);
    }

    if let Some(value) = lookup("AZURE_IMDS_ENDPOINT") {
        config.auth.imds_endpoint = value;
    }

    if let Some(value) = lookup("TOKEN_REFRESH_SKEW") {
        match value.parse::<u64>() {
            Ok(seconds) => config.auth.token_refresh_skew_secs = seconds,
            Err(_) => tracing::warn!("Ignoring invalid TOKEN_REFRESH_SKEW: {}", value),
        }
    }
}
