//! Managed identity token acquisition
//!
//! Talks to the identity endpoint the hosting platform exposes:
//! the App Service / Functions endpoint when `IDENTITY_ENDPOINT` and
//! `IDENTITY_HEADER` are present, otherwise the VM instance metadata
//! service (IMDS).
//!
//! See <https://learn.microsoft.com/azure/app-service/overview-managed-identity#rest-endpoint-reference>

use async_trait::async_trait;
use azure_core::auth::AccessToken;
use reqwest::Client;
use serde::Deserialize;
use time::OffsetDateTime;
use url::Url;

use crate::auth::cache::TokenCache;
use crate::auth::provider::AzureAuthProvider;
use crate::config::AuthConfig;
use crate::error::{Result, VaultfnError};
use crate::utils::network::{
    classify_network_error, create_http_client, is_transient_status, parse_retry_after,
    NetworkConfig,
};
use crate::utils::retry::{retry_with_backoff, RetryOptions};

const APP_SERVICE_API_VERSION: &str = "2019-08-01";
const IMDS_API_VERSION: &str = "2018-02-01";
const DEFAULT_SCOPE_SUFFIX: &str = "/.default";

/// Where managed identity tokens come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManagedIdentitySource {
    /// App Service and Azure Functions
    AppService { endpoint: String, header: String },
    /// Azure VM instance metadata service
    Imds { endpoint: String },
}

impl ManagedIdentitySource {
    pub fn name(&self) -> &'static str {
        match self {
            Self::AppService { .. } => "app_service",
            Self::Imds { .. } => "imds",
        }
    }

    fn endpoint(&self) -> &str {
        match self {
            Self::AppService { endpoint, .. } => endpoint,
            Self::Imds { endpoint } => endpoint,
        }
    }
}

/// Selector for a user-assigned identity. Only one may be sent per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManagedIdentityId {
    ClientId(String),
    ObjectId(String),
    ResourceId(String),
}

impl ManagedIdentityId {
    /// Query parameter for this selector, which differs per source
    fn query_pair<'a>(&'a self, source: &ManagedIdentitySource) -> (&'static str, &'a str) {
        match (self, source) {
            (Self::ClientId(id), _) => ("client_id", id.as_str()),
            (Self::ObjectId(id), ManagedIdentitySource::AppService { .. }) => {
                ("principal_id", id.as_str())
            }
            (Self::ObjectId(id), ManagedIdentitySource::Imds { .. }) => ("object_id", id.as_str()),
            (Self::ResourceId(id), ManagedIdentitySource::AppService { .. }) => {
                ("mi_res_id", id.as_str())
            }
            (Self::ResourceId(id), ManagedIdentitySource::Imds { .. }) => ("msi_res_id", id.as_str()),
        }
    }
}

// `expires_on` is unix seconds, sent as a string by both endpoints
// and as a number by some emulators.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(i64),
    Text(String),
}

impl NumberOrString {
    fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_on: Option<NumberOrString>,
    expires_in: Option<NumberOrString>,
}

impl TokenResponse {
    fn into_access_token(self, now: OffsetDateTime) -> Result<AccessToken> {
        let expires_on = if let Some(unix) = self.expires_on.as_ref().and_then(|v| v.as_i64()) {
            OffsetDateTime::from_unix_timestamp(unix).map_err(|e| {
                VaultfnError::serialization(format!("Invalid expires_on in token response: {}", e))
            })?
        } else if let Some(seconds) = self.expires_in.as_ref().and_then(|v| v.as_i64()) {
            now.checked_add(time::Duration::seconds(seconds))
                .ok_or_else(|| {
                    VaultfnError::serialization(format!(
                        "expires_in out of range in token response: {}",
                        seconds
                    ))
                })?
        } else {
            return Err(VaultfnError::serialization(
                "Token response carries neither expires_on nor expires_in",
            ));
        };

        Ok(AccessToken::new(self.access_token, expires_on))
    }
}

/// Convert a single `.default` scope into the resource the endpoints expect
pub fn scopes_to_resource(scopes: &[&str]) -> Result<String> {
    match scopes {
        [scope] => {
            let scope = scope.trim();
            if scope.is_empty() {
                return Err(VaultfnError::invalid_argument("Scope must not be empty"));
            }
            Ok(scope
                .strip_suffix(DEFAULT_SCOPE_SUFFIX)
                .unwrap_or(scope)
                .to_string())
        }
        _ => Err(VaultfnError::invalid_argument(format!(
            "Managed identity accepts exactly one scope, got {}",
            scopes.len()
        ))),
    }
}

/// Token provider backed by the platform managed identity
pub struct ManagedIdentityProvider {
    http_client: Client,
    source: ManagedIdentitySource,
    identity: Option<ManagedIdentityId>,
    cache: TokenCache,
    retry: RetryOptions,
}

impl ManagedIdentityProvider {
    pub fn new(source: ManagedIdentitySource, config: &AuthConfig) -> Result<Self> {
        let http_client = create_http_client(&NetworkConfig::default())?;

        Ok(Self {
            http_client,
            source,
            identity: config.client_id.clone().map(ManagedIdentityId::ClientId),
            cache: TokenCache::new(config.token_refresh_skew()),
            retry: RetryOptions::default(),
        })
    }

    /// Pick the source from configuration: App Service when both the
    /// endpoint and header are known, IMDS otherwise
    pub fn from_config(config: &AuthConfig) -> Result<Self> {
        let source = match (&config.identity_endpoint, &config.identity_header) {
            (Some(endpoint), Some(header)) => ManagedIdentitySource::AppService {
                endpoint: endpoint.clone(),
                header: header.clone(),
            },
            _ => ManagedIdentitySource::Imds {
                endpoint: config.imds_endpoint.clone(),
            },
        };

        tracing::info!(source = source.name(), "Using managed identity credential");
        Self::new(source, config)
    }

    pub fn with_identity(mut self, identity: ManagedIdentityId) -> Self {
        self.identity = Some(identity);
        self
    }

    pub fn with_retry_options(mut self, retry: RetryOptions) -> Self {
        self.retry = retry;
        self
    }

    pub fn source(&self) -> &ManagedIdentitySource {
        &self.source
    }

    fn token_url(&self, resource: &str) -> Result<Url> {
        let api_version = match self.source {
            ManagedIdentitySource::AppService { .. } => APP_SERVICE_API_VERSION,
            ManagedIdentitySource::Imds { .. } => IMDS_API_VERSION,
        };

        let mut params = vec![("api-version", api_version), ("resource", resource)];
        if let Some(identity) = &self.identity {
            params.push(identity.query_pair(&self.source));
        }

        Ok(Url::parse_with_params(self.source.endpoint(), &params)?)
    }

    async fn request_token(&self, resource: &str) -> Result<AccessToken> {
        let url = self.token_url(resource)?;

        let request = match &self.source {
            ManagedIdentitySource::AppService { header, .. } => self
                .http_client
                .get(url.clone())
                .header("X-IDENTITY-HEADER", header),
            ManagedIdentitySource::Imds { .. } => {
                self.http_client.get(url.clone()).header("Metadata", "true")
            }
        };

        let response = request
            .send()
            .await
            .map_err(|e| classify_network_error(&e, "managed identity endpoint", url.as_str()))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = parse_retry_after(response.headers());
            let error_text = response.text().await.unwrap_or_default();
            let message = format!(
                "Managed identity endpoint returned HTTP {} - {}",
                status, error_text
            );

            if is_transient_status(status) {
                return Err(VaultfnError::transient(message, retry_after));
            }
            return Err(VaultfnError::authentication(message));
        }

        let body: TokenResponse = response.json().await.map_err(|e| {
            VaultfnError::serialization(format!("Failed to parse token response: {}", e))
        })?;

        body.into_access_token(OffsetDateTime::now_utc())
    }
}

#[async_trait]
impl AzureAuthProvider for ManagedIdentityProvider {
    async fn get_token(&self, scopes: &[&str]) -> Result<AccessToken> {
        let resource = scopes_to_resource(scopes)?;

        self.cache
            .get_or_fetch(&resource, || async {
                tracing::debug!(
                    resource = %resource,
                    source = self.source.name(),
                    "Requesting managed identity token"
                );
                retry_with_backoff(|| self.request_token(&resource), self.retry.clone()).await
            })
            .await
    }

    async fn clear_cache(&self) -> Result<()> {
        self.cache.clear();
        Ok(())
    }
}
