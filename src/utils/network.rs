use crate::error::{Result, VaultfnError};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, StatusCode};
use std::time::Duration;

/// Configuration for HTTP client with proper timeouts
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub user_agent: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            user_agent: format!("vaultfn/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Create a properly configured HTTP client with timeouts
pub fn create_http_client(config: &NetworkConfig) -> Result<Client> {
    Client::builder()
        .connect_timeout(config.connect_timeout)
        .timeout(config.request_timeout)
        .user_agent(&config.user_agent)
        .build()
        .map_err(|e| VaultfnError::network(format!("Failed to create HTTP client: {}", e)))
}

/// Classify a transport failure talking to `service` at `url`
pub fn classify_network_error(error: &reqwest::Error, service: &str, url: &str) -> VaultfnError {
    let host = extract_host(url);

    if error.is_timeout() {
        return VaultfnError::connection_timeout(format!(
            "Request to {} at '{}' timed out",
            service, host
        ));
    }

    if error.is_connect() {
        if error
            .to_string()
            .to_lowercase()
            .contains("connection refused")
        {
            return VaultfnError::connection_refused(format!(
                "Connection to {} at '{}' was refused",
                service, host
            ));
        }

        return VaultfnError::network(format!(
            "Failed to connect to {} at '{}': {}",
            service, host, error
        ));
    }

    VaultfnError::network(format!(
        "Network error when calling {} at '{}': {}",
        service, host, error
    ))
}

/// Whether an identity endpoint status is worth another attempt.
///
/// IMDS answers 404 and 410 while an identity is still being provisioned.
pub fn is_transient_status(status: StatusCode) -> bool {
    matches!(status.as_u16(), 404 | 408 | 410 | 429 | 500..=599)
}

/// Parse a `Retry-After` header given in delta-seconds
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

fn extract_host(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|parsed| parsed.host_str().map(|h| h.to_string()))
        .unwrap_or_else(|| "unknown-host".to_string())
}

/// Check if an error is retryable
pub fn is_retryable_error(error: &VaultfnError) -> bool {
    match error {
        VaultfnError::Transient { .. } => true,
        VaultfnError::ConnectionTimeout(_) => true,
        VaultfnError::NetworkError(_) => true,
        VaultfnError::ConnectionRefused(_) => false, // usually persistent
        _ => false,
    }
}
