//! Managed identity provider tests
//!
//! Runs the provider against a mock identity endpoint.

use httpmock::prelude::*;
use std::sync::Arc;
use std::time::Duration;

use vaultfn::auth::{AzureAuthProvider, ManagedIdentityProvider, ManagedIdentitySource};
use vaultfn::config::AuthConfig;
use vaultfn::utils::RetryOptions;
use vaultfn::VaultfnError;

const IDENTITY_HEADER: &str = "test-identity-header";

fn fast_retry(max_retries: usize) -> RetryOptions {
    RetryOptions {
        max_retries,
        initial_interval: Duration::from_millis(1),
        max_interval: Duration::from_millis(5),
        multiplier: 2.0,
    }
}

fn app_service_provider(server: &MockServer, config: &AuthConfig) -> ManagedIdentityProvider {
    let source = ManagedIdentitySource::AppService {
        endpoint: server.url("/msi/token"),
        header: IDENTITY_HEADER.to_string(),
    };
    ManagedIdentityProvider::new(source, config)
        .expect("Provider should build")
        .with_retry_options(fast_retry(2))
}

fn token_body(token: &str, expires_in_secs: i64) -> String {
    let expires_on = time::OffsetDateTime::now_utc().unix_timestamp() + expires_in_secs;
    format!(
        "{{\"access_token\":\"{}\",\"expires_on\":\"{}\",\"resource\":\"https://vault.azure.net\",\"token_type\":\"Bearer\"}}",
        token, expires_on
    )
}

#[tokio::test]
async fn app_service_token_request_and_reuse() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/msi/token")
                .query_param("api-version", "2019-08-01")
                .query_param("resource", "https://vault.azure.net")
                .header("x-identity-header", IDENTITY_HEADER);
            then.status(200)
                .header("content-type", "application/json")
                .body(token_body("vault-token", 3600));
        })
        .await;

    let provider = app_service_provider(&server, &AuthConfig::default());

    let first = provider
        .get_token(&["https://vault.azure.net/.default"])
        .await
        .expect("First token request should succeed");
    let second = provider
        .get_token(&["https://vault.azure.net/.default"])
        .await
        .expect("Cached token request should succeed");

    assert_eq!(first.token.secret(), "vault-token");
    assert_eq!(second.token.secret(), "vault-token");
    mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn token_inside_refresh_window_is_refetched() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/msi/token");
            then.status(200)
                .header("content-type", "application/json")
                .body(token_body("short-lived", 60));
        })
        .await;

    let provider = app_service_provider(&server, &AuthConfig::default());

    for _ in 0..2 {
        provider
            .get_token(&["https://graph.microsoft.com/.default"])
            .await
            .expect("Token request should succeed");
    }

    // Expires within the 5 minute skew, so nothing is reused
    mock.assert_calls_async(2).await;
}

#[tokio::test]
async fn user_assigned_client_id_is_sent() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/msi/token")
                .query_param("client_id", "11111111-2222-3333-4444-555555555555");
            then.status(200)
                .header("content-type", "application/json")
                .body(token_body("uami-token", 3600));
        })
        .await;

    let mut config = AuthConfig::default();
    config.client_id = Some("11111111-2222-3333-4444-555555555555".to_string());
    let provider = app_service_provider(&server, &config);

    let token = provider
        .get_token(&["https://graph.microsoft.com/.default"])
        .await
        .expect("Token request should succeed");

    assert_eq!(token.token.secret(), "uami-token");
    mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn imds_requires_metadata_header() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/metadata/identity/oauth2/token")
                .query_param("api-version", "2018-02-01")
                .header("metadata", "true");
            then.status(200)
                .header("content-type", "application/json")
                .body(token_body("imds-token", 3600));
        })
        .await;

    let mut config = AuthConfig::default();
    config.imds_endpoint = server.url("/metadata/identity/oauth2/token");
    let provider = ManagedIdentityProvider::from_config(&config).expect("Provider should build");

    let token = provider
        .get_token(&["https://graph.microsoft.com/.default"])
        .await
        .expect("IMDS token request should succeed");

    assert_eq!(token.token.secret(), "imds-token");
    mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn bad_request_is_not_retried() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/msi/token");
            then.status(400)
                .header("content-type", "application/json")
                .body("{\"error\":\"invalid_request\",\"error_description\":\"Identity not found\"}");
        })
        .await;

    let provider = app_service_provider(&server, &AuthConfig::default());
    let result = provider.get_token(&["https://vault.azure.net/.default"]).await;

    assert!(matches!(result, Err(VaultfnError::AuthenticationError(_))));
    mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn server_errors_are_retried_then_reported() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/msi/token");
            then.status(503).body("busy");
        })
        .await;

    let provider = app_service_provider(&server, &AuthConfig::default());
    let result = provider.get_token(&["https://vault.azure.net/.default"]).await;

    assert!(matches!(result, Err(VaultfnError::Transient { .. })));
    // One attempt plus two retries
    mock.assert_calls_async(3).await;
}

#[tokio::test]
async fn concurrent_requests_share_one_fetch() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/msi/token");
            then.status(200)
                .header("content-type", "application/json")
                .delay(Duration::from_millis(50))
                .body(token_body("shared-token", 3600));
        })
        .await;

    let provider = Arc::new(app_service_provider(&server, &AuthConfig::default()));
    let requests = (0..10).map(|_| {
        let provider = provider.clone();
        async move { provider.get_token(&["https://vault.azure.net/.default"]).await }
    });

    let results = futures::future::join_all(requests).await;

    for result in results {
        let token = result.expect("Every caller should receive the token");
        assert_eq!(token.token.secret(), "shared-token");
    }
    mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn clear_cache_forces_refetch() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/msi/token");
            then.status(200)
                .header("content-type", "application/json")
                .body(token_body("token", 3600));
        })
        .await;

    let provider = app_service_provider(&server, &AuthConfig::default());

    provider.get_token(&["https://vault.azure.net/.default"]).await.unwrap();
    provider.clear_cache().await.unwrap();
    provider.get_token(&["https://vault.azure.net/.default"]).await.unwrap();

    mock.assert_calls_async(2).await;
}

#[tokio::test]
async fn multiple_scopes_are_rejected() {
    let provider = ManagedIdentityProvider::from_config(&AuthConfig::default())
        .expect("Provider should build");

    let result = provider
        .get_token(&["https://vault.azure.net/.default", "https://graph.microsoft.com/.default"])
        .await;

    assert!(matches!(result, Err(VaultfnError::InvalidArgument(_))));
}
