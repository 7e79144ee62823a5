//! HTTP trigger functions
//!
//! The Functions host forwards each invocation to `/api/<FunctionName>` on
//! the port named by `FUNCTIONS_CUSTOMHANDLER_PORT`. Each function logs the
//! invocation, authenticates, fetches one value and returns it as text.

pub mod secret;
pub mod token;

use axum::routing::get;
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;

use crate::auth::provider::AzureAuthProvider;
use crate::config::Config;
use crate::error::{Result, VaultfnError};
use crate::secret::SecretClient;

pub const TOKEN_FUNCTION_ROUTE: &str = "/api/GetTokenForArbitraryResource";
pub const SECRET_FUNCTION_ROUTE: &str = "/api/MyFunction";

/// Shared state handed to every function invocation
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub auth_provider: Arc<dyn AzureAuthProvider>,
    secret_client: Option<Arc<SecretClient>>,
}

impl AppState {
    /// Build state from configuration. The secret client only exists
    /// when a vault name is configured.
    pub fn new(config: Config, auth_provider: Arc<dyn AzureAuthProvider>) -> Result<Self> {
        let secret_client = if config.key_vault_name.is_empty() {
            tracing::warn!("KeyVaultName is not set; MyFunction will fail until it is configured");
            None
        } else {
            Some(Arc::new(SecretClient::new(
                &config.key_vault_name,
                auth_provider.clone(),
            )?))
        };

        Ok(Self {
            config: Arc::new(config),
            auth_provider,
            secret_client,
        })
    }

    /// Replace the secret client, e.g. to point at a different vault URL
    pub fn with_secret_client(mut self, client: SecretClient) -> Self {
        self.secret_client = Some(Arc::new(client));
        self
    }

    pub fn secret_client(&self) -> Result<&SecretClient> {
        self.secret_client
            .as_deref()
            .ok_or_else(|| VaultfnError::config("KeyVaultName is not configured"))
    }
}

/// Routes for both functions. GET and POST are accepted like the default
/// HTTP trigger binding.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            TOKEN_FUNCTION_ROUTE,
            get(token::get_token_for_arbitrary_resource)
                .post(token::get_token_for_arbitrary_resource),
        )
        .route(
            SECRET_FUNCTION_ROUTE,
            get(secret::my_function).post(secret::my_function),
        )
        .with_state(state)
}

/// Serve until Ctrl-C or SIGTERM
pub async fn serve(listener: TcpListener, state: AppState) -> Result<()> {
    let addr = listener.local_addr()?;
    tracing::info!(%addr, "Custom handler listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Custom handler stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
