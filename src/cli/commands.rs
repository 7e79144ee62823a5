//! CLI commands and argument parsing
//!
//! The Functions host starts the handler without arguments, which serves
//! HTTP. The `token` and `secret` commands run a single fetch from a shell
//! on the host, useful when diagnosing identity or vault access.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tokio::net::TcpListener;

use crate::auth::AuthProviderFactory;
use crate::config::{AuthMethod, Config};
use crate::error::Result;
use crate::handler::{self, AppState};
use crate::secret::SecretClient;

/// Get the full version string with build information
fn get_version() -> &'static str {
    env!("VERSION_WITH_GIT")
}

#[derive(Parser)]
#[command(name = "handler")]
#[command(about = "Azure Functions custom handler for managed identity tokens and Key Vault secrets")]
#[command(version = get_version())]
pub struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Configuration file (TOML or JSON)
    #[arg(long, global = true, env = "VAULTFN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Port to listen on (overrides FUNCTIONS_CUSTOMHANDLER_PORT)
    #[arg(long, global = true)]
    pub port: Option<u16>,

    /// Authentication method (managed_identity, default)
    #[arg(long, global = true, value_name = "METHOD")]
    pub auth_method: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Serve the HTTP trigger functions (default)
    Serve,
    /// Acquire an access token and print it
    Token {
        /// Scope to request, defaults to the configured token scope
        #[arg(long)]
        scope: Option<String>,
    },
    /// Read the configured secret and print it
    Secret {
        /// Secret version, latest when omitted
        #[arg(long)]
        version: Option<String>,
    },
}

impl Cli {
    /// Apply command-line overrides on top of loaded configuration
    pub fn apply_overrides(&self, config: &mut Config) -> Result<()> {
        if self.debug {
            config.debug = true;
        }

        if let Some(port) = self.port {
            config.port = port;
        }

        if let Some(method) = &self.auth_method {
            config.auth.method = method.parse::<AuthMethod>()?;
        }

        Ok(())
    }

    pub async fn execute(self, config: Config) -> Result<()> {
        config.validate()?;
        let auth_provider = AuthProviderFactory::create_provider(&config.auth)?;

        match self.command.unwrap_or(Commands::Serve) {
            Commands::Serve => {
                let listener = TcpListener::bind(("0.0.0.0", config.port)).await?;
                let state = AppState::new(config, auth_provider)?;
                handler::serve(listener, state).await
            }
            Commands::Token { scope } => {
                let scope = scope.unwrap_or_else(|| config.token_scope.clone());
                let token = auth_provider.get_token(&[scope.as_str()]).await?;
                println!("{}", token.token.secret());
                Ok(())
            }
            Commands::Secret { version } => {
                let (vault_name, secret_name) = config.secret_target()?;
                let client = SecretClient::new(vault_name, auth_provider)?;
                let secret = client.get_secret(secret_name, version.as_deref()).await?;
                println!("{}", secret.value.as_str());
                Ok(())
            }
        }
    }
}
