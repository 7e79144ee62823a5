//! `GetTokenForArbitraryResource`: return a managed identity access token

use axum::extract::{Query, State};
use serde::Deserialize;

use crate::error::{Result, VaultfnError};
use crate::handler::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct TokenQuery {
    /// Resource URI; `/.default` is appended
    pub resource: Option<String>,
    /// Full scope, used as is
    pub scope: Option<String>,
}

impl TokenQuery {
    /// Scope to request: `scope`, then `resource`, then the configured default
    pub fn resolve_scope(&self, default_scope: &str) -> Result<String> {
        if let Some(scope) = self.scope.as_deref().filter(|s| !s.trim().is_empty()) {
            ensure_uri(scope)?;
            return Ok(scope.trim().to_string());
        }

        if let Some(resource) = self.resource.as_deref().filter(|s| !s.trim().is_empty()) {
            ensure_uri(resource)?;
            return Ok(format!("{}/.default", resource.trim().trim_end_matches('/')));
        }

        Ok(default_scope.to_string())
    }
}

fn ensure_uri(value: &str) -> Result<()> {
    url::Url::parse(value.trim())
        .map(|_| ())
        .map_err(|e| VaultfnError::invalid_argument(format!("Invalid resource '{}': {}", value, e)))
}

pub async fn get_token_for_arbitrary_resource(
    State(state): State<AppState>,
    Query(query): Query<TokenQuery>,
) -> Result<String> {
    tracing::info!(function = "GetTokenForArbitraryResource", "HTTP trigger function processed a request.");

    let scope = query.resolve_scope(&state.config.token_scope)?;
    let token = state.auth_provider.get_token(&[scope.as_str()]).await?;

    Ok(format!("The token is: {}", token.token.secret()))
}
