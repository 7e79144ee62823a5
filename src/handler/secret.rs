//! `MyFunction`: return the configured Key Vault secret

use axum::extract::State;

use crate::error::Result;
use crate::handler::AppState;

pub async fn my_function(State(state): State<AppState>) -> Result<String> {
    tracing::info!(function = "MyFunction", "HTTP trigger function processed a request.");

    let (_, secret_name) = state.config.secret_target()?;
    let client = state.secret_client()?;
    let secret = client.get_secret(secret_name, None).await?;

    Ok(format!("Your secret value is: {}", secret.value.as_str()))
}
