//! Key Vault secret data models

use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use zeroize::Zeroizing;

#[derive(Debug, Clone, Deserialize)]
pub struct SecretAttributes {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Unix seconds
    pub created: Option<i64>,
    /// Unix seconds
    pub updated: Option<i64>,
    #[serde(rename = "exp")]
    pub expires: Option<i64>,
    #[serde(rename = "nbf")]
    pub not_before: Option<i64>,
}

fn default_enabled() -> bool {
    true
}

impl Default for SecretAttributes {
    fn default() -> Self {
        Self {
            enabled: true,
            created: None,
            updated: None,
            expires: None,
            not_before: None,
        }
    }
}

/// A secret bundle as returned by `GET /secrets/{name}/{version}`
#[derive(Clone, Deserialize)]
pub struct KeyVaultSecret {
    pub id: String,
    pub value: Zeroizing<String>,
    #[serde(rename = "contentType")]
    pub content_type: Option<String>,
    #[serde(default)]
    pub attributes: SecretAttributes,
    #[serde(default)]
    pub tags: HashMap<String, String>,
}

impl KeyVaultSecret {
    /// Version segment of the secret id, if present
    pub fn version(&self) -> Option<&str> {
        let mut segments = self.id.trim_end_matches('/').rsplit('/');
        let last = segments.next()?;
        let before = segments.next()?;
        let marker = segments.next()?;

        // .../secrets/{name}/{version}
        if marker == "secrets" && !before.is_empty() {
            Some(last)
        } else {
            None
        }
    }
}

impl fmt::Debug for KeyVaultSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyVaultSecret")
            .field("id", &self.id)
            .field("value", &"<redacted>")
            .field("content_type", &self.content_type)
            .field("attributes", &self.attributes)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BUNDLE: &str = r#"{
        "value": "hunter2",
        "id": "https://prod-kv.vault.azure.net/secrets/db-password/4387e9f3d6e14c459867679a90fd0f79",
        "contentType": "text/plain",
        "attributes": {
            "enabled": true,
            "created": 1493938410,
            "updated": 1493938410,
            "recoveryLevel": "Recoverable+Purgeable"
        },
        "tags": {"env": "prod"}
    }"#;

    #[test]
    fn test_parse_secret_bundle() {
        let secret: KeyVaultSecret = serde_json::from_str(BUNDLE).unwrap();

        assert_eq!(secret.value.as_str(), "hunter2");
        assert_eq!(secret.content_type.as_deref(), Some("text/plain"));
        assert!(secret.attributes.enabled);
        assert_eq!(secret.attributes.created, Some(1493938410));
        assert_eq!(secret.tags.get("env").map(String::as_str), Some("prod"));
        assert_eq!(secret.version(), Some("4387e9f3d6e14c459867679a90fd0f79"));
    }

    #[test]
    fn test_debug_redacts_value() {
        let secret: KeyVaultSecret = serde_json::from_str(BUNDLE).unwrap();
        let debug = format!("{:?}", secret);

        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_minimal_bundle() {
        let secret: KeyVaultSecret = serde_json::from_str(
            r#"{"value":"v","id":"https://prod-kv.vault.azure.net/secrets/name"}"#,
        )
        .unwrap();

        assert!(secret.attributes.enabled);
        assert!(secret.tags.is_empty());
        assert_eq!(secret.version(), None);
    }
}
