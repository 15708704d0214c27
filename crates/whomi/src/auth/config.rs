//! Authentication configuration.

use serde::{Deserialize, Serialize};

/// Settings for the external OpenID Connect provider.
///
/// These values are passed through to the provider adapter mostly
/// untouched; the only transformation is splitting `scopes` on
/// whitespace.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Issuer URL of the provider, e.g. "https://idp.example.com/realms/demo".
    pub authority: String,
    /// OAuth2 client identifier registered at the provider.
    pub client_id: String,
    /// Optional client secret. Public clients rely on PKCE alone.
    pub client_secret: Option<String>,
    /// OAuth2 response type. Only the authorization code flow is supported.
    pub response_type: String,
    /// Space-delimited scopes requested during the challenge.
    pub scopes: String,
    /// Claim used as the display name of a signed-in user.
    pub name_claim: String,
    /// Claim carrying role assignments.
    pub role_claim: String,
    /// Merge claims from the userinfo endpoint into the session identity.
    pub fetch_userinfo: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            authority: String::new(),
            client_id: String::new(),
            client_secret: None,
            response_type: "code".to_string(),
            scopes: "openid profile email".to_string(),
            name_claim: "name".to_string(),
            role_claim: "role".to_string(),
            fetch_userinfo: true,
        }
    }
}

impl AuthConfig {
    /// Scopes split on whitespace, in configured order.
    pub fn scope_list(&self) -> Vec<&str> {
        self.scopes.split_whitespace().collect()
    }

    /// Validate the configuration before the server starts.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.authority.trim().is_empty() {
            return Err(ConfigValidationError::MissingAuthority);
        }

        if self.client_id.trim().is_empty() {
            return Err(ConfigValidationError::MissingClientId);
        }

        if self.response_type != "code" {
            return Err(ConfigValidationError::UnsupportedResponseType(
                self.response_type.clone(),
            ));
        }

        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("auth.authority must be set to the provider issuer URL")]
    MissingAuthority,

    #[error("auth.client_id must be set")]
    MissingClientId,

    #[error("unsupported auth.response_type {0:?} (only \"code\" is supported)")]
    UnsupportedResponseType(String),
}
