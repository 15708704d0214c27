//! Capability interface over the external identity provider.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use super::AuthError;

/// A single claim asserted about the signed-in identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    /// Claim name as received from the provider.
    pub claim_type: String,
    /// Claim value, rendered as text.
    pub value: String,
}

impl Claim {
    pub fn new(claim_type: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            claim_type: claim_type.into(),
            value: value.into(),
        }
    }
}

/// Identity attached to an authenticated session.
///
/// Owned and lifecycle-managed by the provider adapter; the web layer
/// only reads it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionIdentity {
    /// Display name resolved through the configured name claim.
    pub name: Option<String>,
    /// Roles resolved through the configured role claim.
    pub roles: Vec<String>,
    /// All claims, in the order received from the provider.
    pub claims: Vec<Claim>,
    /// Raw access token issued by the provider.
    pub access_token: String,
    /// Raw ID token issued by the provider.
    pub id_token: String,
}

impl SessionIdentity {
    /// First claim with the given type, if any.
    pub fn claim(&self, claim_type: &str) -> Option<&str> {
        self.claims
            .iter()
            .find(|c| c.claim_type == claim_type)
            .map(|c| c.value.as_str())
    }

    pub fn email(&self) -> Option<&str> {
        self.claim("email")
    }

    pub fn picture(&self) -> Option<&str> {
        self.claim("picture")
    }
}

/// Query parameters the provider appends to the callback redirect.
///
/// Every field is optional at the extractor so even a malformed
/// callback reaches the provider adapter and gets a rendered error
/// page; the adapter validates what must be present.
#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// Operations the web layer needs from the external identity provider.
///
/// The OIDC protocol is implemented once, behind this trait; handlers
/// and tests inject whatever implementation they need.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Begin a sign-in. Returns the provider authorization URL to
    /// redirect the browser to; `return_url` is where the browser lands
    /// after the callback completes.
    async fn challenge(
        &self,
        session: &Session,
        base_url: &str,
        return_url: &str,
    ) -> Result<String, AuthError>;

    /// Complete a sign-in from the provider callback. Returns the stored
    /// post-login return URL.
    async fn handle_callback(
        &self,
        session: &Session,
        base_url: &str,
        params: CallbackParams,
    ) -> Result<String, AuthError>;

    /// Provider-level sign-out. Returns the provider end-session URL
    /// with `callback_url` as the post-logout target, or `None` when the
    /// provider exposes no end-session endpoint.
    async fn sign_out_provider(
        &self,
        session: &Session,
        callback_url: &str,
    ) -> Result<Option<String>, AuthError>;

    /// Destroy the local session.
    async fn sign_out_local(&self, session: &Session) -> Result<(), AuthError>;

    /// Identity attached to the current session, if authenticated.
    async fn current_identity(&self, session: &Session)
    -> Result<Option<SessionIdentity>, AuthError>;
}
