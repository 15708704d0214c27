//! OpenID Connect adapter built on the `openidconnect` crate.
//!
//! Implements [`IdentityProvider`] with the authorization code flow plus
//! PKCE. Per-login state (CSRF token, nonce, PKCE verifier, return URL)
//! lives in the session between the challenge and the callback.

use std::borrow::Cow;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use openidconnect::core::{CoreClient, CoreResponseType};
use openidconnect::{
    AuthenticationFlow, AuthorizationCode, ClientId, ClientSecret, CsrfToken, EndpointMaybeSet,
    EndpointNotSet, EndpointSet, IssuerUrl, Nonce, OAuth2TokenResponse, PkceCodeChallenge,
    PkceCodeVerifier, ProviderMetadataWithLogout, RedirectUrl, Scope, TokenResponse,
};
use serde_json::Value;
use tower_sessions::Session;
use tracing::{debug, warn};

use super::config::AuthConfig;
use super::error::AuthError;
use super::provider::{CallbackParams, Claim, IdentityProvider, SessionIdentity};

const SESSION_KEY_CSRF: &str = "oidc_csrf";
const SESSION_KEY_NONCE: &str = "oidc_nonce";
const SESSION_KEY_PKCE_VERIFIER: &str = "oidc_pkce_verifier";
const SESSION_KEY_RETURN_URL: &str = "oidc_return_url";
const SESSION_KEY_IDENTITY: &str = "identity";

/// Route the provider redirects back to. The adapter owns this endpoint.
pub const CALLBACK_PATH: &str = "/signin-oidc";

type ConfiguredClient = CoreClient<
    EndpointSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointSet,
    EndpointMaybeSet,
>;

/// The external identity provider, reached over OIDC.
pub struct OidcProvider {
    client: ConfiguredClient,
    http_client: reqwest::Client,
    config: AuthConfig,
    end_session_endpoint: Option<String>,
    userinfo_endpoint: Option<String>,
}

impl OidcProvider {
    /// Fetch the provider's discovery document and build an adapter.
    pub async fn discover(config: AuthConfig) -> Result<Self, AuthError> {
        let http_client = build_http_client()?;
        let issuer = IssuerUrl::new(config.authority.clone())
            .map_err(|e| AuthError::Provider(format!("invalid authority URL: {e}")))?;

        let metadata = ProviderMetadataWithLogout::discover_async(issuer, &http_client)
            .await
            .map_err(|e| AuthError::Provider(format!("provider discovery failed: {e}")))?;

        Self::from_metadata(metadata, config)
    }

    /// Build an adapter from already-fetched provider metadata.
    pub fn from_metadata(
        metadata: ProviderMetadataWithLogout,
        config: AuthConfig,
    ) -> Result<Self, AuthError> {
        let end_session_endpoint = metadata
            .additional_metadata()
            .end_session_endpoint
            .as_ref()
            .map(|url| url.to_string());
        let userinfo_endpoint = metadata.userinfo_endpoint().map(|url| url.to_string());
        let token_endpoint = metadata.token_endpoint().cloned().ok_or_else(|| {
            AuthError::Provider("provider metadata has no token endpoint".to_string())
        })?;

        let client = CoreClient::from_provider_metadata(
            metadata,
            ClientId::new(config.client_id.clone()),
            config.client_secret.clone().map(ClientSecret::new),
        )
        .set_token_uri(token_endpoint);

        Ok(Self {
            client,
            http_client: build_http_client()?,
            config,
            end_session_endpoint,
            userinfo_endpoint,
        })
    }

    fn redirect_url(&self, base_url: &str) -> Result<RedirectUrl, AuthError> {
        RedirectUrl::new(format!("{base_url}{CALLBACK_PATH}"))
            .map_err(|e| AuthError::Provider(format!("invalid redirect URL: {e}")))
    }

    async fn fetch_userinfo(
        &self,
        endpoint: &str,
        access_token: &str,
    ) -> Result<Vec<Claim>, AuthError> {
        let payload: Value = self
            .http_client
            .get(endpoint)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AuthError::Provider(format!("userinfo request failed: {e}")))?
            .error_for_status()
            .map_err(|e| AuthError::Provider(format!("userinfo request failed: {e}")))?
            .json()
            .await
            .map_err(|e| AuthError::Provider(format!("userinfo response was not JSON: {e}")))?;

        match payload {
            Value::Object(map) => Ok(flatten_claims(&map)),
            _ => Err(AuthError::Provider(
                "userinfo response was not a JSON object".to_string(),
            )),
        }
    }
}

#[async_trait]
impl IdentityProvider for OidcProvider {
    async fn challenge(
        &self,
        session: &Session,
        base_url: &str,
        return_url: &str,
    ) -> Result<String, AuthError> {
        // New login, new session id.
        session.cycle_id().await?;

        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

        let mut request = self
            .client
            .authorize_url(
                AuthenticationFlow::<CoreResponseType>::AuthorizationCode,
                CsrfToken::new_random,
                Nonce::new_random,
            )
            .set_redirect_uri(Cow::Owned(self.redirect_url(base_url)?))
            .set_pkce_challenge(pkce_challenge);
        // "openid" is always requested by the client itself.
        for scope in self.config.scope_list().into_iter().filter(|s| *s != "openid") {
            request = request.add_scope(Scope::new(scope.to_string()));
        }
        let (auth_url, csrf_token, nonce) = request.url();

        session
            .insert(SESSION_KEY_CSRF, csrf_token.secret().clone())
            .await?;
        session
            .insert(SESSION_KEY_NONCE, nonce.secret().clone())
            .await?;
        session
            .insert(SESSION_KEY_PKCE_VERIFIER, pkce_verifier.secret().clone())
            .await?;
        session
            .insert(SESSION_KEY_RETURN_URL, return_url.to_string())
            .await?;

        Ok(auth_url.to_string())
    }

    async fn handle_callback(
        &self,
        session: &Session,
        base_url: &str,
        params: CallbackParams,
    ) -> Result<String, AuthError> {
        if let Some(error) = params.error {
            let description = params
                .error_description
                .unwrap_or_else(|| "unknown".to_string());
            warn!(error, description, "provider returned an error on callback");
            return Err(AuthError::Denied { error, description });
        }

        let code = params.code.ok_or_else(|| {
            AuthError::InvalidCallback("missing authorization code".to_string())
        })?;
        let state = params
            .state
            .ok_or_else(|| AuthError::InvalidCallback("missing state".to_string()))?;

        let stored_csrf = pending_login_value(session, SESSION_KEY_CSRF).await?;
        if state != stored_csrf {
            warn!("state mismatch on callback");
            return Err(AuthError::InvalidCallback("state mismatch".to_string()));
        }
        let stored_nonce = pending_login_value(session, SESSION_KEY_NONCE).await?;
        let stored_pkce = pending_login_value(session, SESSION_KEY_PKCE_VERIFIER).await?;
        let return_url = session
            .get::<String>(SESSION_KEY_RETURN_URL)
            .await?
            .unwrap_or_else(|| "/".to_string());

        let token_response = self
            .client
            .exchange_code(AuthorizationCode::new(code))
            .set_redirect_uri(Cow::Owned(self.redirect_url(base_url)?))
            .set_pkce_verifier(PkceCodeVerifier::new(stored_pkce))
            .request_async(&self.http_client)
            .await
            .map_err(|e| AuthError::Provider(format!("token exchange failed: {e}")))?;

        let id_token = token_response
            .id_token()
            .ok_or_else(|| AuthError::Provider("no ID token in token response".to_string()))?;
        let verified = id_token
            .claims(&self.client.id_token_verifier(), &Nonce::new(stored_nonce))
            .map_err(|e| AuthError::Provider(format!("ID token verification failed: {e}")))?;
        debug!(sub = %verified.subject().as_str(), "ID token verified");

        let access_token = token_response.access_token().secret().clone();
        let id_token_jwt = id_token.to_string();

        let mut claims = id_token_claims(&id_token_jwt);
        if self.config.fetch_userinfo {
            if let Some(ref endpoint) = self.userinfo_endpoint {
                let extra = self.fetch_userinfo(endpoint, &access_token).await?;
                merge_claims(&mut claims, extra);
            }
        }

        let name = claims
            .iter()
            .find(|c| c.claim_type == self.config.name_claim)
            .map(|c| c.value.clone());
        let roles = claims
            .iter()
            .filter(|c| c.claim_type == self.config.role_claim)
            .map(|c| c.value.clone())
            .collect();

        let identity = SessionIdentity {
            name,
            roles,
            claims,
            access_token,
            id_token: id_token_jwt,
        };

        // Fresh session id for the authenticated session.
        session.cycle_id().await?;
        let _ = session.remove::<String>(SESSION_KEY_CSRF).await;
        let _ = session.remove::<String>(SESSION_KEY_NONCE).await;
        let _ = session.remove::<String>(SESSION_KEY_PKCE_VERIFIER).await;
        let _ = session.remove::<String>(SESSION_KEY_RETURN_URL).await;
        session.insert(SESSION_KEY_IDENTITY, identity).await?;

        Ok(return_url)
    }

    async fn sign_out_provider(
        &self,
        session: &Session,
        callback_url: &str,
    ) -> Result<Option<String>, AuthError> {
        let Some(ref end_session) = self.end_session_endpoint else {
            return Ok(None);
        };

        let identity: Option<SessionIdentity> = session.get(SESSION_KEY_IDENTITY).await?;
        let id_token_hint = identity.map(|i| i.id_token);

        Ok(Some(end_session_redirect(
            end_session,
            callback_url,
            &self.config.client_id,
            id_token_hint.as_deref(),
        )))
    }

    async fn sign_out_local(&self, session: &Session) -> Result<(), AuthError> {
        session.flush().await?;
        Ok(())
    }

    async fn current_identity(
        &self,
        session: &Session,
    ) -> Result<Option<SessionIdentity>, AuthError> {
        Ok(session.get(SESSION_KEY_IDENTITY).await?)
    }
}

async fn pending_login_value(session: &Session, key: &str) -> Result<String, AuthError> {
    session
        .get::<String>(key)
        .await?
        .ok_or_else(|| AuthError::InvalidCallback(format!("no pending login in session ({key})")))
}

/// Build the provider end-session redirect with the post-logout target.
fn end_session_redirect(
    endpoint: &str,
    callback_url: &str,
    client_id: &str,
    id_token_hint: Option<&str>,
) -> String {
    let mut params = vec![
        ("post_logout_redirect_uri", callback_url),
        ("client_id", client_id),
    ];
    if let Some(hint) = id_token_hint {
        params.push(("id_token_hint", hint));
    }

    let query = params
        .iter()
        .map(|(key, value)| format!("{key}={}", urlencoding::encode(value)))
        .collect::<Vec<_>>()
        .join("&");

    format!("{endpoint}?{query}")
}

/// Claims from the payload segment of a verified ID token, in document order.
fn id_token_claims(id_token: &str) -> Vec<Claim> {
    let Some(payload) = id_token.split('.').nth(1) else {
        return Vec::new();
    };
    let Ok(bytes) = URL_SAFE_NO_PAD.decode(payload) else {
        return Vec::new();
    };
    match serde_json::from_slice::<Value>(&bytes) {
        Ok(Value::Object(map)) => flatten_claims(&map),
        _ => Vec::new(),
    }
}

/// Flatten a JSON object into (type, value) pairs. Arrays contribute one
/// claim per element; nested objects are serialized compactly.
fn flatten_claims(map: &serde_json::Map<String, Value>) -> Vec<Claim> {
    let mut claims = Vec::new();
    for (key, value) in map {
        match value {
            Value::Array(items) => {
                for item in items {
                    claims.push(Claim::new(key.clone(), claim_text(item)));
                }
            }
            other => claims.push(Claim::new(key.clone(), claim_text(other))),
        }
    }
    claims
}

fn claim_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Append claims whose type is not already present.
fn merge_claims(claims: &mut Vec<Claim>, extra: Vec<Claim>) {
    for claim in extra {
        if !claims.iter().any(|c| c.claim_type == claim.claim_type) {
            claims.push(claim);
        }
    }
}

fn build_http_client() -> Result<reqwest::Client, AuthError> {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .timeout(Duration::from_secs(10))
        .build()
        .map_err(|e| AuthError::Provider(format!("failed to build HTTP client: {e}")))
}
