//! Shared test helpers: a scripted identity provider and app builder.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use axum::Router;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use tower_sessions::Session;
use whomi::auth::{
    AuthError, CallbackParams, Claim, IdentityProvider, SessionIdentity,
};
use whomi::web::{AppState, create_router};

/// Scripted identity provider. Records calls and returns canned answers.
pub struct StubProvider {
    pub identity: Mutex<Option<SessionIdentity>>,
    pub challenges: Mutex<Vec<String>>,
    pub provider_sign_outs: AtomicUsize,
    pub local_sign_outs: AtomicUsize,
    pub end_session_url: Option<String>,
    pub fail_provider_sign_out: bool,
}

impl StubProvider {
    pub fn anonymous() -> Self {
        Self {
            identity: Mutex::new(None),
            challenges: Mutex::new(Vec::new()),
            provider_sign_outs: AtomicUsize::new(0),
            local_sign_outs: AtomicUsize::new(0),
            end_session_url: None,
            fail_provider_sign_out: false,
        }
    }

    pub fn signed_in() -> Self {
        let stub = Self::anonymous();
        *stub.identity.lock().unwrap() = Some(test_identity());
        stub
    }

    pub fn with_end_session_url(mut self, url: &str) -> Self {
        self.end_session_url = Some(url.to_string());
        self
    }

    pub fn with_failing_provider_sign_out(mut self) -> Self {
        self.fail_provider_sign_out = true;
        self
    }
}

#[async_trait]
impl IdentityProvider for StubProvider {
    async fn challenge(
        &self,
        _session: &Session,
        _base_url: &str,
        return_url: &str,
    ) -> Result<String, AuthError> {
        self.challenges.lock().unwrap().push(return_url.to_string());
        Ok(format!(
            "https://idp.example.com/authorize?client_id=test&return={return_url}"
        ))
    }

    async fn handle_callback(
        &self,
        _session: &Session,
        _base_url: &str,
        _params: CallbackParams,
    ) -> Result<String, AuthError> {
        *self.identity.lock().unwrap() = Some(test_identity());
        Ok("/".to_string())
    }

    async fn sign_out_provider(
        &self,
        _session: &Session,
        _callback_url: &str,
    ) -> Result<Option<String>, AuthError> {
        self.provider_sign_outs.fetch_add(1, Ordering::SeqCst);
        if self.fail_provider_sign_out {
            return Err(AuthError::Provider("end-session lookup failed".to_string()));
        }
        Ok(self.end_session_url.clone())
    }

    async fn sign_out_local(&self, _session: &Session) -> Result<(), AuthError> {
        self.local_sign_outs.fetch_add(1, Ordering::SeqCst);
        *self.identity.lock().unwrap() = None;
        Ok(())
    }

    async fn current_identity(
        &self,
        _session: &Session,
    ) -> Result<Option<SessionIdentity>, AuthError> {
        Ok(self.identity.lock().unwrap().clone())
    }
}

pub fn test_identity() -> SessionIdentity {
    SessionIdentity {
        name: Some("Jane Doe".to_string()),
        roles: vec!["admin".to_string()],
        claims: vec![
            Claim::new("sub", "user-123"),
            Claim::new("name", "Jane Doe"),
            Claim::new("email", "jane@example.com"),
            Claim::new("picture", "https://cdn.example.com/jane.png"),
            Claim::new("role", "admin"),
        ],
        access_token: fake_jwt(r#"{"iss":"https://idp.example.com","scope":"openid"}"#),
        id_token: fake_jwt(r#"{"iss":"https://idp.example.com","sub":"user-123"}"#),
    }
}

/// A structurally valid, unsigned-in-spirit JWT for display tests.
pub fn fake_jwt(payload_json: &str) -> String {
    let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"RS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(payload_json);
    format!("{header}.{payload}.fake-signature")
}

pub fn test_app(stub: Arc<StubProvider>) -> Router {
    let state = AppState::new(stub).with_public_url(Some("http://demo.example.com".to_string()));
    create_router(state)
}
