//! Shared application state.

use std::sync::Arc;

use crate::auth::IdentityProvider;

/// State shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Identity provider adapter behind the auth routes.
    pub provider: Arc<dyn IdentityProvider>,
    /// Externally visible base URL, when the server sits behind a proxy
    /// that does not forward host headers.
    pub public_url: Option<String>,
    /// Name of the session cookie.
    pub session_cookie: String,
}

impl AppState {
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        Self {
            provider,
            public_url: None,
            session_cookie: "whomi_session".to_string(),
        }
    }

    pub fn with_public_url(mut self, public_url: Option<String>) -> Self {
        self.public_url = public_url;
        self
    }

    pub fn with_session_cookie(mut self, name: impl Into<String>) -> Self {
        self.session_cookie = name.into();
        self
    }
}
