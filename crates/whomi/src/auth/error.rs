//! Authentication error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Errors raised while talking to the identity provider or session store.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No authenticated session is attached to the request.
    #[error("authentication required")]
    NotAuthenticated,

    /// The provider rejected the sign-in attempt.
    #[error("provider denied the request: {error}: {description}")]
    Denied { error: String, description: String },

    /// The provider callback was malformed or failed validation.
    #[error("invalid callback: {0}")]
    InvalidCallback(String),

    /// Communication with the provider failed.
    #[error("identity provider error: {0}")]
    Provider(String),

    /// The session store failed.
    #[error("session error: {0}")]
    Session(#[from] tower_sessions::session::Error),
}

impl AuthError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotAuthenticated => StatusCode::UNAUTHORIZED,
            Self::Denied { .. } => StatusCode::FORBIDDEN,
            Self::InvalidCallback(_) => StatusCode::BAD_REQUEST,
            Self::Provider(_) | Self::Session(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        crate::web::AppError::from(self).into_response()
    }
}
