//! Request-level authentication gate.

use std::sync::Arc;

use axum::extract::{FromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use tower_sessions::Session;
use tracing::debug;

use super::error::AuthError;
use super::provider::{IdentityProvider, SessionIdentity};

/// Identity of the signed-in user, inserted by [`require_auth`].
#[derive(Debug, Clone)]
pub struct CurrentIdentity(pub SessionIdentity);

impl<S> FromRequestParts<S> for CurrentIdentity
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentIdentity>()
            .cloned()
            .ok_or(AuthError::NotAuthenticated)
    }
}

/// Middleware protecting a route group. Unauthenticated requests are
/// redirected to the login endpoint with the original URL as the
/// post-login target.
pub async fn require_auth(
    State(provider): State<Arc<dyn IdentityProvider>>,
    session: Session,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    match provider.current_identity(&session).await? {
        Some(identity) => {
            req.extensions_mut().insert(CurrentIdentity(identity));
            Ok(next.run(req).await)
        }
        None => {
            let original = req
                .uri()
                .path_and_query()
                .map(|pq| pq.as_str())
                .unwrap_or("/");
            debug!(path = original, "unauthenticated request, redirecting to login");
            let login = format!("/Account/Login?returnUrl={}", urlencoding::encode(original));
            Ok(Redirect::temporary(&login).into_response())
        }
    }
}
