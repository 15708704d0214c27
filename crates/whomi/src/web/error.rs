//! Error page rendering.

use std::sync::atomic::{AtomicBool, Ordering};

use askama::Template;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use thiserror::Error;
use tracing::error;

use crate::auth::AuthError;

static DEV_MODE: AtomicBool = AtomicBool::new(false);

/// Enable detailed error pages. Off outside development, so error
/// details never leak to visitors.
pub fn set_dev_mode(enabled: bool) {
    DEV_MODE.store(enabled, Ordering::Relaxed);
}

/// Errors surfaced to the browser as an error page.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("template rendering failed: {0}")]
    Render(#[from] askama::Error),
}

impl AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Auth(e) => e.status_code(),
            Self::Render(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Template)]
#[template(path = "error.html")]
struct ErrorTemplate {
    status: u16,
    detail: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        error!(%status, error = %self, "request failed");

        let detail = if DEV_MODE.load(Ordering::Relaxed) {
            self.to_string()
        } else {
            String::new()
        };

        let page = ErrorTemplate {
            status: status.as_u16(),
            detail,
        };
        match page.render() {
            Ok(html) => (status, Html(html)).into_response(),
            Err(e) => {
                error!(error = %e, "error page rendering failed");
                (status, "an internal error occurred".to_string()).into_response()
            }
        }
    }
}
