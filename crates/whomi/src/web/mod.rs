//! HTTP surface: router, handlers, templates, error rendering.

pub mod error;
mod handlers;
mod routes;
mod state;

pub use error::AppError;
pub use routes::create_router;
pub use state::AppState;
