//! Authentication against an external OpenID Connect provider.
//!
//! The protocol work (discovery, code exchange, token verification,
//! end-session redirects) lives behind the [`IdentityProvider`] trait so
//! the web layer never touches OIDC details.

mod config;
mod error;
mod middleware;
mod oidc;
mod provider;

pub use config::{AuthConfig, ConfigValidationError};
pub use error::AuthError;
pub use middleware::{CurrentIdentity, require_auth};
pub use oidc::{CALLBACK_PATH, OidcProvider};
pub use provider::{CallbackParams, Claim, IdentityProvider, SessionIdentity};
