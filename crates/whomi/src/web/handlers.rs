//! Request handlers and their page templates.

use askama::Template;
use axum::Json;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::{Html, IntoResponse, Redirect, Response};
use serde::Deserialize;
use serde_json::json;
use tower_sessions::Session;
use tracing::info;

use crate::auth::{CallbackParams, Claim, CurrentIdentity};
use crate::token::decode_jwt;

use super::error::AppError;
use super::state::AppState;

#[derive(Template)]
#[template(path = "home.html")]
struct HomeTemplate {
    authenticated: bool,
    name: String,
}

#[derive(Template)]
#[template(path = "profile.html")]
struct ProfileTemplate {
    name: String,
    email: String,
    picture: String,
    roles: Vec<String>,
    access_token: String,
    access_token_json: String,
    id_token: String,
    id_token_json: String,
}

#[derive(Template)]
#[template(path = "claims.html")]
struct ClaimsTemplate {
    claims: Vec<Claim>,
}

#[derive(Template)]
#[template(path = "access_denied.html")]
struct AccessDeniedTemplate;

fn render<T: Template>(template: T) -> Result<Response, AppError> {
    Ok(Html(template.render()?).into_response())
}

/// Base URL the provider should redirect back to, reconstructed from
/// proxy headers when present.
fn base_url(state: &AppState, headers: &HeaderMap) -> String {
    let host = headers
        .get("x-forwarded-host")
        .or_else(|| headers.get("host"))
        .and_then(|v| v.to_str().ok());

    if let Some(host) = host {
        let proto = headers
            .get("x-forwarded-proto")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("http");
        return format!("{proto}://{host}");
    }

    state
        .public_url
        .as_deref()
        .map(|url| url.trim_end_matches('/').to_string())
        .unwrap_or_else(|| "http://localhost".to_string())
}

pub async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn home(State(state): State<AppState>, session: Session) -> Result<Response, AppError> {
    let identity = state.provider.current_identity(&session).await?;
    render(HomeTemplate {
        authenticated: identity.is_some(),
        name: identity.and_then(|i| i.name).unwrap_or_default(),
    })
}

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    #[serde(rename = "returnUrl")]
    return_url: Option<String>,
}

pub async fn login(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    Query(query): Query<LoginQuery>,
) -> Result<Response, AppError> {
    let return_url = query.return_url.unwrap_or_else(|| "/".to_string());
    let base = base_url(&state, &headers);
    let auth_url = state.provider.challenge(&session, &base, &return_url).await?;
    Ok(Redirect::temporary(&auth_url).into_response())
}

pub async fn oidc_callback(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    Query(params): Query<CallbackParams>,
) -> Result<Response, AppError> {
    let base = base_url(&state, &headers);
    let return_url = state
        .provider
        .handle_callback(&session, &base, params)
        .await?;
    info!(return_url, "sign-in completed");
    Ok(Redirect::temporary(&return_url).into_response())
}

pub async fn logout(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    _identity: CurrentIdentity,
) -> Result<Response, AppError> {
    let callback_url = format!("{}/", base_url(&state, &headers));

    // Provider sign-out and local sign-out both run, whatever the first
    // one returns.
    let provider_result = state.provider.sign_out_provider(&session, &callback_url).await;
    let local_result = state.provider.sign_out_local(&session).await;
    let end_session = provider_result?;
    local_result?;

    info!("signed out");
    let target = end_session.unwrap_or(callback_url);
    Ok(Redirect::temporary(&target).into_response())
}

pub async fn profile(CurrentIdentity(identity): CurrentIdentity) -> Result<Response, AppError> {
    render(ProfileTemplate {
        name: identity.name.clone().unwrap_or_default(),
        email: identity.email().unwrap_or_default().to_string(),
        picture: identity.picture().unwrap_or_default().to_string(),
        roles: identity.roles.clone(),
        access_token_json: decode_jwt(&identity.access_token),
        id_token_json: decode_jwt(&identity.id_token),
        access_token: identity.access_token,
        id_token: identity.id_token,
    })
}

pub async fn claims(CurrentIdentity(identity): CurrentIdentity) -> Result<Response, AppError> {
    render(ClaimsTemplate {
        claims: identity.claims,
    })
}

pub async fn access_denied() -> Result<Response, AppError> {
    render(AccessDeniedTemplate)
}
