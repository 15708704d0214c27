//! Handler-level tests against a scripted identity provider.

mod common;

use std::sync::Arc;
use std::sync::atomic::Ordering;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use axum::response::Response;
use tower::ServiceExt;

use common::StubProvider;

async fn get(app: Router, uri: &str) -> Response {
    app.oneshot(
        Request::builder()
            .uri(uri)
            .body(Body::empty())
            .expect("request"),
    )
    .await
    .expect("response")
}

async fn body_text(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    String::from_utf8(bytes.to_vec()).expect("utf8 body")
}

fn location(response: &Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .expect("Location header")
        .to_str()
        .expect("ascii Location")
}

#[tokio::test]
async fn health_reports_ok() {
    let app = common::test_app(Arc::new(StubProvider::anonymous()));
    let response = get(app, "/health").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("\"status\":\"ok\""));
}

#[tokio::test]
async fn login_redirects_to_provider_with_default_return_url() {
    let stub = Arc::new(StubProvider::anonymous());
    let app = common::test_app(stub.clone());

    let response = get(app, "/Account/Login").await;
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert!(location(&response).starts_with("https://idp.example.com/authorize"));
    assert_eq!(*stub.challenges.lock().unwrap(), vec!["/".to_string()]);
}

#[tokio::test]
async fn login_forwards_the_requested_return_url() {
    let stub = Arc::new(StubProvider::anonymous());
    let app = common::test_app(stub.clone());

    let response = get(app, "/Account/Login?returnUrl=%2FAccount%2FClaims").await;
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(
        *stub.challenges.lock().unwrap(),
        vec!["/Account/Claims".to_string()]
    );
}

#[tokio::test]
async fn protected_pages_redirect_anonymous_visitors_to_login() {
    for path in ["/Account/Profile", "/Account/Claims", "/Account/Logout"] {
        let app = common::test_app(Arc::new(StubProvider::anonymous()));
        let response = get(app, path).await;
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT, "{path}");
        let expected = format!("/Account/Login?returnUrl={}", urlencoding::encode(path));
        assert_eq!(location(&response), expected, "{path}");
    }
}

#[tokio::test]
async fn home_offers_sign_in_when_anonymous() {
    let app = common::test_app(Arc::new(StubProvider::anonymous()));
    let response = get(app, "/").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("You are not signed in"));
    assert!(body.contains("/Account/Login"));
}

#[tokio::test]
async fn home_greets_the_signed_in_user() {
    let app = common::test_app(Arc::new(StubProvider::signed_in()));
    let response = get(app, "/").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("Hello, Jane Doe"));
    assert!(body.contains("/Account/Logout"));
}

#[tokio::test]
async fn profile_shows_identity_and_decoded_tokens() {
    let stub = Arc::new(StubProvider::signed_in());
    let app = common::test_app(stub.clone());

    let response = get(app, "/Account/Profile").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CACHE_CONTROL).map(|v| v.as_bytes()),
        Some(b"no-store".as_slice())
    );

    let raw_token = stub.identity.lock().unwrap().as_ref().unwrap().id_token.clone();
    let body = body_text(response).await;
    assert!(body.contains("Jane Doe"));
    assert!(body.contains("jane@example.com"));
    assert!(body.contains("Roles: admin"));
    assert!(body.contains("https://cdn.example.com/jane.png"));
    assert!(body.contains(&raw_token));
    // Pretty-printed payload, HTML-escaped by the template engine.
    assert!(body.contains("&quot;sub&quot;: &quot;user-123&quot;"));
}

#[tokio::test]
async fn claims_lists_all_claims_in_order() {
    let app = common::test_app(Arc::new(StubProvider::signed_in()));
    let response = get(app, "/Account/Claims").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_text(response).await;
    let sub = body.find("user-123").expect("sub claim");
    let email = body.find("jane@example.com").expect("email claim");
    let role = body.find(">admin<").expect("role claim");
    assert!(sub < email && email < role);
}

#[tokio::test]
async fn logout_runs_both_sign_outs_and_returns_home() {
    let stub = Arc::new(StubProvider::signed_in());
    let app = common::test_app(stub.clone());

    let response = get(app, "/Account/Logout").await;
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&response), "http://demo.example.com/");
    assert_eq!(stub.provider_sign_outs.load(Ordering::SeqCst), 1);
    assert_eq!(stub.local_sign_outs.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn logout_prefers_the_provider_end_session_url() {
    let stub = Arc::new(
        StubProvider::signed_in()
            .with_end_session_url("https://idp.example.com/logout?post_logout_redirect_uri=x"),
    );
    let app = common::test_app(stub.clone());

    let response = get(app, "/Account/Logout").await;
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(
        location(&response),
        "https://idp.example.com/logout?post_logout_redirect_uri=x"
    );
}

#[tokio::test]
async fn logout_still_clears_the_local_session_when_the_provider_fails() {
    let stub = Arc::new(StubProvider::signed_in().with_failing_provider_sign_out());
    let app = common::test_app(stub.clone());

    let response = get(app, "/Account/Logout").await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(stub.provider_sign_outs.load(Ordering::SeqCst), 1);
    assert_eq!(stub.local_sign_outs.load(Ordering::SeqCst), 1);
    assert!(stub.identity.lock().unwrap().is_none());
}

#[tokio::test]
async fn access_denied_is_public() {
    let app = common::test_app(Arc::new(StubProvider::anonymous()));
    let response = get(app, "/Account/AccessDenied").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("Access denied"));
}
