mod common;

use axum::http::{Method, StatusCode};
use common::{TestApp, ADMIN_PASSWORD, ADMIN_USERNAME};
use promo_service::services::JwtService;
use serde_json::json;

#[tokio::test]
async fn login_returns_bearer_token() {
    let app = TestApp::spawn();

    let (status, body) = app
        .request(
            Method::POST,
            "/admin/login",
            Some(json!({ "username": ADMIN_USERNAME, "password": ADMIN_PASSWORD })),
            None,
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["token_type"], "Bearer");
    assert_eq!(body["expires_in"], 24 * 3600);
    assert!(body["access_token"].as_str().unwrap().contains('.'));
}

#[tokio::test]
async fn wrong_credentials_are_unauthorized() {
    let app = TestApp::spawn();

    for (username, password) in [(ADMIN_USERNAME, "wrong"), ("someone", ADMIN_PASSWORD)] {
        let (status, body) = app
            .request(
                Method::POST,
                "/admin/login",
                Some(json!({ "username": username, "password": password })),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Invalid username or password");
    }
}

#[tokio::test]
async fn admin_routes_require_session() {
    let app = TestApp::spawn();

    let (status, _) = app
        .request(Method::GET, "/admin/promo-codes", None, None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .request(Method::GET, "/admin/tokens", None, Some("garbage"))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn non_admin_role_is_forbidden() {
    let app = TestApp::spawn();
    let jwt = JwtService::new(&app.state.config.admin);
    let (token, _) = jwt.issue_with_role("viewer", "viewer").unwrap();

    let (status, body) = app
        .request(Method::GET, "/admin/promo-codes", None, Some(&token))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Admin access required");
}

#[tokio::test]
async fn public_routes_do_not_require_session() {
    let app = TestApp::spawn();

    let (status, _) = app.request(Method::GET, "/tokens/ANYTOKEN", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.redeem("ANYTOKEN").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
