mod common;

use axum::http::{Method, StatusCode};
use common::TestApp;
use promo_service::services::MockCodeApplier;

#[tokio::test]
async fn redemption_publishes_processing_and_outcome_events() {
    let app = TestApp::spawn();
    let admin = app.login().await;
    let promo = app.create_promo_code(&admin, "ETSY10", None).await;
    app.issue_token(&admin, promo["id"].as_str().unwrap(), Some("ABC12345"))
        .await;
    app.redeem("ABC12345").await;

    let (status, recent) = app
        .request(Method::GET, "/admin/events/recent", None, Some(&admin))
        .await;
    assert_eq!(status, StatusCode::OK);
    let recent = recent.as_array().unwrap();
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0]["status"], "success");
    assert_eq!(recent[0]["promo_code"], "ETSY10");
    assert_eq!(recent[1]["status"], "processing");

    let (status, history) = app
        .request(Method::GET, "/admin/events?limit=1", None, Some(&admin))
        .await;
    assert_eq!(status, StatusCode::OK);
    let history = history.as_array().unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["token"], "ABC12345");
}

#[tokio::test]
async fn failed_application_event_carries_details() {
    let app = TestApp::with_applier(MockCodeApplier::rejecting("Error: expired on site"));
    let admin = app.login().await;
    let promo = app.create_promo_code(&admin, "ETSY10", None).await;
    app.issue_token(&admin, promo["id"].as_str().unwrap(), Some("ABC12345"))
        .await;
    app.redeem("ABC12345").await;

    let (_, recent) = app
        .request(Method::GET, "/admin/events/recent?limit=1", None, Some(&admin))
        .await;
    assert_eq!(recent[0]["status"], "error");
    assert_eq!(recent[0]["success"], false);
    assert_eq!(recent[0]["error_details"], "Error: expired on site");
}

#[tokio::test]
async fn rejected_redemptions_publish_no_events() {
    let app = TestApp::spawn();
    let admin = app.login().await;
    app.redeem("does-not-exist").await;

    let (_, recent) = app
        .request(Method::GET, "/admin/events/recent", None, Some(&admin))
        .await;
    assert!(recent.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn subscribers_see_live_events() {
    let app = TestApp::spawn();
    let admin = app.login().await;
    let promo = app.create_promo_code(&admin, "ETSY10", None).await;
    app.issue_token(&admin, promo["id"].as_str().unwrap(), Some("LIVE0001"))
        .await;

    let mut rx = app.state.notifier.subscribe();
    app.redeem("LIVE0001").await;

    let first = rx.recv().await.unwrap();
    let second = rx.recv().await.unwrap();
    assert_eq!(first.token, "LIVE0001");
    assert_eq!(first.status.to_string(), "processing");
    assert_eq!(second.status.to_string(), "success");
}

#[tokio::test]
async fn event_stream_endpoint_is_sse() {
    let app = TestApp::spawn();
    let admin = app.login().await;

    let request = axum::http::Request::builder()
        .uri("/admin/events/stream")
        .header("authorization", format!("Bearer {}", admin))
        .body(axum::body::Body::empty())
        .unwrap();
    let response = tower::ServiceExt::oneshot(app.router.clone(), request)
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"],
        "text/event-stream"
    );
}
