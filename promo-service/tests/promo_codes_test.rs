mod common;

use axum::http::{Method, StatusCode};
use common::TestApp;
use serde_json::json;

#[tokio::test]
async fn create_and_fetch_promo_code() {
    let app = TestApp::spawn();
    let admin = app.login().await;

    let (status, created) = app
        .request(
            Method::POST,
            "/admin/promo-codes",
            Some(json!({ "code": "  SPRING20 ", "description": "Spring sale", "max_usage": 5 })),
            Some(&admin),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["code"], "SPRING20");
    assert_eq!(created["is_active"], true);
    assert_eq!(created["usage_count"], 0);
    assert_eq!(created["remaining_uses"], 5);

    let (status, fetched) = app
        .request(
            Method::GET,
            &format!("/admin/promo-codes/{}", created["id"].as_str().unwrap()),
            None,
            Some(&admin),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["description"], "Spring sale");
}

#[tokio::test]
async fn duplicate_code_conflicts() {
    let app = TestApp::spawn();
    let admin = app.login().await;
    app.create_promo_code(&admin, "ETSY10", None).await;

    let (status, body) = app
        .request(
            Method::POST,
            "/admin/promo-codes",
            Some(json!({ "code": "ETSY10" })),
            Some(&admin),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Promo code already exists");
}

#[tokio::test]
async fn invalid_promo_code_payloads_are_rejected() {
    let app = TestApp::spawn();
    let admin = app.login().await;

    let (status, _) = app
        .request(
            Method::POST,
            "/admin/promo-codes",
            Some(json!({ "code": "" })),
            Some(&admin),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = app
        .request(
            Method::POST,
            "/admin/promo-codes",
            Some(json!({ "code": "ZERO", "max_usage": 0 })),
            Some(&admin),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = app
        .request(
            Method::POST,
            "/admin/promo-codes",
            Some(json!({ "description": "no code" })),
            Some(&admin),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn list_is_paginated_and_filtered() {
    let app = TestApp::spawn();
    let admin = app.login().await;
    for code in ["A1", "A2", "A3"] {
        app.create_promo_code(&admin, code, None).await;
    }
    let paused = app.create_promo_code(&admin, "P1", None).await;
    app.request(
        Method::PATCH,
        &format!("/admin/promo-codes/{}", paused["id"].as_str().unwrap()),
        Some(json!({ "is_active": false })),
        Some(&admin),
    )
    .await;

    let (status, page) = app
        .request(Method::GET, "/admin/promo-codes?page=1&limit=3", None, Some(&admin))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["data"].as_array().unwrap().len(), 3);
    assert_eq!(
        page["pagination"],
        json!({ "total": 4, "page": 1, "limit": 3, "pages": 2 })
    );

    let (_, inactive) = app
        .request(Method::GET, "/admin/promo-codes?is_active=false", None, Some(&admin))
        .await;
    assert_eq!(inactive["pagination"]["total"], 1);
    assert_eq!(inactive["data"][0]["code"], "P1");
}

#[tokio::test]
async fn update_can_clear_usage_cap() {
    let app = TestApp::spawn();
    let admin = app.login().await;
    let promo = app.create_promo_code(&admin, "CAPPED", Some(3)).await;
    let uri = format!("/admin/promo-codes/{}", promo["id"].as_str().unwrap());

    let (status, updated) = app
        .request(
            Method::PATCH,
            &uri,
            Some(json!({ "description": "now unlimited", "max_usage": null })),
            Some(&admin),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["max_usage"], serde_json::Value::Null);
    assert_eq!(updated["remaining_uses"], serde_json::Value::Null);
    assert_eq!(updated["description"], "now unlimited");
    assert_eq!(updated["code"], "CAPPED");
}

#[tokio::test]
async fn missing_promo_code_is_not_found() {
    let app = TestApp::spawn();
    let admin = app.login().await;

    for method in [Method::GET, Method::DELETE] {
        let (status, _) = app
            .request(method, "/admin/promo-codes/unknown-id", None, Some(&admin))
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    let (status, _) = app
        .request(
            Method::PATCH,
            "/admin/promo-codes/unknown-id",
            Some(json!({ "is_active": false })),
            Some(&admin),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
