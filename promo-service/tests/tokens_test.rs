mod common;

use axum::http::{Method, StatusCode};
use common::TestApp;
use promo_service::services::tokens::TOKEN_ALPHABET;
use serde_json::json;

#[tokio::test]
async fn generated_token_has_expected_shape() {
    let app = TestApp::spawn();
    let admin = app.login().await;
    let promo = app.create_promo_code(&admin, "ETSY10", None).await;

    let token = app
        .issue_token(&admin, promo["id"].as_str().unwrap(), None)
        .await;

    let value = token["token"].as_str().unwrap();
    assert_eq!(value.len(), 8);
    assert!(value.bytes().all(|b| TOKEN_ALPHABET.contains(&b)));
    assert_eq!(token["is_used"], false);
    assert_eq!(token["promo_code"], "ETSY10");
    assert!(token["expires_at"].is_string());
}

#[tokio::test]
async fn token_for_unknown_promo_code_is_not_found() {
    let app = TestApp::spawn();
    let admin = app.login().await;

    let (status, _) = app
        .request(
            Method::POST,
            "/admin/tokens",
            Some(json!({ "promo_code_id": "missing" })),
            Some(&admin),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn duplicate_custom_token_conflicts() {
    let app = TestApp::spawn();
    let admin = app.login().await;
    let promo = app.create_promo_code(&admin, "ETSY10", None).await;
    let promo_id = promo["id"].as_str().unwrap();
    app.issue_token(&admin, promo_id, Some("VIPGUEST")).await;

    let (status, _) = app
        .request(
            Method::POST,
            "/admin/tokens",
            Some(json!({ "promo_code_id": promo_id, "custom_token": "VIPGUEST" })),
            Some(&admin),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn public_lookup_masks_code_until_used() {
    let app = TestApp::spawn();
    let admin = app.login().await;
    let promo = app.create_promo_code(&admin, "ETSY10", None).await;
    app.issue_token(&admin, promo["id"].as_str().unwrap(), Some("ABC12345"))
        .await;

    let (status, before) = app.request(Method::GET, "/tokens/ABC12345", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(before["promo_code"], "********");
    assert_eq!(before["is_used"], false);
    assert_eq!(before["is_expired"], false);

    app.redeem("ABC12345").await;

    let (_, after) = app.request(Method::GET, "/tokens/ABC12345", None, None).await;
    assert_eq!(after["promo_code"], "ETSY10");
    assert_eq!(after["is_used"], true);

    let (status, _) = app.request(Method::GET, "/tokens/NOPE0000", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn list_filters_by_usage_and_promo_code() {
    let app = TestApp::spawn();
    let admin = app.login().await;
    let first = app.create_promo_code(&admin, "FIRST", None).await;
    let second = app.create_promo_code(&admin, "SECOND", None).await;
    let first_id = first["id"].as_str().unwrap();
    let second_id = second["id"].as_str().unwrap();

    app.issue_token(&admin, first_id, Some("FIRST001")).await;
    app.issue_token(&admin, first_id, Some("FIRST002")).await;
    app.issue_token(&admin, second_id, Some("SECOND01")).await;
    app.redeem("FIRST001").await;

    let (_, used) = app
        .request(Method::GET, "/admin/tokens?is_used=true", None, Some(&admin))
        .await;
    assert_eq!(used["pagination"]["total"], 1);
    assert_eq!(used["data"][0]["token"], "FIRST001");
    assert_eq!(used["data"][0]["promo_code"], "FIRST");

    let (_, by_code) = app
        .request(
            Method::GET,
            &format!("/admin/tokens?promo_code_id={}", second_id),
            None,
            Some(&admin),
        )
        .await;
    assert_eq!(by_code["pagination"]["total"], 1);
    assert_eq!(by_code["data"][0]["token"], "SECOND01");
}

#[tokio::test]
async fn delete_token_removes_it() {
    let app = TestApp::spawn();
    let admin = app.login().await;
    let promo = app.create_promo_code(&admin, "ETSY10", None).await;
    app.issue_token(&admin, promo["id"].as_str().unwrap(), Some("DELETE01"))
        .await;

    let (status, _) = app
        .request(Method::DELETE, "/admin/tokens/DELETE01", None, Some(&admin))
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app
        .request(Method::DELETE, "/admin/tokens/DELETE01", None, Some(&admin))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.redeem("DELETE01").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
