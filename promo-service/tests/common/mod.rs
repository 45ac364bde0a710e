//! Test helpers for promo-service integration tests.
//!
//! Builds the full router over the in-memory backend, a scripted code
//! applier and a manual clock, and drives it with `oneshot`.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use promo_service::{
    build_router,
    config::{
        ActivityConfig, AdminConfig, ApplierConfig, ApplierMode, CacheConfig, Environment,
        MongoConfig, PromoConfig, RateLimitConfig, SecurityConfig, StorageBackend,
        StorageConfig, TokenConfig,
    },
    services::{InMemoryStore, ManualClock, MockCodeApplier, Stores},
    utils::{hash_password, Password},
    AppState,
};
use serde_json::{json, Value};
use std::sync::{Arc, OnceLock};
use tower::util::ServiceExt;

pub const ADMIN_USERNAME: &str = "admin";
pub const ADMIN_PASSWORD: &str = "test-admin-password";
pub const JWT_SECRET: &str = "test-jwt-secret-that-is-long-enough-123";

fn admin_password_hash() -> String {
    static HASH: OnceLock<String> = OnceLock::new();
    HASH.get_or_init(|| {
        hash_password(&Password::new(ADMIN_PASSWORD.to_string()))
            .expect("Failed to hash test password")
            .into_string()
    })
    .clone()
}

pub fn test_config() -> PromoConfig {
    PromoConfig {
        common: service_core::config::Config::default(),
        environment: Environment::Dev,
        service_name: "promo-service-test".to_string(),
        log_level: "debug".to_string(),
        otlp_endpoint: None,
        storage: StorageConfig {
            backend: StorageBackend::Memory,
            mongodb: MongoConfig {
                uri: "mongodb://localhost:27017".to_string(),
                database: "promo_test".to_string(),
            },
        },
        admin: AdminConfig {
            username: ADMIN_USERNAME.to_string(),
            password_hash: admin_password_hash(),
            jwt_secret: JWT_SECRET.to_string(),
            session_hours: 24,
        },
        tokens: TokenConfig {
            length: 8,
            default_expiry_days: 7,
        },
        applier: ApplierConfig {
            mode: ApplierMode::Mock,
            endpoint: None,
            api_key: None,
        },
        cache: CacheConfig { ttl_seconds: 300 },
        activity: ActivityConfig { capacity: 50 },
        rate_limit: RateLimitConfig {
            redeem_attempts: 1000,
            redeem_window_seconds: 60,
        },
        security: SecurityConfig {
            allowed_origins: vec!["http://localhost:3000".to_string()],
        },
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub store: Arc<InMemoryStore>,
    pub applier: Arc<MockCodeApplier>,
    pub clock: Arc<ManualClock>,
}

impl TestApp {
    pub fn spawn() -> Self {
        Self::spawn_with(test_config(), MockCodeApplier::succeeding())
    }

    pub fn with_applier(applier: MockCodeApplier) -> Self {
        Self::spawn_with(test_config(), applier)
    }

    pub fn spawn_with(config: PromoConfig, applier: MockCodeApplier) -> Self {
        let store = Arc::new(InMemoryStore::new());
        let applier = Arc::new(applier);
        let clock = Arc::new(ManualClock::default());

        let state = AppState::new(
            config,
            Stores::from_backend(store.clone()),
            applier.clone(),
            clock.clone(),
        );
        let router = build_router(state.clone());

        Self {
            router,
            state,
            store,
            applier,
            clock,
        }
    }

    /// Send a request and return the status and JSON body (`Null` when empty).
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        bearer: Option<&str>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = bearer {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    pub async fn redeem(&self, token: &str) -> (StatusCode, Value) {
        self.request(Method::POST, "/redeem", Some(json!({ "token": token })), None)
            .await
    }

    pub async fn login(&self) -> String {
        let (status, body) = self
            .request(
                Method::POST,
                "/admin/login",
                Some(json!({ "username": ADMIN_USERNAME, "password": ADMIN_PASSWORD })),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {}", body);
        body["access_token"].as_str().unwrap().to_string()
    }

    pub async fn create_promo_code(&self, admin: &str, code: &str, max_usage: Option<i64>) -> Value {
        let (status, body) = self
            .request(
                Method::POST,
                "/admin/promo-codes",
                Some(json!({ "code": code, "max_usage": max_usage })),
                Some(admin),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create promo code failed: {}", body);
        body
    }

    pub async fn issue_token(&self, admin: &str, promo_code_id: &str, custom: Option<&str>) -> Value {
        let (status, body) = self
            .request(
                Method::POST,
                "/admin/tokens",
                Some(json!({ "promo_code_id": promo_code_id, "custom_token": custom })),
                Some(admin),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "issue token failed: {}", body);
        body
    }
}
