pub mod config;
pub mod dtos;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod startup;
pub mod utils;

use axum::{
    extract::MatchedPath,
    http::{header, HeaderName, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use service_core::middleware::{
    create_ip_rate_limiter, ip_rate_limit_middleware, metrics_middleware,
    request_id_middleware, security_headers_middleware, IpRateLimiter, REQUEST_ID_HEADER,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::PromoConfig;
use crate::services::{
    ActivityNotifier, Clock, CodeApplier, ConfiguredAdmin, CredentialVerifier, JwtService,
    PromoCodeRegistry, RedemptionEngine, StoreHealth, Stores, TokenService,
};

#[derive(Clone)]
pub struct AppState {
    pub config: PromoConfig,
    pub registry: Arc<PromoCodeRegistry>,
    pub tokens: Arc<TokenService>,
    pub engine: RedemptionEngine,
    pub notifier: Arc<ActivityNotifier>,
    pub jwt: JwtService,
    pub credentials: Arc<dyn CredentialVerifier>,
    pub health: Arc<dyn StoreHealth>,
    pub clock: Arc<dyn Clock>,
    pub redeem_rate_limiter: IpRateLimiter,
}

impl AppState {
    /// Wire every component over one storage backend.
    pub fn new(
        config: PromoConfig,
        stores: Stores,
        applier: Arc<dyn CodeApplier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let registry = Arc::new(PromoCodeRegistry::new(
            stores.promo_codes.clone(),
            clock.clone(),
            Duration::from_secs(config.cache.ttl_seconds),
        ));
        let tokens = Arc::new(TokenService::new(
            stores.tokens.clone(),
            stores.promo_codes.clone(),
            clock.clone(),
            config.tokens.length,
            config.tokens.default_expiry_days,
        ));
        let notifier = Arc::new(ActivityNotifier::new(
            stores.events.clone(),
            config.activity.capacity,
        ));
        let engine = RedemptionEngine::new(
            stores.tokens.clone(),
            stores.promo_codes.clone(),
            registry.clone(),
            applier,
            notifier.clone(),
            clock.clone(),
        );
        let credentials: Arc<dyn CredentialVerifier> = Arc::new(ConfiguredAdmin::new(
            config.admin.username.clone(),
            config.admin.password_hash.clone(),
        ));
        let redeem_rate_limiter = create_ip_rate_limiter(
            config.rate_limit.redeem_attempts,
            config.rate_limit.redeem_window_seconds,
        );

        Self {
            jwt: JwtService::new(&config.admin),
            config,
            registry,
            tokens,
            engine,
            notifier,
            credentials,
            health: stores.health,
            clock,
            redeem_rate_limiter,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let admin_routes = Router::new()
        .route(
            "/admin/promo-codes",
            get(handlers::promo_codes::list_promo_codes)
                .post(handlers::promo_codes::create_promo_code),
        )
        .route(
            "/admin/promo-codes/:id",
            get(handlers::promo_codes::get_promo_code)
                .patch(handlers::promo_codes::update_promo_code)
                .delete(handlers::promo_codes::delete_promo_code),
        )
        .route(
            "/admin/tokens",
            get(handlers::tokens::list_tokens).post(handlers::tokens::generate_token),
        )
        .route(
            "/admin/tokens/:token",
            get(handlers::tokens::get_token).delete(handlers::tokens::delete_token),
        )
        .route("/admin/events", get(handlers::events::list_events))
        .route("/admin/events/recent", get(handlers::events::recent_events))
        .route("/admin/events/stream", get(handlers::events::stream_events))
        .layer(from_fn_with_state(
            state.clone(),
            middleware::admin_auth_middleware,
        ));

    let redeem_route = Router::new()
        .route("/redeem", post(handlers::redeem::redeem))
        .layer(from_fn_with_state(
            state.redeem_rate_limiter.clone(),
            ip_rate_limit_middleware,
        ));

    let cors = CorsLayer::new()
        .allow_origin(
            state
                .config
                .security
                .allowed_origins
                .iter()
                .filter_map(|origin| match origin.parse::<HeaderValue>() {
                    Ok(value) => Some(value),
                    Err(e) => {
                        tracing::error!("Invalid CORS origin '{}': {}. Skipping.", origin, e);
                        None
                    }
                })
                .collect::<Vec<HeaderValue>>(),
        )
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static(REQUEST_ID_HEADER),
        ]);

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check))
        .route("/metrics", get(handlers::health::metrics))
        .route("/tokens/:token", get(handlers::tokens::get_public_token))
        .route("/admin/login", post(handlers::auth::login))
        .merge(redeem_route)
        .merge(admin_routes)
        .with_state(state)
        .layer(from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(
            |request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");
                // Route template, not the raw URI, so token path segments stay out of logs.
                let route = request
                    .extensions()
                    .get::<MatchedPath>()
                    .map(|path| path.as_str())
                    .unwrap_or("unmatched");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    route = %route,
                    version = ?request.version(),
                )
            },
        ))
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(cors)
}
