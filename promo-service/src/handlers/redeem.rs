use axum::{
    extract::{rejection::JsonRejection, ConnectInfo, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use service_core::middleware::{client_ip, RequestId};
use std::net::SocketAddr;

use crate::{
    dtos::{RedeemRequest, RedeemResponse},
    services::{RedemptionContext, RedemptionError},
    AppState,
};

/// Redeem a one-time token.
///
/// The engine runs on its own task, so a client that disconnects mid-request
/// does not abandon a claimed token before its outcome is recorded.
///
/// Every response, including one for an unreadable body, carries the
/// redemption shape. A body without a usable `token` string is treated as
/// a missing token.
pub async fn redeem(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    request_id: Option<Extension<RequestId>>,
    headers: HeaderMap,
    payload: Result<Json<RedeemRequest>, JsonRejection>,
) -> Response {
    let req = match payload {
        Ok(Json(req)) => req,
        Err(rejection) => {
            tracing::debug!(error = %rejection.body_text(), "Unreadable redeem body");
            return RedemptionError::MissingToken.into_response();
        }
    };

    let context = RedemptionContext {
        ip_address: client_ip(&headers, connect_info.map(|ConnectInfo(addr)| addr))
            .map(|ip| ip.to_string()),
        user_agent: headers
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string()),
        request_id: request_id.map(|Extension(RequestId(id))| id),
    };
    let token = req.token.unwrap_or_default();

    let engine = state.engine.clone();
    let handle = tokio::spawn(async move { engine.redeem(&token, context).await });

    match handle.await {
        Ok(Ok(result)) => (StatusCode::OK, Json(RedeemResponse::from(result))).into_response(),
        Ok(Err(rejection)) => rejection.into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Redemption task failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(RedeemResponse {
                    success: false,
                    message: "Server error".to_string(),
                    token_consumed: false,
                    error: Some("internal_error".to_string()),
                    error_code: None,
                }),
            )
                .into_response()
        }
    }
}
