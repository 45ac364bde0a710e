use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};

use crate::{dtos::ErrorResponse, services::AdminClaims, AppState};

fn reject(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
        .into_response()
}

/// Require an admin session token on every wrapped route.
pub async fn admin_auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    let Some(token) = token else {
        return reject(
            StatusCode::UNAUTHORIZED,
            "Missing or invalid Authorization header",
        );
    };

    let claims = match state.jwt.validate(token) {
        Ok(claims) => claims,
        Err(e) => {
            tracing::warn!(error = %e, "Rejected admin session token");
            return reject(StatusCode::UNAUTHORIZED, "Invalid or expired token");
        }
    };

    if !claims.is_admin() {
        tracing::warn!(sub = %claims.sub, role = %claims.role, "Non-admin principal on admin route");
        return reject(StatusCode::FORBIDDEN, "Admin access required");
    }

    req.extensions_mut().insert(claims);
    next.run(req).await
}

/// The authenticated admin, available to handlers behind the middleware.
#[derive(Debug, Clone)]
pub struct AdminUser(pub AdminClaims);

#[axum::async_trait]
impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AdminClaims>()
            .cloned()
            .map(AdminUser)
            .ok_or_else(|| reject(StatusCode::UNAUTHORIZED, "Not authenticated"))
    }
}
