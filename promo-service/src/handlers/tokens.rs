use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;
use std::collections::HashMap;

use crate::{
    dtos::{
        GenerateTokenRequest, ListResponse, ListTokensQuery, PublicTokenResponse, TokenResponse,
    },
    middleware::AdminUser,
    models::PromoCode,
    services::ServiceError,
    utils::{TokenPrefix, ValidatedJson},
    AppState,
};

/// Public token lookup. The promo code stays masked until the token is used.
pub async fn get_public_token(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<PublicTokenResponse>, AppError> {
    let (token, promo) = state.tokens.get_with_promo_code(&token).await?;
    Ok(Json(PublicTokenResponse::new(
        token,
        promo,
        state.clock.now(),
    )))
}

pub async fn list_tokens(
    State(state): State<AppState>,
    Query(query): Query<ListTokensQuery>,
) -> Result<Json<ListResponse<TokenResponse>>, AppError> {
    let (filter, page) = query.into_parts();
    let result = state.tokens.list(filter, page).await?;

    let mut codes: HashMap<String, Option<PromoCode>> = HashMap::new();
    for token in &result.items {
        if codes.contains_key(&token.promo_code_id) {
            continue;
        }
        let promo = match state.registry.get(&token.promo_code_id).await {
            Ok(promo) => Some(promo),
            Err(ServiceError::PromoCodeNotFound) => None,
            Err(e) => return Err(e.into()),
        };
        codes.insert(token.promo_code_id.clone(), promo);
    }

    Ok(Json(ListResponse::from_page(result, |token| {
        let promo = codes.get(&token.promo_code_id).and_then(|p| p.as_ref());
        TokenResponse::new(token, promo)
    })))
}

pub async fn generate_token(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    ValidatedJson(req): ValidatedJson<GenerateTokenRequest>,
) -> Result<(StatusCode, Json<TokenResponse>), AppError> {
    let (token, promo) = state.tokens.generate(req.into()).await?;
    tracing::info!(
        admin = %admin.sub,
        token = %TokenPrefix(&token.token),
        "Token issued via admin API"
    );
    Ok((
        StatusCode::CREATED,
        Json(TokenResponse::new(token, Some(&promo))),
    ))
}

pub async fn get_token(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<TokenResponse>, AppError> {
    let (token, promo) = state.tokens.get_with_promo_code(&token).await?;
    Ok(Json(TokenResponse::new(token, promo.as_ref())))
}

pub async fn delete_token(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(token): Path<String>,
) -> Result<StatusCode, AppError> {
    state.tokens.delete(&token).await?;
    tracing::info!(
        admin = %admin.sub,
        token = %TokenPrefix(&token),
        "Token deleted via admin API"
    );
    Ok(StatusCode::NO_CONTENT)
}
