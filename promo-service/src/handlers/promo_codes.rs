use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;

use crate::{
    dtos::{
        CreatePromoCodeRequest, ListPromoCodesQuery, ListResponse, PromoCodeResponse,
        UpdatePromoCodeRequest,
    },
    middleware::AdminUser,
    utils::ValidatedJson,
    AppState,
};

pub async fn list_promo_codes(
    State(state): State<AppState>,
    Query(query): Query<ListPromoCodesQuery>,
) -> Result<Json<ListResponse<PromoCodeResponse>>, AppError> {
    let (filter, page) = query.into_parts();
    let result = state.registry.list(filter, page).await?;
    Ok(Json(ListResponse::from_page(result, PromoCodeResponse::from)))
}

pub async fn create_promo_code(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    ValidatedJson(req): ValidatedJson<CreatePromoCodeRequest>,
) -> Result<(StatusCode, Json<PromoCodeResponse>), AppError> {
    let promo = state.registry.create(req.into()).await?;
    tracing::info!(admin = %admin.sub, promo_code_id = %promo.id, "Promo code created via admin API");
    Ok((StatusCode::CREATED, Json(promo.into())))
}

pub async fn get_promo_code(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PromoCodeResponse>, AppError> {
    let promo = state.registry.get(&id).await?;
    Ok(Json(promo.into()))
}

pub async fn update_promo_code(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
    ValidatedJson(req): ValidatedJson<UpdatePromoCodeRequest>,
) -> Result<Json<PromoCodeResponse>, AppError> {
    let promo = state.registry.update(&id, req.into()).await?;
    tracing::info!(admin = %admin.sub, promo_code_id = %promo.id, "Promo code updated via admin API");
    Ok(Json(promo.into()))
}

pub async fn delete_promo_code(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.registry.delete(&id).await?;
    tracing::info!(admin = %admin.sub, promo_code_id = %id, "Promo code deleted via admin API");
    Ok(StatusCode::NO_CONTENT)
}
