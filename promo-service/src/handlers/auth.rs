use axum::{extract::State, Json};
use service_core::error::AppError;

use crate::{
    dtos::{LoginRequest, LoginResponse},
    utils::{Password, ValidatedJson},
    AppState,
};

/// Exchange admin credentials for a session token.
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let password = Password::new(req.password);
    let valid = state.credentials.verify(&req.username, &password).await?;

    if !valid {
        tracing::warn!(username = %req.username, "Failed admin login");
        return Err(AppError::Unauthorized(anyhow::anyhow!(
            "Invalid username or password"
        )));
    }

    let (access_token, expires_in) = state.jwt.issue(&req.username)?;
    tracing::info!(username = %req.username, "Admin logged in");

    Ok(Json(LoginResponse {
        access_token,
        token_type: "Bearer".to_string(),
        expires_in,
    }))
}
