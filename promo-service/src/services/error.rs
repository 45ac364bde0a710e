use service_core::error::AppError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    Database(#[from] mongodb::error::Error),

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),

    #[error("Promo code already exists")]
    DuplicateCode,

    #[error("Token already exists")]
    DuplicateToken,

    #[error("Promo code not found")]
    PromoCodeNotFound,

    #[error("Token not found")]
    TokenNotFound,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Database(e) => AppError::DatabaseError(anyhow::Error::new(e)),
            ServiceError::StorageUnavailable(e) => AppError::DatabaseError(anyhow::anyhow!(e)),
            ServiceError::Internal(e) => AppError::InternalError(e),
            ServiceError::DuplicateCode => {
                AppError::Conflict(anyhow::anyhow!("Promo code already exists"))
            }
            ServiceError::DuplicateToken => AppError::Conflict(anyhow::anyhow!("Token already exists")),
            ServiceError::PromoCodeNotFound => {
                AppError::NotFound(anyhow::anyhow!("Promo code not found"))
            }
            ServiceError::TokenNotFound => AppError::NotFound(anyhow::anyhow!("Token not found")),
            ServiceError::InvalidCredentials => {
                AppError::Unauthorized(anyhow::anyhow!("Invalid credentials"))
            }
            ServiceError::Validation(e) => AppError::BadRequest(anyhow::anyhow!(e)),
        }
    }
}
