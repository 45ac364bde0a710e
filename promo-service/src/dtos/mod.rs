pub mod auth;
pub mod event;
pub mod promo_code;
pub mod redemption;
pub mod token;

use serde::{Deserialize, Serialize};

use crate::services::Paginated;

pub use auth::{LoginRequest, LoginResponse};
pub use event::{EventResponse, EventsQuery};
pub use promo_code::{
    CreatePromoCodeRequest, ListPromoCodesQuery, PromoCodeResponse, UpdatePromoCodeRequest,
};
pub use redemption::{RedeemRequest, RedeemResponse};
pub use token::{GenerateTokenRequest, ListTokensQuery, PublicTokenResponse, TokenResponse};

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct PaginationMeta {
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub pages: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListResponse<T> {
    pub data: Vec<T>,
    pub pagination: PaginationMeta,
}

impl<T> ListResponse<T> {
    pub fn from_page<U>(page: Paginated<U>, map: impl Fn(U) -> T) -> Self {
        let pagination = PaginationMeta {
            total: page.total,
            page: page.page.page,
            limit: page.page.limit,
            pages: page.pages(),
        };
        Self {
            data: page.items.into_iter().map(map).collect(),
            pagination,
        }
    }
}
