use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::{PromoCode, Token};
use crate::services::{NewToken, Page, TokenFilter};

/// Shown instead of the promo code while a token is still unused.
pub const MASKED_CODE: &str = "********";

#[derive(Debug, Deserialize, Validate)]
pub struct GenerateTokenRequest {
    #[validate(length(min = 1, message = "promo_code_id is required"))]
    pub promo_code_id: String,

    #[validate(length(min = 1, max = 64, message = "custom_token must be 1-64 characters"))]
    pub custom_token: Option<String>,

    #[validate(range(min = 1, max = 3650, message = "expires_in_days must be between 1 and 3650"))]
    pub expires_in_days: Option<i64>,
}

impl From<GenerateTokenRequest> for NewToken {
    fn from(req: GenerateTokenRequest) -> Self {
        Self {
            promo_code_id: req.promo_code_id,
            custom_token: req.custom_token,
            expires_in_days: req.expires_in_days,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ListTokensQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub is_used: Option<bool>,
    pub promo_code_id: Option<String>,
}

impl ListTokensQuery {
    pub fn into_parts(self) -> (TokenFilter, Page) {
        (
            TokenFilter {
                is_used: self.is_used,
                promo_code_id: self.promo_code_id,
            },
            Page::new(self.page, self.limit),
        )
    }
}

/// Full token record for the admin API.
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
    pub promo_code_id: String,
    pub promo_code: Option<String>,
    pub is_used: bool,
    pub used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl TokenResponse {
    pub fn new(token: Token, promo: Option<&PromoCode>) -> Self {
        Self {
            promo_code: promo.map(|p| p.code.clone()),
            token: token.token,
            promo_code_id: token.promo_code_id,
            is_used: token.is_used,
            used_at: token.used_at,
            created_at: token.created_at,
            expires_at: token.expires_at,
            ip_address: token.ip_address,
            user_agent: token.user_agent,
        }
    }
}

/// What a token holder may see before redeeming.
#[derive(Debug, Serialize, Deserialize)]
pub struct PublicTokenResponse {
    pub token: String,
    pub promo_code: Option<String>,
    pub description: Option<String>,
    pub is_used: bool,
    pub is_expired: bool,
    pub used_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl PublicTokenResponse {
    pub fn new(token: Token, promo: Option<PromoCode>, now: DateTime<Utc>) -> Self {
        let is_expired = token.is_expired(now);
        let (promo_code, description) = match promo {
            Some(p) if token.is_used => (Some(p.code), p.description),
            Some(p) => (Some(MASKED_CODE.to_string()), p.description),
            None => (None, None),
        };
        Self {
            token: token.token,
            promo_code,
            description,
            is_used: token.is_used,
            is_expired,
            used_at: token.used_at,
            expires_at: token.expires_at,
        }
    }
}
