use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use validator::Validate;

use crate::models::PromoCode;
use crate::services::{NewPromoCode, Page, PromoCodeChanges, PromoCodeFilter};

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePromoCodeRequest {
    #[validate(length(min = 1, max = 64, message = "Promo code must be 1-64 characters"))]
    pub code: String,

    #[validate(length(max = 500, message = "Description must be at most 500 characters"))]
    pub description: Option<String>,

    #[validate(range(min = 1, message = "max_usage must be a positive integer"))]
    pub max_usage: Option<i64>,
}

impl From<CreatePromoCodeRequest> for NewPromoCode {
    fn from(req: CreatePromoCodeRequest) -> Self {
        Self {
            code: req.code,
            description: req.description,
            max_usage: req.max_usage,
        }
    }
}

/// Absent field leaves the value alone; `"max_usage": null` clears the cap.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdatePromoCodeRequest {
    #[validate(length(min = 1, max = 64, message = "Promo code must be 1-64 characters"))]
    pub code: Option<String>,

    #[validate(length(max = 500, message = "Description must be at most 500 characters"))]
    pub description: Option<String>,

    pub is_active: Option<bool>,

    #[serde(default, deserialize_with = "double_option")]
    pub max_usage: Option<Option<i64>>,
}

fn double_option<'de, D>(deserializer: D) -> Result<Option<Option<i64>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<i64>::deserialize(deserializer).map(Some)
}

impl From<UpdatePromoCodeRequest> for PromoCodeChanges {
    fn from(req: UpdatePromoCodeRequest) -> Self {
        Self {
            code: req.code,
            description: req.description,
            is_active: req.is_active,
            max_usage: req.max_usage,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ListPromoCodesQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub is_active: Option<bool>,
}

impl ListPromoCodesQuery {
    pub fn into_parts(self) -> (PromoCodeFilter, Page) {
        (
            PromoCodeFilter {
                is_active: self.is_active,
            },
            Page::new(self.page, self.limit),
        )
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PromoCodeResponse {
    pub id: String,
    pub code: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub usage_count: i64,
    pub max_usage: Option<i64>,
    pub remaining_uses: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<PromoCode> for PromoCodeResponse {
    fn from(promo: PromoCode) -> Self {
        Self {
            remaining_uses: promo.remaining_uses(),
            id: promo.id,
            code: promo.code,
            description: promo.description,
            is_active: promo.is_active,
            usage_count: promo.usage_count,
            max_usage: promo.max_usage,
            created_at: promo.created_at,
            updated_at: promo.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_distinguishes_null_from_absent() {
        let absent: UpdatePromoCodeRequest = serde_json::from_str(r#"{"is_active": false}"#).unwrap();
        assert_eq!(absent.max_usage, None);

        let cleared: UpdatePromoCodeRequest = serde_json::from_str(r#"{"max_usage": null}"#).unwrap();
        assert_eq!(cleared.max_usage, Some(None));

        let set: UpdatePromoCodeRequest = serde_json::from_str(r#"{"max_usage": 5}"#).unwrap();
        assert_eq!(set.max_usage, Some(Some(5)));
    }

    #[test]
    fn test_create_rejects_zero_cap() {
        let req = CreatePromoCodeRequest {
            code: "ETSY10".to_string(),
            description: None,
            max_usage: Some(0),
        };
        assert!(req.validate().is_err());
    }
}
