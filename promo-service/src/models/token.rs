use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use super::opt_chrono_datetime_as_bson_datetime;

/// A one-time redemption key bound to a single promo code.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Token {
    #[serde(rename = "_id")]
    pub id: String,
    pub token: String,
    pub promo_code_id: String,
    pub is_used: bool,
    #[serde(default, with = "opt_chrono_datetime_as_bson_datetime")]
    pub used_at: Option<DateTime<Utc>>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(default, with = "opt_chrono_datetime_as_bson_datetime")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub ip_address: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl Token {
    pub fn new(
        token: String,
        promo_code_id: String,
        now: DateTime<Utc>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            token,
            promo_code_id,
            is_used: false,
            used_at: None,
            created_at: now,
            expires_at,
            ip_address: None,
            user_agent: None,
        }
    }

    /// Expired once `expires_at` is strictly in the past.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        matches!(self.expires_at, Some(at) if at < now)
    }
}
