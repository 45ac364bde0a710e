use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

/// A discount code that tokens redeem.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PromoCode {
    #[serde(rename = "_id")]
    pub id: String,
    pub code: String,
    #[serde(default)]
    pub description: Option<String>,
    pub is_active: bool,
    pub usage_count: i64,
    /// `None` means unlimited.
    #[serde(default)]
    pub max_usage: Option<i64>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl PromoCode {
    pub fn new(
        code: String,
        description: Option<String>,
        max_usage: Option<i64>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            code,
            description,
            is_active: true,
            usage_count: 0,
            max_usage,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self.max_usage, Some(max) if self.usage_count >= max)
    }

    pub fn remaining_uses(&self) -> Option<i64> {
        self.max_usage.map(|max| (max - self.usage_count).max(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_code_is_active_and_unused() {
        let promo = PromoCode::new("ETSY10".to_string(), None, None, Utc::now());
        assert!(promo.is_active);
        assert_eq!(promo.usage_count, 0);
        assert!(!promo.is_exhausted());
        assert_eq!(promo.remaining_uses(), None);
    }

    #[test]
    fn test_exhausted_at_cap() {
        let mut promo = PromoCode::new("CAP2".to_string(), None, Some(2), Utc::now());
        promo.usage_count = 1;
        assert!(!promo.is_exhausted());
        assert_eq!(promo.remaining_uses(), Some(1));

        promo.usage_count = 2;
        assert!(promo.is_exhausted());
        assert_eq!(promo.remaining_uses(), Some(0));
    }
}
