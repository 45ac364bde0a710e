use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Processing,
    Success,
    Error,
}

impl std::fmt::Display for EventStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventStatus::Processing => write!(f, "processing"),
            EventStatus::Success => write!(f, "success"),
            EventStatus::Error => write!(f, "error"),
        }
    }
}

/// Append-only record of one phase of a redemption attempt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RedemptionEvent {
    #[serde(rename = "_id")]
    pub id: String,
    pub token: String,
    pub status: EventStatus,
    pub message: String,
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub promo_code: Option<String>,
    #[serde(default)]
    pub error_code: Option<String>,
    #[serde(default)]
    pub error_details: Option<String>,
    #[serde(default)]
    pub ip_address: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl RedemptionEvent {
    pub fn new(
        token: impl Into<String>,
        status: EventStatus,
        message: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            token: token.into(),
            status,
            message: message.into(),
            success: None,
            timestamp,
            promo_code: None,
            error_code: None,
            error_details: None,
            ip_address: None,
            user_agent: None,
        }
    }

    pub fn with_outcome(mut self, success: bool) -> Self {
        self.success = Some(success);
        self
    }

    pub fn with_promo_code(mut self, code: impl Into<String>) -> Self {
        self.promo_code = Some(code.into());
        self
    }

    pub fn with_error(mut self, code: Option<String>, details: Option<String>) -> Self {
        self.error_code = code;
        self.error_details = details;
        self
    }

    pub fn with_requester(mut self, ip_address: Option<String>, user_agent: Option<String>) -> Self {
        self.ip_address = ip_address;
        self.user_agent = user_agent;
        self
    }
}
