use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{EventStatus, RedemptionEvent};

pub const DEFAULT_EVENTS_LIMIT: u64 = 50;
pub const MAX_EVENTS_LIMIT: u64 = 200;

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    pub limit: Option<u64>,
}

impl EventsQuery {
    pub fn limit(&self) -> u64 {
        self.limit
            .unwrap_or(DEFAULT_EVENTS_LIMIT)
            .clamp(1, MAX_EVENTS_LIMIT)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventResponse {
    pub id: String,
    pub token: String,
    pub status: EventStatus,
    pub message: String,
    pub success: Option<bool>,
    pub timestamp: DateTime<Utc>,
    pub promo_code: Option<String>,
    pub error_code: Option<String>,
    pub error_details: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl From<RedemptionEvent> for EventResponse {
    fn from(event: RedemptionEvent) -> Self {
        Self {
            id: event.id,
            token: event.token,
            status: event.status,
            message: event.message,
            success: event.success,
            timestamp: event.timestamp,
            promo_code: event.promo_code,
            error_code: event.error_code,
            error_details: event.error_details,
            ip_address: event.ip_address,
            user_agent: event.user_agent,
        }
    }
}
