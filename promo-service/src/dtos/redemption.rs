use serde::{Deserialize, Serialize};

use crate::services::RedemptionResult;

/// `token` is optional here so a missing field reaches the engine and gets
/// its own message instead of a generic body error. Any non-empty string is
/// looked up as-is.
#[derive(Debug, Deserialize)]
pub struct RedeemRequest {
    pub token: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RedeemResponse {
    pub success: bool,
    pub message: String,
    /// True once the token can no longer be redeemed.
    pub token_consumed: bool,
    /// Rejection reason for refused redemptions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Applier error code for consumed tokens whose application failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

impl From<RedemptionResult> for RedeemResponse {
    fn from(result: RedemptionResult) -> Self {
        Self {
            success: result.success,
            message: result.message,
            token_consumed: true,
            error: None,
            error_code: result.error_code,
        }
    }
}
