//! Token redemption: eligibility gates, the single-use claim, the external
//! application call and the outcome commit.
//!
//! A token is claimed with a conditional `is_used: false -> true` update
//! before the applier is called, so two concurrent requests for the same
//! token can never both reach the shop. Once claimed the token stays used
//! whatever the applier reports.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use thiserror::Error;

use super::applier::{ApplyOutcome, CodeApplier};
use super::clock::Clock;
use super::error::ServiceError;
use super::metrics::{record_applier_call, record_redemption};
use super::notifier::ActivityNotifier;
use super::registry::PromoCodeRegistry;
use super::store::{PromoCodeStore, TokenStore, TokenUsage};
use crate::dtos::RedeemResponse;
use crate::models::{EventStatus, RedemptionEvent};
use crate::utils::TokenPrefix;

pub const APPLIER_PANICKED: &str = "APPLIER_PANICKED";

/// Who asked, for the audit trail.
#[derive(Debug, Clone, Default)]
pub struct RedemptionContext {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub request_id: Option<String>,
}

/// Reasons a redemption is refused before anything is mutated.
#[derive(Debug, Error)]
pub enum RedemptionError {
    #[error("Please provide a token")]
    MissingToken,

    #[error("Invalid token")]
    TokenNotFound,

    #[error("Token has already been used")]
    TokenAlreadyUsed,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Associated promo code not found")]
    PromoCodeMissing,

    #[error("This promo code is no longer active")]
    PromoCodeInactive,

    #[error("This promo code has reached its maximum usage limit")]
    PromoCodeExhausted,

    #[error("Server error")]
    Storage(#[from] ServiceError),
}

impl RedemptionError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            RedemptionError::TokenNotFound | RedemptionError::PromoCodeMissing => {
                StatusCode::NOT_FOUND
            }
            RedemptionError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    /// Stable machine-readable reason.
    pub fn code(&self) -> &'static str {
        match self {
            RedemptionError::MissingToken => "missing_token",
            RedemptionError::TokenNotFound => "token_not_found",
            RedemptionError::TokenAlreadyUsed => "token_already_used",
            RedemptionError::TokenExpired => "token_expired",
            RedemptionError::PromoCodeMissing => "promo_code_missing",
            RedemptionError::PromoCodeInactive => "promo_code_inactive",
            RedemptionError::PromoCodeExhausted => "promo_code_exhausted",
            RedemptionError::Storage(_) => "internal_error",
        }
    }
}

impl IntoResponse for RedemptionError {
    fn into_response(self) -> Response {
        if let RedemptionError::Storage(e) = &self {
            tracing::error!(error = %e, "Redemption failed on storage");
        }
        let body = RedeemResponse {
            success: false,
            message: self.to_string(),
            token_consumed: false,
            error: Some(self.code().to_string()),
            error_code: None,
        };
        (self.status_code(), Json(body)).into_response()
    }
}

/// Result of a redemption that got past every gate and consumed the token.
#[derive(Debug, Clone)]
pub struct RedemptionResult {
    /// The external application outcome, not token validity.
    pub success: bool,
    pub message: String,
    pub error_code: Option<String>,
    pub token: String,
    pub promo_code: String,
    /// False when the usage counter could not be incremented.
    pub usage_recorded: bool,
}

#[derive(Clone)]
pub struct RedemptionEngine {
    tokens: Arc<dyn TokenStore>,
    promo_codes: Arc<dyn PromoCodeStore>,
    registry: Arc<PromoCodeRegistry>,
    applier: Arc<dyn CodeApplier>,
    notifier: Arc<ActivityNotifier>,
    clock: Arc<dyn Clock>,
}

impl RedemptionEngine {
    pub fn new(
        tokens: Arc<dyn TokenStore>,
        promo_codes: Arc<dyn PromoCodeStore>,
        registry: Arc<PromoCodeRegistry>,
        applier: Arc<dyn CodeApplier>,
        notifier: Arc<ActivityNotifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            tokens,
            promo_codes,
            registry,
            applier,
            notifier,
            clock,
        }
    }

    #[tracing::instrument(
        skip(self, token, context),
        fields(token = %TokenPrefix(token), request_id = ?context.request_id)
    )]
    pub async fn redeem(
        &self,
        token: &str,
        context: RedemptionContext,
    ) -> Result<RedemptionResult, RedemptionError> {
        let result = self.redeem_inner(token.trim(), &context).await;
        match &result {
            Ok(r) if r.success => record_redemption("applied"),
            Ok(_) => record_redemption("failed"),
            Err(e) => {
                record_redemption(e.code());
                if !matches!(e, RedemptionError::Storage(_)) {
                    tracing::info!(
                        token = %TokenPrefix(token),
                        reason = e.code(),
                        "Redemption rejected"
                    );
                }
            }
        }
        result
    }

    async fn redeem_inner(
        &self,
        token: &str,
        context: &RedemptionContext,
    ) -> Result<RedemptionResult, RedemptionError> {
        if token.is_empty() {
            return Err(RedemptionError::MissingToken);
        }

        let record = self
            .tokens
            .find_token(token)
            .await?
            .ok_or(RedemptionError::TokenNotFound)?;
        if record.is_used {
            return Err(RedemptionError::TokenAlreadyUsed);
        }
        if record.is_expired(self.clock.now()) {
            return Err(RedemptionError::TokenExpired);
        }

        let promo = self
            .promo_codes
            .find_promo_code(&record.promo_code_id)
            .await?
            .ok_or(RedemptionError::PromoCodeMissing)?;
        if !promo.is_active {
            return Err(RedemptionError::PromoCodeInactive);
        }
        if promo.is_exhausted() {
            return Err(RedemptionError::PromoCodeExhausted);
        }

        let usage = TokenUsage {
            used_at: self.clock.now(),
            ip_address: context.ip_address.clone(),
            user_agent: context.user_agent.clone(),
        };
        if self.tokens.mark_token_used(token, &usage).await?.is_none() {
            // Lost the race to a concurrent redemption of the same token.
            return Err(RedemptionError::TokenAlreadyUsed);
        }
        tracing::info!(
            token = %TokenPrefix(token),
            promo_code_id = %promo.id,
            "Token claimed"
        );

        self.notifier
            .publish(
                RedemptionEvent::new(
                    token,
                    EventStatus::Processing,
                    "Applying promo code",
                    self.clock.now(),
                )
                .with_promo_code(promo.code.clone())
                .with_requester(context.ip_address.clone(), context.user_agent.clone()),
            )
            .await;

        let outcome = self.apply(&promo.code).await;

        let usage_recorded = match self.registry.increment_usage(&promo.id).await {
            Ok(updated) => {
                tracing::debug!(
                    promo_code_id = %updated.id,
                    usage_count = updated.usage_count,
                    "Usage recorded"
                );
                true
            }
            Err(e) => {
                tracing::error!(
                    token = %TokenPrefix(token),
                    promo_code_id = %promo.id,
                    error = %e,
                    "Token consumed but usage count not incremented"
                );
                false
            }
        };

        let (status, details) = if outcome.success {
            (EventStatus::Success, None)
        } else {
            (EventStatus::Error, Some(outcome.message.clone()))
        };
        self.notifier
            .publish(
                RedemptionEvent::new(token, status, outcome.message.clone(), self.clock.now())
                    .with_outcome(outcome.success)
                    .with_promo_code(promo.code.clone())
                    .with_error(outcome.error_code.clone(), details)
                    .with_requester(context.ip_address.clone(), context.user_agent.clone()),
            )
            .await;

        tracing::info!(
            token = %TokenPrefix(token),
            promo_code_id = %promo.id,
            success = outcome.success,
            "Redemption completed"
        );

        Ok(RedemptionResult {
            success: outcome.success,
            message: outcome.message,
            error_code: outcome.error_code,
            token: token.to_string(),
            promo_code: promo.code,
            usage_recorded,
        })
    }

    /// Run the applier on its own task so a panic inside it becomes a failed
    /// outcome instead of unwinding through the commit.
    async fn apply(&self, code: &str) -> ApplyOutcome {
        let applier = self.applier.clone();
        let name = applier.name();
        let owned_code = code.to_string();

        let outcome = match tokio::spawn(async move { applier.apply_code(&owned_code).await }).await
        {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                tracing::warn!(applier = name, error = %e, "Code applier call failed");
                ApplyOutcome::rejected(e.to_string(), Some(e.error_code().to_string()))
            }
            Err(join_error) => {
                tracing::error!(applier = name, error = %join_error, "Code applier crashed");
                ApplyOutcome::rejected(
                    "Promo code application failed unexpectedly",
                    Some(APPLIER_PANICKED.to_string()),
                )
            }
        };

        record_applier_call(name, if outcome.success { "success" } else { "failure" });
        outcome
    }
}
