//! Storage seams for promo codes, tokens and redemption events.
//!
//! The MongoDB and in-memory backends both implement every trait here;
//! [`Stores`] hands each component only the capability it needs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

use super::error::ServiceError;
use crate::models::{PromoCode, RedemptionEvent, Token};

pub const DEFAULT_PAGE_LIMIT: u64 = 10;
pub const MAX_PAGE_LIMIT: u64 = 100;
// MongoDB encodes skip as a signed 64-bit integer.
const MAX_SKIP: u64 = i64::MAX as u64;

/// 1-based page request; `limit` is clamped to `1..=MAX_PAGE_LIMIT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Page {
    pub page: u64,
    pub limit: u64,
}

impl Page {
    pub fn new(page: Option<u64>, limit: Option<u64>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(DEFAULT_PAGE_LIMIT).clamp(1, MAX_PAGE_LIMIT),
        }
    }

    /// Offset of the first item. Saturates rather than overflowing for
    /// absurd page numbers, which then simply yield an empty page.
    pub fn skip(&self) -> u64 {
        (self.page - 1)
            .saturating_mul(self.limit)
            .min(MAX_SKIP)
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(None, None)
    }
}

#[derive(Debug, Clone)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: Page,
}

impl<T> Paginated<T> {
    pub fn pages(&self) -> u64 {
        self.total.div_ceil(self.page.limit)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct PromoCodeFilter {
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenFilter {
    pub is_used: Option<bool>,
    pub promo_code_id: Option<String>,
}

/// Partial update of a promo code. `max_usage: Some(None)` clears the cap.
#[derive(Debug, Clone, Default)]
pub struct PromoCodeChanges {
    pub code: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
    pub max_usage: Option<Option<i64>>,
}

impl PromoCodeChanges {
    pub fn is_empty(&self) -> bool {
        self.code.is_none()
            && self.description.is_none()
            && self.is_active.is_none()
            && self.max_usage.is_none()
    }
}

/// Metadata captured when a token flips to used.
#[derive(Debug, Clone)]
pub struct TokenUsage {
    pub used_at: DateTime<Utc>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

#[async_trait]
pub trait PromoCodeStore: Send + Sync {
    /// Fails with `DuplicateCode` when `code` is taken.
    async fn insert_promo_code(&self, promo: &PromoCode) -> Result<(), ServiceError>;

    async fn find_promo_code(&self, id: &str) -> Result<Option<PromoCode>, ServiceError>;

    /// Newest first.
    async fn list_promo_codes(
        &self,
        filter: &PromoCodeFilter,
        page: Page,
    ) -> Result<Paginated<PromoCode>, ServiceError>;

    /// Applies only the fields present in `changes`. `None` if `id` is unknown.
    async fn update_promo_code(
        &self,
        id: &str,
        changes: &PromoCodeChanges,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<PromoCode>, ServiceError>;

    async fn delete_promo_code(&self, id: &str) -> Result<bool, ServiceError>;

    /// Atomic `usage_count += 1`. `None` if `id` is unknown.
    async fn increment_usage(
        &self,
        id: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<PromoCode>, ServiceError>;
}

#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Fails with `DuplicateToken` when the token string is taken.
    async fn insert_token(&self, token: &Token) -> Result<(), ServiceError>;

    async fn find_token(&self, token: &str) -> Result<Option<Token>, ServiceError>;

    /// Newest first.
    async fn list_tokens(
        &self,
        filter: &TokenFilter,
        page: Page,
    ) -> Result<Paginated<Token>, ServiceError>;

    /// Conditional `is_used: false -> true`. Returns the updated token, or
    /// `None` when the token is missing or was already used. At most one
    /// caller ever gets `Some` for a given token.
    async fn mark_token_used(
        &self,
        token: &str,
        usage: &TokenUsage,
    ) -> Result<Option<Token>, ServiceError>;

    async fn delete_token(&self, token: &str) -> Result<bool, ServiceError>;
}

#[async_trait]
pub trait EventStore: Send + Sync {
    async fn append_event(&self, event: &RedemptionEvent) -> Result<(), ServiceError>;

    /// Most recent first.
    async fn recent_events(&self, limit: u64) -> Result<Vec<RedemptionEvent>, ServiceError>;
}

#[async_trait]
pub trait StoreHealth: Send + Sync {
    async fn health_check(&self) -> Result<(), ServiceError>;
}

/// One backend, viewed through each of its capabilities.
#[derive(Clone)]
pub struct Stores {
    pub promo_codes: Arc<dyn PromoCodeStore>,
    pub tokens: Arc<dyn TokenStore>,
    pub events: Arc<dyn EventStore>,
    pub health: Arc<dyn StoreHealth>,
}

impl Stores {
    pub fn from_backend<S>(backend: Arc<S>) -> Self
    where
        S: PromoCodeStore + TokenStore + EventStore + StoreHealth + 'static,
    {
        Self {
            promo_codes: backend.clone(),
            tokens: backend.clone(),
            events: backend.clone(),
            health: backend,
        }
    }
}
