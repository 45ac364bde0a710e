use std::sync::Arc;

use super::cache::TtlCache;
use super::clock::Clock;
use super::error::ServiceError;
use super::store::{Page, Paginated, PromoCodeChanges, PromoCodeFilter, PromoCodeStore};
use crate::models::PromoCode;

#[derive(Debug, Clone)]
pub struct NewPromoCode {
    pub code: String,
    pub description: Option<String>,
    pub max_usage: Option<i64>,
}

/// Durable promo codes, with a read-through cache in front of listings.
pub struct PromoCodeRegistry {
    store: Arc<dyn PromoCodeStore>,
    clock: Arc<dyn Clock>,
    list_cache: TtlCache<(PromoCodeFilter, Page), Paginated<PromoCode>>,
}

fn normalize_code(code: &str) -> Result<String, ServiceError> {
    let code = code.trim();
    if code.is_empty() {
        return Err(ServiceError::Validation(
            "Promo code must not be empty".to_string(),
        ));
    }
    Ok(code.to_string())
}

fn check_max_usage(max_usage: Option<i64>) -> Result<(), ServiceError> {
    match max_usage {
        Some(max) if max < 1 => Err(ServiceError::Validation(
            "max_usage must be a positive integer".to_string(),
        )),
        _ => Ok(()),
    }
}

fn clean_description(description: Option<String>) -> Option<String> {
    description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
}

impl PromoCodeRegistry {
    pub fn new(
        store: Arc<dyn PromoCodeStore>,
        clock: Arc<dyn Clock>,
        cache_ttl: std::time::Duration,
    ) -> Self {
        Self {
            store,
            list_cache: TtlCache::new(cache_ttl, clock.clone()),
            clock,
        }
    }

    pub async fn create(&self, new: NewPromoCode) -> Result<PromoCode, ServiceError> {
        let code = normalize_code(&new.code)?;
        check_max_usage(new.max_usage)?;

        let promo = PromoCode::new(
            code,
            clean_description(new.description),
            new.max_usage,
            self.clock.now(),
        );
        self.store.insert_promo_code(&promo).await?;
        self.list_cache.invalidate_all();

        tracing::info!(promo_code_id = %promo.id, code = %promo.code, "Promo code created");
        Ok(promo)
    }

    pub async fn list(
        &self,
        filter: PromoCodeFilter,
        page: Page,
    ) -> Result<Paginated<PromoCode>, ServiceError> {
        let key = (filter, page);
        if let Some(cached) = self.list_cache.get(&key) {
            return Ok(cached);
        }

        let generation = self.list_cache.generation();
        let result = self.store.list_promo_codes(&key.0, page).await?;
        self.list_cache.insert(generation, key, result.clone());
        Ok(result)
    }

    pub async fn get(&self, id: &str) -> Result<PromoCode, ServiceError> {
        self.store
            .find_promo_code(id)
            .await?
            .ok_or(ServiceError::PromoCodeNotFound)
    }

    pub async fn update(
        &self,
        id: &str,
        mut changes: PromoCodeChanges,
    ) -> Result<PromoCode, ServiceError> {
        if let Some(code) = &changes.code {
            changes.code = Some(normalize_code(code)?);
        }
        if let Some(max_usage) = changes.max_usage {
            check_max_usage(max_usage)?;
        }
        if let Some(description) = changes.description.take() {
            changes.description = Some(description.trim().to_string());
        }

        let promo = if changes.is_empty() {
            self.get(id).await?
        } else {
            self.store
                .update_promo_code(id, &changes, self.clock.now())
                .await?
                .ok_or(ServiceError::PromoCodeNotFound)?
        };
        self.list_cache.invalidate_all();

        tracing::info!(promo_code_id = %promo.id, code = %promo.code, "Promo code updated");
        Ok(promo)
    }

    pub async fn delete(&self, id: &str) -> Result<(), ServiceError> {
        if !self.store.delete_promo_code(id).await? {
            return Err(ServiceError::PromoCodeNotFound);
        }
        self.list_cache.invalidate_all();

        tracing::info!(promo_code_id = %id, "Promo code deleted");
        Ok(())
    }

    /// Record one redemption against the code.
    pub async fn increment_usage(&self, id: &str) -> Result<PromoCode, ServiceError> {
        let promo = self
            .store
            .increment_usage(id, self.clock.now())
            .await?
            .ok_or(ServiceError::PromoCodeNotFound)?;
        self.list_cache.invalidate_all();
        Ok(promo)
    }
}
