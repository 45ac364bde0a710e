//! In-process storage backend for local runs and tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

use super::error::ServiceError;
use super::store::{
    EventStore, Page, Paginated, PromoCodeChanges, PromoCodeFilter, PromoCodeStore, StoreHealth,
    TokenFilter, TokenStore, TokenUsage,
};
use crate::models::{PromoCode, RedemptionEvent, Token};

#[derive(Default)]
struct State {
    // Insertion sequence breaks created_at ties so listings stay stable.
    seq: u64,
    promo_codes: HashMap<String, (u64, PromoCode)>,
    tokens: HashMap<String, (u64, Token)>,
    events: Vec<RedemptionEvent>,
}

impl State {
    fn next_seq(&mut self) -> u64 {
        self.seq += 1;
        self.seq
    }
}

#[derive(Default)]
pub struct InMemoryStore {
    state: RwLock<State>,
    unavailable: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every operation fail as if the database were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), ServiceError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(ServiceError::StorageUnavailable(
                "in-memory store marked unavailable".to_string(),
            ));
        }
        Ok(())
    }
}

fn paginate<T: Clone>(mut rows: Vec<(DateTime<Utc>, u64, T)>, page: Page) -> Paginated<T> {
    rows.sort_by(|a, b| b.0.cmp(&a.0).then(b.1.cmp(&a.1)));
    let total = rows.len() as u64;
    let items = rows
        .into_iter()
        .skip(page.skip() as usize)
        .take(page.limit as usize)
        .map(|(_, _, item)| item)
        .collect();
    Paginated { items, total, page }
}

#[async_trait]
impl PromoCodeStore for InMemoryStore {
    async fn insert_promo_code(&self, promo: &PromoCode) -> Result<(), ServiceError> {
        self.check_available()?;
        let mut state = self.state.write().await;
        if state.promo_codes.values().any(|(_, p)| p.code == promo.code) {
            return Err(ServiceError::DuplicateCode);
        }
        let seq = state.next_seq();
        state
            .promo_codes
            .insert(promo.id.clone(), (seq, promo.clone()));
        Ok(())
    }

    async fn find_promo_code(&self, id: &str) -> Result<Option<PromoCode>, ServiceError> {
        self.check_available()?;
        let state = self.state.read().await;
        Ok(state.promo_codes.get(id).map(|(_, p)| p.clone()))
    }

    async fn list_promo_codes(
        &self,
        filter: &PromoCodeFilter,
        page: Page,
    ) -> Result<Paginated<PromoCode>, ServiceError> {
        self.check_available()?;
        let state = self.state.read().await;
        let rows = state
            .promo_codes
            .values()
            .filter(|(_, p)| filter.is_active.map_or(true, |active| p.is_active == active))
            .map(|(seq, p)| (p.created_at, *seq, p.clone()))
            .collect();
        Ok(paginate(rows, page))
    }

    async fn update_promo_code(
        &self,
        id: &str,
        changes: &PromoCodeChanges,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<PromoCode>, ServiceError> {
        self.check_available()?;
        let mut state = self.state.write().await;

        if let Some(code) = &changes.code {
            let taken = state
                .promo_codes
                .values()
                .any(|(_, p)| p.id != id && &p.code == code);
            if taken {
                return Err(ServiceError::DuplicateCode);
            }
        }

        let Some((_, promo)) = state.promo_codes.get_mut(id) else {
            return Ok(None);
        };
        if let Some(code) = &changes.code {
            promo.code = code.clone();
        }
        if let Some(description) = &changes.description {
            promo.description = Some(description.clone());
        }
        if let Some(is_active) = changes.is_active {
            promo.is_active = is_active;
        }
        if let Some(max_usage) = changes.max_usage {
            promo.max_usage = max_usage;
        }
        promo.updated_at = updated_at;
        Ok(Some(promo.clone()))
    }

    async fn delete_promo_code(&self, id: &str) -> Result<bool, ServiceError> {
        self.check_available()?;
        Ok(self.state.write().await.promo_codes.remove(id).is_some())
    }

    async fn increment_usage(
        &self,
        id: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<PromoCode>, ServiceError> {
        self.check_available()?;
        let mut state = self.state.write().await;
        Ok(state.promo_codes.get_mut(id).map(|(_, promo)| {
            promo.usage_count += 1;
            promo.updated_at = updated_at;
            promo.clone()
        }))
    }
}

#[async_trait]
impl TokenStore for InMemoryStore {
    async fn insert_token(&self, token: &Token) -> Result<(), ServiceError> {
        self.check_available()?;
        let mut state = self.state.write().await;
        if state.tokens.contains_key(&token.token) {
            return Err(ServiceError::DuplicateToken);
        }
        let seq = state.next_seq();
        state
            .tokens
            .insert(token.token.clone(), (seq, token.clone()));
        Ok(())
    }

    async fn find_token(&self, token: &str) -> Result<Option<Token>, ServiceError> {
        self.check_available()?;
        let state = self.state.read().await;
        Ok(state.tokens.get(token).map(|(_, t)| t.clone()))
    }

    async fn list_tokens(
        &self,
        filter: &TokenFilter,
        page: Page,
    ) -> Result<Paginated<Token>, ServiceError> {
        self.check_available()?;
        let state = self.state.read().await;
        let rows = state
            .tokens
            .values()
            .filter(|(_, t)| filter.is_used.map_or(true, |used| t.is_used == used))
            .filter(|(_, t)| {
                filter
                    .promo_code_id
                    .as_deref()
                    .map_or(true, |id| t.promo_code_id == id)
            })
            .map(|(seq, t)| (t.created_at, *seq, t.clone()))
            .collect();
        Ok(paginate(rows, page))
    }

    async fn mark_token_used(
        &self,
        token: &str,
        usage: &TokenUsage,
    ) -> Result<Option<Token>, ServiceError> {
        self.check_available()?;
        let mut state = self.state.write().await;
        match state.tokens.get_mut(token) {
            Some((_, t)) if !t.is_used => {
                t.is_used = true;
                t.used_at = Some(usage.used_at);
                t.ip_address = usage.ip_address.clone();
                t.user_agent = usage.user_agent.clone();
                Ok(Some(t.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn delete_token(&self, token: &str) -> Result<bool, ServiceError> {
        self.check_available()?;
        Ok(self.state.write().await.tokens.remove(token).is_some())
    }
}

#[async_trait]
impl EventStore for InMemoryStore {
    async fn append_event(&self, event: &RedemptionEvent) -> Result<(), ServiceError> {
        self.check_available()?;
        self.state.write().await.events.push(event.clone());
        Ok(())
    }

    async fn recent_events(&self, limit: u64) -> Result<Vec<RedemptionEvent>, ServiceError> {
        self.check_available()?;
        let state = self.state.read().await;
        Ok(state
            .events
            .iter()
            .rev()
            .take(limit as usize)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl StoreHealth for InMemoryStore {
    async fn health_check(&self) -> Result<(), ServiceError> {
        self.check_available()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn usage() -> TokenUsage {
        TokenUsage {
            used_at: Utc::now(),
            ip_address: Some("203.0.113.5".to_string()),
            user_agent: Some("test-agent".to_string()),
        }
    }

    #[tokio::test]
    async fn test_duplicate_code_rejected() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        store
            .insert_promo_code(&PromoCode::new("ETSY10".to_string(), None, None, now))
            .await
            .unwrap();

        let err = store
            .insert_promo_code(&PromoCode::new("ETSY10".to_string(), None, None, now))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::DuplicateCode));
    }

    #[tokio::test]
    async fn test_mark_used_succeeds_once() {
        let store = InMemoryStore::new();
        let token = Token::new("ABC12345".to_string(), "p1".to_string(), Utc::now(), None);
        store.insert_token(&token).await.unwrap();

        let first = store.mark_token_used("ABC12345", &usage()).await.unwrap();
        let used = first.expect("first claim wins");
        assert!(used.is_used);
        assert_eq!(used.ip_address.as_deref(), Some("203.0.113.5"));

        assert!(store
            .mark_token_used("ABC12345", &usage())
            .await
            .unwrap()
            .is_none());
        assert!(store.mark_token_used("MISSING1", &usage()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_tokens_filters_and_orders_newest_first() {
        let store = InMemoryStore::new();
        let base = Utc::now();
        for (i, name) in ["TOKEN001", "TOKEN002", "TOKEN003"].iter().enumerate() {
            let promo_id = if i == 2 { "p2" } else { "p1" };
            let token = Token::new(
                name.to_string(),
                promo_id.to_string(),
                base + Duration::seconds(i as i64),
                None,
            );
            store.insert_token(&token).await.unwrap();
        }
        store.mark_token_used("TOKEN001", &usage()).await.unwrap();

        let all = store
            .list_tokens(&TokenFilter::default(), Page::default())
            .await
            .unwrap();
        let names: Vec<_> = all.items.iter().map(|t| t.token.as_str()).collect();
        assert_eq!(names, vec!["TOKEN003", "TOKEN002", "TOKEN001"]);

        let unused_p1 = store
            .list_tokens(
                &TokenFilter {
                    is_used: Some(false),
                    promo_code_id: Some("p1".to_string()),
                },
                Page::default(),
            )
            .await
            .unwrap();
        assert_eq!(unused_p1.total, 1);
        assert_eq!(unused_p1.items[0].token, "TOKEN002");
    }

    #[tokio::test]
    async fn test_rename_onto_existing_code_rejected() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        let first = PromoCode::new("FIRST".to_string(), None, None, now);
        let second = PromoCode::new("SECOND".to_string(), None, None, now);
        store.insert_promo_code(&first).await.unwrap();
        store.insert_promo_code(&second).await.unwrap();

        let changes = PromoCodeChanges {
            code: Some("FIRST".to_string()),
            ..Default::default()
        };
        let err = store
            .update_promo_code(&second.id, &changes, now)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::DuplicateCode));
    }

    #[tokio::test]
    async fn test_unavailable_fails_every_call() {
        let store = InMemoryStore::new();
        store.set_unavailable(true);

        assert!(store.health_check().await.is_err());
        assert!(store.find_token("ANY").await.is_err());
    }
}
