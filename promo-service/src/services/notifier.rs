//! Best-effort activity feed for redemption events.
//!
//! Events go to three places: the persistent event log, a capped in-memory
//! list of recent activity, and any live subscribers. None of them is
//! authoritative state, so failures here are logged and never propagated to
//! the redemption that produced the event.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

use super::error::ServiceError;
use super::store::EventStore;
use crate::models::RedemptionEvent;
use crate::utils::TokenPrefix;

pub const DEFAULT_ACTIVITY_CAPACITY: usize = 50;
const SUBSCRIBER_BUFFER: usize = 256;

pub struct ActivityNotifier {
    store: Arc<dyn EventStore>,
    recent: Mutex<VecDeque<RedemptionEvent>>,
    capacity: usize,
    sender: broadcast::Sender<RedemptionEvent>,
}

impl ActivityNotifier {
    pub fn new(store: Arc<dyn EventStore>, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, _) = broadcast::channel(SUBSCRIBER_BUFFER);
        Self {
            store,
            recent: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            sender,
        }
    }

    pub async fn publish(&self, event: RedemptionEvent) {
        {
            let mut recent = self.recent.lock().unwrap_or_else(|e| e.into_inner());
            recent.push_front(event.clone());
            recent.truncate(self.capacity);
        }

        // No receivers is the normal idle state.
        let _ = self.sender.send(event.clone());

        if let Err(e) = self.store.append_event(&event).await {
            tracing::warn!(
                token = %TokenPrefix(&event.token),
                status = %event.status,
                error = %e,
                "Failed to persist redemption event"
            );
        }
    }

    /// In-memory feed, most recent first.
    pub fn recent(&self, limit: Option<usize>) -> Vec<RedemptionEvent> {
        let recent = self.recent.lock().unwrap_or_else(|e| e.into_inner());
        recent
            .iter()
            .take(limit.unwrap_or(self.capacity))
            .cloned()
            .collect()
    }

    /// Persistent event log, most recent first.
    pub async fn history(&self, limit: u64) -> Result<Vec<RedemptionEvent>, ServiceError> {
        self.store.recent_events(limit).await
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RedemptionEvent> {
        self.sender.subscribe()
    }
}
