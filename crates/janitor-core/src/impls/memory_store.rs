//! In-memory attachment store for development and tests.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::domain::AttachmentRef;
use crate::ports::{AttachmentStore, StoreError};

#[derive(Debug, Default)]
struct MemoryStoreState {
    attachments: HashMap<String, AttachmentRef>,

    /// Ids whose deletion fails (injected).
    fail_ids: HashSet<String>,

    /// Whether the next listing calls fail (injected).
    fail_listing: bool,
}

/// Seedable in-memory `AttachmentStore` with failure injection.
#[derive(Debug, Default)]
pub struct InMemoryAttachmentStore {
    state: Mutex<MemoryStoreState>,
}

impl InMemoryAttachmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, attachment: AttachmentRef) {
        let mut state = self.state.lock().await;
        state.attachments.insert(attachment.id.clone(), attachment);
    }

    /// Make `delete(id)` fail until the injection is cleared.
    pub async fn fail_delete(&self, id: &str) {
        let mut state = self.state.lock().await;
        state.fail_ids.insert(id.to_string());
    }

    /// Make `list_older_than` fail, simulating a store outage.
    pub async fn fail_listing(&self, fail: bool) {
        let mut state = self.state.lock().await;
        state.fail_listing = fail;
    }

    pub async fn contains(&self, id: &str) -> bool {
        let state = self.state.lock().await;
        state.attachments.contains_key(id)
    }

    pub async fn len(&self) -> usize {
        let state = self.state.lock().await;
        state.attachments.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl AttachmentStore for InMemoryAttachmentStore {
    async fn list_older_than(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<AttachmentRef>, StoreError> {
        let state = self.state.lock().await;
        if state.fail_listing {
            return Err(StoreError::Unavailable("injected listing failure".to_string()));
        }

        let mut candidates: Vec<AttachmentRef> = state
            .attachments
            .values()
            .filter(|a| a.created_at < cutoff)
            .cloned()
            .collect();
        // Deterministic order for tests; a real store orders however it likes.
        candidates.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(candidates)
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        if state.fail_ids.contains(id) {
            return Err(StoreError::DeletionFailed {
                id: id.to_string(),
                reason: "injected deletion failure".to_string(),
            });
        }
        if state.attachments.remove(id).is_none() {
            return Err(StoreError::DeletionFailed {
                id: id.to_string(),
                reason: "not found".to_string(),
            });
        }
        Ok(())
    }
}
