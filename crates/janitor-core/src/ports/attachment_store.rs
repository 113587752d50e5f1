//! AttachmentStore port - the narrow contract this subsystem requires from
//! the storage engine.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::AttachmentRef;

/// Store-side failures.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The listing call failed; the whole run aborts.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// One deletion failed. Recorded into the report; the batch continues.
    #[error("deletion failed for {id}: {reason}")]
    DeletionFailed { id: String, reason: String },
}

/// Interface to the attachment storage engine.
///
/// Design intent:
/// - `list_older_than` may return an empty list and must not block forever.
/// - `delete` failures are per-item; the executor isolates them from the
///   rest of the batch.
/// - Everything else about storage (engine, layout, auth) is the store's
///   problem, not this subsystem's.
#[async_trait]
pub trait AttachmentStore: Send + Sync {
    /// List attachments created strictly before `cutoff`.
    async fn list_older_than(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<AttachmentRef>, StoreError>;

    /// Delete one attachment by id.
    async fn delete(&self, id: &str) -> Result<(), StoreError>;
}
