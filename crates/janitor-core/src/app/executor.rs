//! Retention executor: one cleanup pass over the attachment store.

use std::collections::{BTreeSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use chrono::Duration as ChronoDuration;
use tokio::sync::Mutex;

use crate::domain::{AttachmentRef, CleanupReport, JanitorError, RunId, RunOutcome};
use crate::ports::{AttachmentStore, Clock};

/// Tuning for a cleanup pass.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Deletion worker count (bounded parallelism against the store).
    pub workers: usize,

    /// Cap on a single `delete` call. A store that stops answering must not
    /// wedge the run; `None` trusts the store's own timeouts.
    pub delete_timeout: Option<Duration>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            delete_timeout: Some(Duration::from_secs(30)),
        }
    }
}

/// Per-run tallies, shared by the deletion workers.
#[derive(Debug, Default, Clone)]
struct RunTally {
    deleted: usize,
    bytes_deleted: u64,
    failed_ids: BTreeSet<String>,
}

/// Runs one cleanup pass: list candidates, delete them with per-item failure
/// isolation, accumulate a report.
pub struct RetentionExecutor {
    store: Arc<dyn AttachmentStore>,
    clock: Arc<dyn Clock>,
    config: ExecutorConfig,
}

impl RetentionExecutor {
    pub fn new(
        store: Arc<dyn AttachmentStore>,
        clock: Arc<dyn Clock>,
        config: ExecutorConfig,
    ) -> Self {
        Self {
            store,
            clock,
            config,
        }
    }

    /// Execute one pass with the given retention threshold.
    ///
    /// A listing failure aborts the run (`StoreUnavailable`); a deletion
    /// failure is recorded in the report and the batch continues. Failed
    /// deletions are not retried within the run — the object is still older
    /// than the cutoff on the next pass.
    pub async fn run_once(&self, retention_days: u32) -> Result<CleanupReport, JanitorError> {
        let run_id = RunId::new();
        let started_at = self.clock.now();
        let cutoff = started_at - ChronoDuration::days(i64::from(retention_days));

        let candidates = self
            .store
            .list_older_than(cutoff)
            .await
            .map_err(|e| JanitorError::StoreUnavailable(e.to_string()))?;

        let attempted = candidates.len();
        tracing::debug!(%run_id, attempted, %cutoff, "starting deletion batch");

        let queue = Arc::new(Mutex::new(VecDeque::from(candidates)));
        let tally = Arc::new(Mutex::new(RunTally::default()));

        let workers = self.config.workers.max(1);
        let mut joins = Vec::with_capacity(workers);
        for worker_id in 0..workers {
            let queue = Arc::clone(&queue);
            let tally = Arc::clone(&tally);
            let store = Arc::clone(&self.store);
            let delete_timeout = self.config.delete_timeout;

            joins.push(tokio::spawn(async move {
                delete_worker(worker_id, queue, tally, store, delete_timeout).await;
            }));
        }
        for join in joins {
            if let Err(e) = join.await {
                tracing::error!(error = %e, "deletion worker did not finish cleanly");
            }
        }

        let tally = tally.lock().await.clone();
        let report = CleanupReport {
            run_id,
            outcome: RunOutcome::Completed,
            attempted,
            deleted: tally.deleted,
            failed_ids: tally.failed_ids,
            bytes_deleted: tally.bytes_deleted,
            started_at,
            finished_at: self.clock.now(),
        };

        debug_assert!(report.is_consistent());
        Ok(report)
    }
}

/// One deletion worker: pop a candidate, delete it, record the outcome.
///
/// Workers share nothing mutable beyond the guarded queue and tally; the
/// outcome of one deletion never blocks another.
async fn delete_worker(
    worker_id: usize,
    queue: Arc<Mutex<VecDeque<AttachmentRef>>>,
    tally: Arc<Mutex<RunTally>>,
    store: Arc<dyn AttachmentStore>,
    delete_timeout: Option<Duration>,
) {
    loop {
        // Pop under the lock, delete outside it.
        let Some(candidate) = queue.lock().await.pop_front() else {
            break;
        };

        let outcome = delete_one(store.as_ref(), &candidate.id, delete_timeout).await;

        let mut tally = tally.lock().await;
        match outcome {
            Ok(()) => {
                tally.deleted += 1;
                tally.bytes_deleted += candidate.size_bytes;
            }
            Err(reason) => {
                tracing::warn!(
                    worker_id,
                    id = %candidate.id,
                    %reason,
                    "deletion failed, continuing batch"
                );
                tally.failed_ids.insert(candidate.id);
            }
        }
    }
}

async fn delete_one(
    store: &dyn AttachmentStore,
    id: &str,
    delete_timeout: Option<Duration>,
) -> Result<(), String> {
    let result = match delete_timeout {
        Some(cap) => match tokio::time::timeout(cap, store.delete(id)).await {
            Ok(result) => result,
            Err(_) => return Err(format!("delete timed out after {:?}", cap)),
        },
        None => store.delete(id).await,
    };
    result.map_err(|e| e.to_string())
}
