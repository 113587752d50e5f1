//! Cleanup run reporting.
//!
//! A report is created fresh per run and immutable once finished; the
//! coordinator hands it to a `ReportSink` and keeps nothing.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::RunId;

/// Read-only projection of a stored attachment, as listed by the store.
///
/// Not persisted by this subsystem; it lives exactly as long as the run that
/// listed it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentRef {
    /// Opaque store-side identifier.
    pub id: String,
    pub size_bytes: u64,
    pub created_at: DateTime<Utc>,
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// The batch ran to completion (individual deletions may still have
    /// failed; see `failed_ids`).
    Completed,

    /// The listing call failed before any deletion was attempted.
    Aborted,
}

/// Report for one cleanup run.
///
/// Invariant: `deleted + failed_ids.len() == attempted`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupReport {
    pub run_id: RunId,
    pub outcome: RunOutcome,

    /// Candidates the listing call returned.
    pub attempted: usize,
    pub deleted: usize,

    /// Identifiers whose deletion failed; retried implicitly on the next
    /// pass, since they will still be older than the cutoff.
    pub failed_ids: BTreeSet<String>,

    /// Sum of `size_bytes` over successfully deleted attachments.
    pub bytes_deleted: u64,

    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl CleanupReport {
    /// Empty report for a run the listing call killed.
    pub fn aborted(run_id: RunId, started_at: DateTime<Utc>, finished_at: DateTime<Utc>) -> Self {
        Self {
            run_id,
            outcome: RunOutcome::Aborted,
            attempted: 0,
            deleted: 0,
            failed_ids: BTreeSet::new(),
            bytes_deleted: 0,
            started_at,
            finished_at,
        }
    }

    pub fn has_deletions(&self) -> bool {
        self.deleted > 0
    }

    /// Check the report arithmetic.
    pub fn is_consistent(&self) -> bool {
        self.deleted + self.failed_ids.len() == self.attempted
    }
}
