//! ReportSink port - where finished reports go.

use async_trait::async_trait;

use crate::domain::{CleanupReport, RunOutcome};

/// Delivery of a finished `CleanupReport` (notification, chat reply, ...).
///
/// Delivery is fire-and-forget from the coordinator's point of view: a sink
/// must not fail the schedule.
#[async_trait]
pub trait ReportSink: Send + Sync {
    async fn deliver(&self, report: CleanupReport);
}

/// Sink that emits reports through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

#[async_trait]
impl ReportSink for LogSink {
    async fn deliver(&self, report: CleanupReport) {
        match report.outcome {
            RunOutcome::Completed => tracing::info!(
                run_id = %report.run_id,
                attempted = report.attempted,
                deleted = report.deleted,
                failed = report.failed_ids.len(),
                bytes_deleted = report.bytes_deleted,
                "cleanup run complete"
            ),
            RunOutcome::Aborted => tracing::warn!(
                run_id = %report.run_id,
                "cleanup run aborted before any deletion"
            ),
        }
    }
}
