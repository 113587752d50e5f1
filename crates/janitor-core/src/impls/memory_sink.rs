//! Report sink collecting into memory (tests, demos).

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::CleanupReport;
use crate::ports::ReportSink;

/// Collects every delivered report for later assertions.
#[derive(Debug, Default)]
pub struct MemorySink {
    reports: Mutex<Vec<CleanupReport>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn reports(&self) -> Vec<CleanupReport> {
        self.reports.lock().await.clone()
    }
}

#[async_trait]
impl ReportSink for MemorySink {
    async fn deliver(&self, report: CleanupReport) {
        self.reports.lock().await.push(report);
    }
}
