use thiserror::Error;

/// Errors surfaced by the scheduling subsystem.
///
/// Per-item deletion failures are deliberately not here: they are recorded
/// into the `CleanupReport` and never abort a batch.
#[derive(Debug, Error)]
pub enum JanitorError {
    /// Bad schedule parameters. Rejected before a timer is armed.
    #[error("invalid schedule spec: {0}")]
    InvalidSpec(String),

    /// The listing call failed. Aborts the current run, not the schedule.
    #[error("attachment store unavailable: {0}")]
    StoreUnavailable(String),

    /// `start` was called while a schedule is already active.
    #[error("coordinator already has an active schedule")]
    NotIdle,
}
