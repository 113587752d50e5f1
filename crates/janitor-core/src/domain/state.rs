//! Coordinator state machine states.

use serde::{Deserialize, Serialize};

/// Lifecycle of the single recurring job.
///
/// State transitions:
/// - Idle -> Scheduled (start/reconfigure with an enabled spec)
/// - Scheduled -> Running (timer fire, generation-checked)
/// - Running -> Scheduled (run finished, schedule still wanted)
/// - any -> Idle (stop, or reconfigure with a disabled spec)
///
/// Design note: Using an enum ensures exhaustive matching and prevents
/// invalid states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordinatorState {
    /// No active schedule.
    Idle,

    /// Waiting for the next deadline.
    Scheduled,

    /// A cleanup run is in flight.
    Running,
}

impl CoordinatorState {
    pub fn is_idle(self) -> bool {
        matches!(self, CoordinatorState::Idle)
    }

    /// Is there a live schedule (armed timer or in-flight run)?
    pub fn is_active(self) -> bool {
        matches!(self, CoordinatorState::Scheduled | CoordinatorState::Running)
    }
}
