//! Serializable coordinator status view.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::CoordinatorState;

/// Point-in-time view of the coordinator, for observability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorStatus {
    pub state: CoordinatorState,
    pub generation: u64,

    /// Armed deadline; `None` while idle or mid-run.
    pub next_deadline: Option<DateTime<Utc>>,
}
