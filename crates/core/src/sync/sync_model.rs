use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::dashboard::{Collection, Snapshot};

/// Where the synchronizer is in its reload cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    /// Holding the last good snapshot (or the initial empty one).
    #[default]
    Idle,
    /// A reload cycle is in flight.
    Refreshing,
    /// The last cycle failed; the previous snapshot is retained.
    Degraded,
}

/// The state published to observers after every transition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardState {
    /// Four collections from a single reload cycle.
    pub snapshot: Arc<Snapshot>,
    pub status: SyncStatus,
    /// Set when the last completed cycle failed. Stays set while a retry is
    /// refreshing and clears on the next success.
    pub degraded: bool,
    pub last_error: Option<String>,
    /// Collection whose fetch failed the last cycle.
    pub failed_collection: Option<Collection>,
    pub consecutive_failures: u32,
    /// Number of snapshots applied so far; 0 means the initial empty one.
    pub generation: u64,
    pub refreshed_at: Option<DateTime<Utc>>,
    pub malformed_records: usize,
}

impl DashboardState {
    pub fn is_stale(&self) -> bool {
        self.degraded
    }
}

/// Result of asking the synchronizer to reload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadOutcome {
    /// A reload task was spawned on the current runtime.
    Spawned,
    /// The reload ran inline; `cycles` counts the coalesced reruns too.
    Completed { cycles: usize },
    /// A reload was already in flight; one rerun is scheduled after it.
    Coalesced,
    /// The dashboard has been torn down; nothing was scheduled.
    TornDown,
    /// No async runtime was available to run the reload.
    Unscheduled,
}
