use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use log::{debug, info, warn};
use tokio::runtime::Handle;
use tokio::sync::watch;

use super::{DashboardState, ReloadOutcome, SyncStatus};
use crate::dashboard::{DataFetcher, Snapshot};
use crate::errors::Result;

/// Scheduling flags guarded together so begin/finish decisions are atomic.
#[derive(Debug, Default)]
struct Coordination {
    in_flight: bool,
    pending_rerun: bool,
    torn_down: bool,
}

enum Begin {
    Start,
    Coalesced,
    TornDown,
}

/// Keeps the dashboard snapshot eventually consistent with the backend.
pub struct Synchronizer {
    fetcher: DataFetcher,
    coordination: Mutex<Coordination>,
    state: watch::Sender<Arc<DashboardState>>,
}

impl Synchronizer {
    pub fn new(fetcher: DataFetcher) -> Arc<Self> {
        let (state, _) = watch::channel(Arc::new(DashboardState::default()));
        Arc::new(Self {
            fetcher,
            coordination: Mutex::new(Coordination::default()),
            state,
        })
    }

    /// Observer for state changes; the receiver always sees whole states.
    pub fn subscribe(&self) -> watch::Receiver<Arc<DashboardState>> {
        self.state.subscribe()
    }

    pub fn current(&self) -> Arc<DashboardState> {
        self.state.borrow().clone()
    }

    pub fn is_reloading(&self) -> bool {
        self.lock().in_flight
    }

    pub fn is_torn_down(&self) -> bool {
        self.lock().torn_down
    }

    /// Requests a reload without waiting for it.
    ///
    /// Spawns a reload task on the current runtime when none is in flight,
    /// otherwise folds the request into the in-flight one.
    pub fn trigger(self: &Arc<Self>) -> ReloadOutcome {
        match self.try_begin() {
            Begin::Coalesced => ReloadOutcome::Coalesced,
            Begin::TornDown => ReloadOutcome::TornDown,
            Begin::Start => match Handle::try_current() {
                Ok(handle) => {
                    let sync = Arc::clone(self);
                    handle.spawn(async move {
                        sync.drive().await;
                    });
                    ReloadOutcome::Spawned
                }
                Err(_) => {
                    warn!("No async runtime available, dashboard reload skipped");
                    let mut coordination = self.lock();
                    coordination.in_flight = false;
                    coordination.pending_rerun = false;
                    ReloadOutcome::Unscheduled
                }
            },
        }
    }

    /// Reloads and waits for the cycle, plus any rerun coalesced into it.
    ///
    /// If a reload is already in flight this returns immediately with
    /// [`ReloadOutcome::Coalesced`].
    pub async fn reload(&self) -> ReloadOutcome {
        match self.try_begin() {
            Begin::Start => ReloadOutcome::Completed {
                cycles: self.drive().await,
            },
            Begin::Coalesced => ReloadOutcome::Coalesced,
            Begin::TornDown => ReloadOutcome::TornDown,
        }
    }

    /// Stops scheduling reloads and discards any result still in flight.
    pub fn tear_down(&self) {
        let mut coordination = self.lock();
        if !coordination.torn_down {
            coordination.torn_down = true;
            coordination.pending_rerun = false;
            info!("Dashboard synchronizer torn down");
        }
    }

    fn try_begin(&self) -> Begin {
        let mut coordination = self.lock();
        if coordination.torn_down {
            Begin::TornDown
        } else if coordination.in_flight {
            coordination.pending_rerun = true;
            debug!("Reload already in flight, coalescing");
            Begin::Coalesced
        } else {
            coordination.in_flight = true;
            Begin::Start
        }
    }

    /// Runs cycles until no rerun is pending. Returns the number of cycles.
    async fn drive(&self) -> usize {
        let mut cycles = 0;
        loop {
            self.run_cycle().await;
            cycles += 1;
            if !self.finish_cycle() {
                return cycles;
            }
            debug!("Running coalesced dashboard reload");
        }
    }

    /// Clears the in-flight flag unless a rerun is due; returns whether to rerun.
    fn finish_cycle(&self) -> bool {
        let mut coordination = self.lock();
        if coordination.pending_rerun && !coordination.torn_down {
            coordination.pending_rerun = false;
            true
        } else {
            coordination.in_flight = false;
            coordination.pending_rerun = false;
            false
        }
    }

    async fn run_cycle(&self) {
        if !self.publish_if_mounted(|current| DashboardState {
            status: SyncStatus::Refreshing,
            ..current.clone()
        }) {
            return;
        }

        let result = self.fetcher.fetch_snapshot().await;
        self.apply(result);
    }

    fn apply(&self, result: Result<Snapshot>) {
        let applied = match result {
            Ok(snapshot) => {
                let issues = snapshot.audit();
                for issue in &issues {
                    warn!("Malformed record: {}", issue);
                }
                let snapshot = Arc::new(snapshot);
                self.publish_if_mounted(|current| DashboardState {
                    snapshot,
                    status: SyncStatus::Idle,
                    degraded: false,
                    last_error: None,
                    failed_collection: None,
                    consecutive_failures: 0,
                    generation: current.generation + 1,
                    refreshed_at: Some(Utc::now()),
                    malformed_records: issues.len(),
                })
            }
            Err(e) => {
                warn!(
                    "Dashboard reload failed on {}, keeping previous snapshot: {}",
                    e.collection(),
                    e
                );
                self.publish_if_mounted(|current| DashboardState {
                    status: SyncStatus::Degraded,
                    degraded: true,
                    last_error: Some(e.to_string()),
                    failed_collection: Some(e.collection()),
                    consecutive_failures: current.consecutive_failures + 1,
                    ..current.clone()
                })
            }
        };

        if !applied {
            debug!("Discarding reload result that arrived after teardown");
        }
    }

    /// Publishes the state built by `next` unless torn down.
    ///
    /// The coordination lock is held across the send so a teardown cannot
    /// interleave with it.
    fn publish_if_mounted<F>(&self, next: F) -> bool
    where
        F: FnOnce(&DashboardState) -> DashboardState,
    {
        let coordination = self.lock();
        if coordination.torn_down {
            return false;
        }
        let current = self.current();
        self.state.send_replace(Arc::new(next(&current)));
        true
    }

    fn lock(&self) -> MutexGuard<'_, Coordination> {
        self.coordination.lock().unwrap_or_else(|e| e.into_inner())
    }
}
