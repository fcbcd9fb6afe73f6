//! Tests for the dashboard synchronizer.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::{Notify, Semaphore};

use super::*;
use crate::constants::UNKNOWN_MEMBER;
use crate::dashboard::{
    task_rows, Collection, CollectionSource, DataFetcher, InMemoryCollectionSource, TaskStatus,
};
use crate::errors::TransportError;
use crate::events::{ChangeEvent, InMemoryNotificationSource};

const WAIT: Duration = Duration::from_secs(5);

// ============================================================================
// Fixtures
// ============================================================================

/// Collection source whose teams fetch blocks until the test releases it.
struct GatedSource {
    inner: InMemoryCollectionSource,
    gate: Semaphore,
    started: Notify,
}

impl GatedSource {
    fn new() -> Self {
        Self {
            inner: seeded_source(),
            gate: Semaphore::new(0),
            started: Notify::new(),
        }
    }

    fn release(&self, cycles: usize) {
        self.gate.add_permits(cycles);
    }
}

#[async_trait]
impl CollectionSource for GatedSource {
    async fn fetch_collection(
        &self,
        collection: Collection,
    ) -> crate::errors::Result<Vec<Value>> {
        if collection == Collection::Teams {
            self.started.notify_one();
            if let Ok(permit) = self.gate.acquire().await {
                permit.forget();
            }
        }
        self.inner.fetch_collection(collection).await
    }
}

fn seeded_source() -> InMemoryCollectionSource {
    let source = InMemoryCollectionSource::new();
    source.set(Collection::Teams, vec![json!({"id": 1, "team_name": "Eng"})]);
    source.set(
        Collection::Members,
        vec![json!({"id": 9, "display_name": "Ava", "slack_user_id": "U1"})],
    );
    source.set(
        Collection::Tasks,
        vec![json!({
            "id": 5,
            "title": "Fix bug",
            "assigned_member_id": 9,
            "status": "pending",
            "created_at": "2024-01-01T00:00:00Z",
            "completed_at": null
        })],
    );
    source.set(
        Collection::Workspaces,
        vec![json!({
            "id": 2,
            "team_id": 1,
            "team_name": "Eng",
            "bot_user_id": "B1",
            "installed_at": "2024-01-01T00:00:00Z",
            "raw_oauth": "secret"
        })],
    );
    source
}

fn synchronizer_over(source: Arc<dyn CollectionSource>) -> Arc<Synchronizer> {
    Synchronizer::new(DataFetcher::new(source))
}

async fn wait_for_state<F>(sync: &Synchronizer, predicate: F) -> Arc<DashboardState>
where
    F: Fn(&DashboardState) -> bool,
{
    let mut rx = sync.subscribe();
    let state = tokio::time::timeout(WAIT, rx.wait_for(|state| predicate(state)))
        .await
        .expect("timed out waiting for dashboard state")
        .expect("state channel closed");
    Arc::clone(&state)
}

async fn wait_until_settled(sync: &Synchronizer) {
    tokio::time::timeout(WAIT, async {
        while sync.is_reloading() {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("reload never settled");
}

// ============================================================================
// Reload cycle
// ============================================================================

mod reload_cycle_tests {
    use super::*;

    #[tokio::test]
    async fn test_initial_reload_populates_snapshot() {
        let sync = synchronizer_over(Arc::new(seeded_source()));
        assert!(sync.current().snapshot.is_empty());

        let outcome = sync.reload().await;

        assert_eq!(outcome, ReloadOutcome::Completed { cycles: 1 });
        let state = sync.current();
        assert_eq!(state.status, SyncStatus::Idle);
        assert_eq!(state.generation, 1);
        assert!(!state.degraded);
        assert!(state.refreshed_at.is_some());

        let workspace = serde_json::to_value(&state.snapshot.workspaces[0]).unwrap();
        assert!(workspace.get("raw_oauth").is_none());

        let rows = task_rows(&state.snapshot);
        assert_eq!(rows[0].assigned_member, "Ava");
        assert_eq!(rows[0].status, Some(TaskStatus::Pending));
        assert_eq!(rows[0].status.as_ref().unwrap().to_string(), "pending");
    }

    #[tokio::test]
    async fn test_failed_reload_keeps_previous_snapshot() {
        let source = Arc::new(seeded_source());
        let sync = synchronizer_over(source.clone());
        sync.reload().await;
        let before = sync.current();

        source.fail(
            Collection::Members,
            TransportError::status(Collection::Members, 500, "boom"),
        );
        sync.reload().await;

        let after = sync.current();
        assert_eq!(after.snapshot, before.snapshot);
        assert_eq!(after.generation, before.generation);
        assert_eq!(after.status, SyncStatus::Degraded);
        assert!(after.degraded);
        assert_eq!(after.consecutive_failures, 1);
        assert!(after.last_error.as_deref().unwrap().contains("members"));
        assert_eq!(after.failed_collection, Some(Collection::Members));
    }

    #[tokio::test]
    async fn test_failure_from_empty_snapshot_stays_empty() {
        let source = Arc::new(seeded_source());
        source.fail(
            Collection::Workspaces,
            TransportError::network(Collection::Workspaces, "refused"),
        );
        let sync = synchronizer_over(source);

        sync.reload().await;

        let state = sync.current();
        assert!(state.snapshot.is_empty());
        assert!(state.degraded);
        assert_eq!(state.generation, 0);
    }

    #[tokio::test]
    async fn test_success_clears_degraded_flag() {
        let source = Arc::new(seeded_source());
        source.fail(
            Collection::Tasks,
            TransportError::network(Collection::Tasks, "timeout"),
        );
        let sync = synchronizer_over(source.clone());
        sync.reload().await;
        sync.reload().await;
        assert_eq!(sync.current().consecutive_failures, 2);

        source.set(Collection::Tasks, Vec::new());
        sync.reload().await;

        let state = sync.current();
        assert!(!state.degraded);
        assert_eq!(state.status, SyncStatus::Idle);
        assert_eq!(state.last_error, None);
        assert_eq!(state.failed_collection, None);
        assert_eq!(state.consecutive_failures, 0);
    }

    #[tokio::test]
    async fn test_unresolvable_member_degrades_to_sentinel() {
        let source = Arc::new(seeded_source());
        source.set(Collection::Members, Vec::new());
        let sync = synchronizer_over(source);

        sync.reload().await;

        let rows = task_rows(&sync.current().snapshot);
        assert_eq!(rows[0].assigned_member, UNKNOWN_MEMBER);
    }

    #[tokio::test]
    async fn test_malformed_records_are_counted_not_fatal() {
        let source = Arc::new(seeded_source());
        source.set(Collection::Tasks, vec![json!({"id": 1}), json!({})]);
        let sync = synchronizer_over(source);

        sync.reload().await;

        let state = sync.current();
        assert_eq!(state.status, SyncStatus::Idle);
        assert_eq!(state.snapshot.tasks.len(), 2);
        assert_eq!(state.malformed_records, 2);
    }
}

// ============================================================================
// Coalescing
// ============================================================================

mod coalescing_tests {
    use super::*;

    #[tokio::test]
    async fn test_events_during_reload_coalesce_into_one_rerun() {
        let source = Arc::new(GatedSource::new());
        let sync = synchronizer_over(source.clone());
        let notifications = Arc::new(InMemoryNotificationSource::new());
        let _mount = sync.mount(notifications.clone());

        source.started.notified().await;
        notifications.emit(ChangeEvent::TasksUpdated);
        notifications.emit(ChangeEvent::TasksUpdated);
        source.release(10);

        wait_for_state(&sync, |s| s.generation == 2).await;
        wait_until_settled(&sync).await;

        assert_eq!(source.inner.calls(Collection::Teams), 2);
        assert_eq!(sync.current().status, SyncStatus::Idle);
    }

    #[tokio::test]
    async fn test_trigger_while_in_flight_is_coalesced() {
        let source = Arc::new(GatedSource::new());
        let sync = synchronizer_over(source.clone());

        assert_eq!(sync.trigger(), ReloadOutcome::Spawned);
        source.started.notified().await;
        assert_eq!(sync.trigger(), ReloadOutcome::Coalesced);
        assert_eq!(sync.reload().await, ReloadOutcome::Coalesced);
        assert!(sync.is_reloading());

        source.release(2);
        wait_until_settled(&sync).await;

        assert_eq!(source.inner.calls(Collection::Teams), 2);
        assert_eq!(sync.current().generation, 2);
    }

    #[tokio::test]
    async fn test_quiet_reload_runs_single_cycle() {
        let source = Arc::new(GatedSource::new());
        let sync = synchronizer_over(source.clone());
        source.release(1);

        assert_eq!(
            sync.reload().await,
            ReloadOutcome::Completed { cycles: 1 }
        );
        assert!(!sync.is_reloading());
    }

    #[tokio::test]
    async fn test_events_of_different_names_also_coalesce() {
        let source = Arc::new(GatedSource::new());
        let sync = synchronizer_over(source.clone());
        let notifications = Arc::new(InMemoryNotificationSource::new());
        let _mount = sync.mount(notifications.clone());

        source.started.notified().await;
        for event in ChangeEvent::ALL {
            notifications.emit(event);
        }
        source.release(10);

        wait_for_state(&sync, |s| s.generation == 2).await;
        wait_until_settled(&sync).await;
        assert_eq!(source.inner.calls(Collection::Teams), 2);
    }
}

// ============================================================================
// Mount / teardown
// ============================================================================

mod mount_tests {
    use super::*;

    #[tokio::test]
    async fn test_mount_subscribes_all_events_and_loads() {
        let sync = synchronizer_over(Arc::new(seeded_source()));
        let notifications = Arc::new(InMemoryNotificationSource::new());

        let mount = sync.mount(notifications.clone());

        for event in ChangeEvent::ALL {
            assert_eq!(notifications.handler_count(event), 1);
        }
        let state = wait_for_state(mount.synchronizer(), |s| s.generation == 1).await;
        assert_eq!(state.snapshot.teams.len(), 1);
    }

    #[tokio::test]
    async fn test_event_failure_leaves_snapshot_unchanged() {
        let source = Arc::new(seeded_source());
        let sync = synchronizer_over(source.clone());
        let notifications = Arc::new(InMemoryNotificationSource::new());
        let _mount = sync.mount(notifications.clone());
        let before = wait_for_state(&sync, |s| s.generation == 1).await;
        wait_until_settled(&sync).await;

        source.fail(
            Collection::Members,
            TransportError::status(Collection::Members, 502, "bad gateway"),
        );
        notifications.emit(ChangeEvent::MembersUpdated);

        let after = wait_for_state(&sync, |s| s.status == SyncStatus::Degraded).await;
        assert!(after.degraded);
        assert_eq!(after.snapshot, before.snapshot);
        assert_eq!(after.generation, 1);
    }

    #[tokio::test]
    async fn test_workspace_event_triggers_reload() {
        let source = Arc::new(seeded_source());
        let sync = synchronizer_over(source.clone());
        let notifications = Arc::new(InMemoryNotificationSource::new());
        let _mount = sync.mount(notifications.clone());
        wait_for_state(&sync, |s| s.generation == 1).await;
        wait_until_settled(&sync).await;

        notifications.emit(ChangeEvent::WorkspacesUpdated);

        wait_for_state(&sync, |s| s.generation == 2).await;
        assert_eq!(source.calls(Collection::Workspaces), 2);
    }

    #[tokio::test]
    async fn test_unmount_releases_every_subscription() {
        let sync = synchronizer_over(Arc::new(seeded_source()));
        let notifications = Arc::new(InMemoryNotificationSource::new());
        let mount = sync.mount(notifications.clone());
        assert_eq!(notifications.total_handlers(), 4);

        mount.unmount();

        assert_eq!(notifications.total_handlers(), 0);
        assert!(sync.is_torn_down());
        assert_eq!(notifications.emit(ChangeEvent::TasksUpdated), 0);
        assert_eq!(sync.trigger(), ReloadOutcome::TornDown);
    }

    #[tokio::test]
    async fn test_late_result_after_teardown_is_discarded() {
        let source = Arc::new(GatedSource::new());
        let sync = synchronizer_over(source.clone());

        let reload = tokio::spawn({
            let sync = Arc::clone(&sync);
            async move { sync.reload().await }
        });
        source.started.notified().await;

        sync.tear_down();
        source.release(1);

        assert_eq!(
            reload.await.unwrap(),
            ReloadOutcome::Completed { cycles: 1 }
        );
        let state = sync.current();
        assert!(state.snapshot.is_empty());
        assert_eq!(state.generation, 0);
        assert!(!sync.is_reloading());
    }

    #[tokio::test]
    async fn test_observer_sees_whole_snapshots_only() {
        let source = Arc::new(seeded_source());
        let sync = synchronizer_over(source.clone());
        let mut rx = sync.subscribe();

        sync.reload().await;
        source.set(Collection::Teams, vec![json!({"id": 1}), json!({"id": 2})]);
        source.set(Collection::Tasks, Vec::new());
        sync.reload().await;

        assert!(rx.has_changed().unwrap());
        let state = rx.borrow_and_update().clone();
        assert_eq!(state.generation, 2);
        assert_eq!(state.snapshot.teams.len(), 2);
        assert!(state.snapshot.tasks.is_empty());
    }
}
