//! Dashboard module - record types, redaction, fetching, snapshots and views.

mod dashboard_model;
mod dashboard_traits;
mod fetcher;
mod redaction;
mod snapshot;
mod views;

pub use dashboard_model::{Collection, Member, RecordId, Task, TaskStatus, Team, Workspace};
pub use dashboard_traits::{CollectionSource, InMemoryCollectionSource};
pub use fetcher::DataFetcher;
pub use redaction::redact_workspace;
pub use snapshot::Snapshot;
pub use views::{
    team_rows, task_rows, workspace_cards, MemberDirectory, SummaryCounts, TaskRow,
    TaskStatusSummary, TeamRow, WorkspaceCard,
};
