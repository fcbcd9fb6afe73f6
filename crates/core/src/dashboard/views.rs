//! Joins and aggregates the presentation layer renders.
//!
//! Everything here is a pure function of one [`Snapshot`], so a rendered view
//! never mixes records from different reload cycles.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{Member, RecordId, Snapshot, Task, TaskStatus};
use crate::constants::{MASKED_SECRET, UNKNOWN_MEMBER};

/// Collection sizes shown on the summary cards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SummaryCounts {
    pub teams: usize,
    pub members: usize,
    pub tasks: usize,
    pub workspaces: usize,
}

impl SummaryCounts {
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        Self {
            teams: snapshot.teams.len(),
            members: snapshot.members.len(),
            tasks: snapshot.tasks.len(),
            workspaces: snapshot.workspaces.len(),
        }
    }
}

/// Task counts by status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TaskStatusSummary {
    pub total: usize,
    pub pending: usize,
    pub completed: usize,
    pub failed: usize,
    pub other: usize,
}

impl TaskStatusSummary {
    pub fn from_tasks(tasks: &[Task]) -> Self {
        tasks.iter().fold(
            Self {
                total: tasks.len(),
                ..Self::default()
            },
            |mut summary, task| {
                match task.status {
                    Some(TaskStatus::Pending) => summary.pending += 1,
                    Some(TaskStatus::Done) => summary.completed += 1,
                    Some(TaskStatus::Failed) => summary.failed += 1,
                    Some(TaskStatus::Other(_)) | None => summary.other += 1,
                }
                summary
            },
        )
    }
}

/// Member id to display name lookup.
#[derive(Debug, Clone, Default)]
pub struct MemberDirectory<'a> {
    names: HashMap<&'a RecordId, &'a str>,
}

impl<'a> MemberDirectory<'a> {
    pub fn new(members: &'a [Member]) -> Self {
        let names = members
            .iter()
            .filter_map(|m| {
                let name = m.display_name.as_deref().filter(|n| !n.is_empty())?;
                Some((m.id.as_ref()?, name))
            })
            .collect();
        Self { names }
    }

    /// Resolves a member reference, falling back to [`UNKNOWN_MEMBER`].
    pub fn display_name(&self, id: Option<&RecordId>) -> &'a str {
        id.and_then(|id| self.names.get(id).copied())
            .unwrap_or(UNKNOWN_MEMBER)
    }
}

/// One row of the tasks table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskRow {
    pub id: Option<RecordId>,
    pub title: String,
    pub assigned_member: String,
    pub status: Option<TaskStatus>,
    pub created_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

pub fn task_rows(snapshot: &Snapshot) -> Vec<TaskRow> {
    let directory = snapshot.member_directory();
    snapshot
        .tasks
        .iter()
        .map(|task| TaskRow {
            id: task.id.clone(),
            title: task.title.clone().unwrap_or_default(),
            assigned_member: directory
                .display_name(task.assigned_member_id.as_ref())
                .to_string(),
            status: task.status.clone(),
            created_at: task.created_at,
            completed_at: task.completed_at,
        })
        .collect()
}

/// One row of the teams table with its expandable member list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamRow {
    pub id: Option<RecordId>,
    pub team_name: String,
    pub member_count: usize,
    pub members: Vec<Member>,
}

pub fn team_rows(snapshot: &Snapshot) -> Vec<TeamRow> {
    snapshot
        .teams
        .iter()
        .map(|team| TeamRow {
            id: team.id.clone(),
            team_name: team.team_name.clone().unwrap_or_default(),
            member_count: team.members.len(),
            members: team.members.clone(),
        })
        .collect()
}

/// Workspace card with its detail section.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkspaceCard {
    pub id: Option<RecordId>,
    pub team_name: String,
    pub bot_user_id: String,
    pub team_id: Option<RecordId>,
    pub installed_at: Option<DateTime<Utc>>,
    pub bot_token: &'static str,
}

pub fn workspace_cards(snapshot: &Snapshot) -> Vec<WorkspaceCard> {
    snapshot
        .workspaces
        .iter()
        .map(|workspace| WorkspaceCard {
            id: workspace.id.clone(),
            team_name: workspace.team_name.clone().unwrap_or_default(),
            bot_user_id: workspace.bot_user_id.clone().unwrap_or_default(),
            team_id: workspace.team_id.clone(),
            installed_at: workspace.installed_at,
            bot_token: MASKED_SECRET,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::{Team, Workspace};

    fn member(id: i64, name: &str) -> Member {
        Member {
            id: Some(RecordId::from(id)),
            display_name: Some(name.to_string()),
            slack_user_id: Some(format!("U{}", id)),
        }
    }

    fn task(id: i64, assigned: Option<i64>, status: Option<TaskStatus>) -> Task {
        Task {
            id: Some(RecordId::from(id)),
            title: Some(format!("task {}", id)),
            assigned_member_id: assigned.map(RecordId::from),
            status,
            ..Task::default()
        }
    }

    #[test]
    fn test_task_rows_resolve_member_names() {
        let snapshot = Snapshot {
            members: vec![member(9, "Ava")],
            tasks: vec![
                task(1, Some(9), Some(TaskStatus::Pending)),
                task(2, Some(404), Some(TaskStatus::Done)),
                task(3, None, None),
            ],
            ..Snapshot::default()
        };

        let rows = task_rows(&snapshot);

        assert_eq!(rows[0].assigned_member, "Ava");
        assert_eq!(rows[1].assigned_member, UNKNOWN_MEMBER);
        assert_eq!(rows[2].assigned_member, UNKNOWN_MEMBER);
    }

    #[test]
    fn test_nameless_member_resolves_to_unknown() {
        let members = vec![Member {
            id: Some(RecordId::from(9)),
            ..Member::default()
        }];
        let directory = MemberDirectory::new(&members);
        assert_eq!(
            directory.display_name(Some(&RecordId::from(9))),
            UNKNOWN_MEMBER
        );
    }

    #[test]
    fn test_empty_display_name_resolves_to_unknown() {
        let snapshot = Snapshot {
            members: vec![member(9, "")],
            tasks: vec![task(1, Some(9), Some(TaskStatus::Pending))],
            ..Snapshot::default()
        };

        let rows = task_rows(&snapshot);

        assert_eq!(rows[0].assigned_member, UNKNOWN_MEMBER);
    }

    #[test]
    fn test_status_summary_counts() {
        let tasks = vec![
            task(1, None, Some(TaskStatus::Pending)),
            task(2, None, Some(TaskStatus::Pending)),
            task(3, None, Some(TaskStatus::Done)),
            task(4, None, Some(TaskStatus::Failed)),
            task(5, None, Some(TaskStatus::Other("blocked".to_string()))),
        ];

        let summary = TaskStatusSummary::from_tasks(&tasks);

        assert_eq!(
            summary,
            TaskStatusSummary {
                total: 5,
                pending: 2,
                completed: 1,
                failed: 1,
                other: 1,
            }
        );
    }

    #[test]
    fn test_team_rows_and_workspace_cards() {
        let snapshot = Snapshot {
            teams: vec![Team {
                id: Some(RecordId::from(1)),
                team_name: Some("Eng".to_string()),
                members: vec![member(9, "Ava"), member(10, "Bo")],
            }],
            workspaces: vec![Workspace {
                id: Some(RecordId::from(2)),
                team_name: Some("Eng".to_string()),
                bot_user_id: Some("B1".to_string()),
                ..Workspace::default()
            }],
            ..Snapshot::default()
        };

        let teams = team_rows(&snapshot);
        assert_eq!(teams[0].member_count, 2);

        let cards = workspace_cards(&snapshot);
        assert_eq!(cards[0].bot_user_id, "B1");
        assert_eq!(cards[0].bot_token, MASKED_SECRET);

        let counts = SummaryCounts::from_snapshot(&snapshot);
        assert_eq!((counts.teams, counts.workspaces, counts.tasks), (1, 1, 0));
    }
}
