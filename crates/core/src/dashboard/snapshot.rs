use serde::Serialize;

use super::{Collection, MemberDirectory, RecordId};
use crate::errors::MalformedRecord;

/// All four collections as produced by one reload cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Snapshot {
    pub teams: Vec<super::Team>,
    pub members: Vec<super::Member>,
    pub tasks: Vec<super::Task>,
    pub workspaces: Vec<super::Workspace>,
}

impl Snapshot {
    pub fn is_empty(&self) -> bool {
        self.teams.is_empty()
            && self.members.is_empty()
            && self.tasks.is_empty()
            && self.workspaces.is_empty()
    }

    pub fn member_directory(&self) -> MemberDirectory<'_> {
        MemberDirectory::new(&self.members)
    }

    /// Lists records that are missing fields the dashboard expects.
    pub fn audit(&self) -> Vec<MalformedRecord> {
        let mut issues = Vec::new();

        for (index, team) in self.teams.iter().enumerate() {
            let missing = missing_fields(&[
                ("id", team.id.is_none()),
                ("team_name", team.team_name.is_none()),
            ]);
            push_issue(&mut issues, Collection::Teams, index, &team.id, missing);
        }

        for (index, member) in self.members.iter().enumerate() {
            let missing = missing_fields(&[
                ("id", member.id.is_none()),
                ("display_name", member.display_name.is_none()),
                ("slack_user_id", member.slack_user_id.is_none()),
            ]);
            push_issue(&mut issues, Collection::Members, index, &member.id, missing);
        }

        for (index, task) in self.tasks.iter().enumerate() {
            let missing = missing_fields(&[
                ("id", task.id.is_none()),
                ("title", task.title.is_none()),
                ("status", task.status.is_none()),
                ("created_at", task.created_at.is_none()),
            ]);
            push_issue(&mut issues, Collection::Tasks, index, &task.id, missing);
        }

        for (index, workspace) in self.workspaces.iter().enumerate() {
            let missing = missing_fields(&[
                ("id", workspace.id.is_none()),
                ("team_id", workspace.team_id.is_none()),
                ("team_name", workspace.team_name.is_none()),
                ("bot_user_id", workspace.bot_user_id.is_none()),
                ("installed_at", workspace.installed_at.is_none()),
            ]);
            push_issue(
                &mut issues,
                Collection::Workspaces,
                index,
                &workspace.id,
                missing,
            );
        }

        issues
    }
}

fn missing_fields(checks: &[(&'static str, bool)]) -> Vec<&'static str> {
    checks
        .iter()
        .filter(|(_, missing)| *missing)
        .map(|(name, _)| *name)
        .collect()
}

fn push_issue(
    issues: &mut Vec<MalformedRecord>,
    collection: Collection,
    index: usize,
    id: &Option<RecordId>,
    missing_fields: Vec<&'static str>,
) {
    if !missing_fields.is_empty() {
        issues.push(MalformedRecord {
            collection,
            index,
            id: id.clone(),
            missing_fields,
        });
    }
}
