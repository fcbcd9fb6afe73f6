//! Change event types.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::dashboard::Collection;

/// A backend notification that one collection changed.
///
/// Events carry no meaningful payload; arrival alone is the signal to reload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChangeEvent {
    TeamsUpdated,
    MembersUpdated,
    TasksUpdated,
    WorkspacesUpdated,
}

impl ChangeEvent {
    pub const ALL: [ChangeEvent; 4] = [
        ChangeEvent::TeamsUpdated,
        ChangeEvent::MembersUpdated,
        ChangeEvent::TasksUpdated,
        ChangeEvent::WorkspacesUpdated,
    ];

    /// Wire name of the event.
    pub fn name(&self) -> &'static str {
        match self {
            ChangeEvent::TeamsUpdated => "teamsUpdated",
            ChangeEvent::MembersUpdated => "membersUpdated",
            ChangeEvent::TasksUpdated => "tasksUpdated",
            ChangeEvent::WorkspacesUpdated => "workspacesUpdated",
        }
    }

    /// Parses a wire name; unrecognized names yield `None`.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|event| event.name() == name)
    }

    /// The collection this event reports on.
    pub fn collection(&self) -> Collection {
        match self {
            ChangeEvent::TeamsUpdated => Collection::Teams,
            ChangeEvent::MembersUpdated => Collection::Members,
            ChangeEvent::TasksUpdated => Collection::Tasks,
            ChangeEvent::WorkspacesUpdated => Collection::Workspaces,
        }
    }
}

impl fmt::Display for ChangeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
