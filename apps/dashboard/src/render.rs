//! Stdout rendering of published dashboard states.

use std::fmt::{self, Write as _};

use chrono::{DateTime, Utc};
use serde::Serialize;
use todo_dashboard_core::constants::NOT_COMPLETED;
use todo_dashboard_core::{
    task_rows, team_rows, workspace_cards, Collection, DashboardState, RecordId, Snapshot,
    SummaryCounts, SyncStatus, TaskStatusSummary,
};

use crate::config::OutputFormat;

const TITLE: &str = "Slack Todo Dashboard";

pub fn render(state: &DashboardState, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Text => Ok(render_text(state)),
        OutputFormat::Json => render_json(state),
    }
}

pub fn render_text(state: &DashboardState) -> String {
    TextDashboard(state).to_string()
}

/// One JSON document per state: status fields plus the redacted snapshot.
pub fn render_json(state: &DashboardState) -> anyhow::Result<String> {
    let document = JsonDashboard {
        status: state.status,
        degraded: state.degraded,
        last_error: state.last_error.as_deref(),
        failed_collection: state.failed_collection,
        generation: state.generation,
        refreshed_at: state.refreshed_at,
        malformed_records: state.malformed_records,
        summary: SummaryCounts::from_snapshot(&state.snapshot),
        task_status: TaskStatusSummary::from_tasks(&state.snapshot.tasks),
        snapshot: &state.snapshot,
    };
    Ok(serde_json::to_string(&document)?)
}

#[derive(Serialize)]
struct JsonDashboard<'a> {
    status: SyncStatus,
    degraded: bool,
    last_error: Option<&'a str>,
    failed_collection: Option<Collection>,
    generation: u64,
    refreshed_at: Option<DateTime<Utc>>,
    malformed_records: usize,
    summary: SummaryCounts,
    task_status: TaskStatusSummary,
    snapshot: &'a Snapshot,
}

struct TextDashboard<'a>(&'a DashboardState);

impl fmt::Display for TextDashboard<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.0;
        let snapshot = &*state.snapshot;

        writeln!(f, "{}", TITLE)?;
        writeln!(f, "{}", "=".repeat(TITLE.len()))?;
        if state.is_stale() {
            writeln!(
                f,
                "[stale] Showing last known data. Refresh failed: {}",
                state.last_error.as_deref().unwrap_or("unknown error")
            )?;
        }
        write!(f, "Status: {}", status_label(state.status))?;
        if let Some(at) = state.refreshed_at {
            write!(f, " | refreshed {}", format_timestamp(Some(at)))?;
        }
        if state.malformed_records > 0 {
            write!(f, " | {} malformed record(s)", state.malformed_records)?;
        }
        writeln!(f)?;

        let counts = SummaryCounts::from_snapshot(snapshot);
        writeln!(
            f,
            "\nTeams: {}   Members: {}   Tasks: {}   Workspaces: {}",
            counts.teams, counts.members, counts.tasks, counts.workspaces
        )?;

        section(f, "Teams")?;
        let teams = team_rows(snapshot);
        if teams.is_empty() {
            writeln!(f, "No teams")?;
        }
        for team in &teams {
            writeln!(f, "{} ({} members)", team.team_name, team.member_count)?;
            if team.members.is_empty() {
                writeln!(f, "    No members")?;
                continue;
            }
            let rows = team
                .members
                .iter()
                .map(|m| vec![text(&m.display_name), text(&m.slack_user_id)])
                .collect();
            table(f, "    ", &["NAME", "SLACK ID"], rows)?;
        }

        section(f, "Members")?;
        if snapshot.members.is_empty() {
            writeln!(f, "No data")?;
        } else {
            let rows = snapshot
                .members
                .iter()
                .map(|m| vec![id(m.id.as_ref()), text(&m.display_name), text(&m.slack_user_id)])
                .collect();
            table(f, "", &["ID", "DISPLAY NAME", "SLACK USER ID"], rows)?;
        }

        section(f, "Tasks")?;
        let summary = TaskStatusSummary::from_tasks(&snapshot.tasks);
        writeln!(
            f,
            "Total {}, Pending {}, Completed {}, Failed {}, Other {}",
            summary.total, summary.pending, summary.completed, summary.failed, summary.other
        )?;
        let tasks = task_rows(snapshot);
        if tasks.is_empty() {
            writeln!(f, "No tasks")?;
        } else {
            let rows = tasks
                .into_iter()
                .map(|row| {
                    vec![
                        id(row.id.as_ref()),
                        row.title,
                        row.assigned_member,
                        row.status.map(|s| s.to_string()).unwrap_or_default(),
                        format_timestamp(row.created_at),
                        row.completed_at
                            .map(|at| format_timestamp(Some(at)))
                            .unwrap_or_else(|| NOT_COMPLETED.to_string()),
                    ]
                })
                .collect();
            table(
                f,
                "",
                &["ID", "TITLE", "ASSIGNED MEMBER", "STATUS", "CREATED AT", "COMPLETED AT"],
                rows,
            )?;
        }

        section(f, "Workspaces")?;
        let cards = workspace_cards(snapshot);
        if cards.is_empty() {
            writeln!(f, "No workspaces")?;
        }
        for card in cards {
            writeln!(f, "{} (Bot: {})", card.team_name, card.bot_user_id)?;
            writeln!(f, "    Team ID: {}", id(card.team_id.as_ref()))?;
            writeln!(f, "    Installed: {}", format_timestamp(card.installed_at))?;
            writeln!(f, "    Bot Token: {}", card.bot_token)?;
        }
        Ok(())
    }
}

fn section(f: &mut fmt::Formatter<'_>, title: &str) -> fmt::Result {
    writeln!(f, "\n{}\n{}", title, "-".repeat(title.len()))
}

/// Left-aligned columns padded to the widest cell.
fn table(
    f: &mut fmt::Formatter<'_>,
    indent: &str,
    headers: &[&str],
    rows: Vec<Vec<String>>,
) -> fmt::Result {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    write_row(f, indent, &widths, headers.iter().copied())?;
    for row in &rows {
        write_row(f, indent, &widths, row.iter().map(String::as_str))?;
    }
    Ok(())
}

fn write_row<'a>(
    f: &mut fmt::Formatter<'_>,
    indent: &str,
    widths: &[usize],
    cells: impl Iterator<Item = &'a str>,
) -> fmt::Result {
    let mut line = String::new();
    for (i, (cell, width)) in cells.zip(widths).enumerate() {
        if i > 0 {
            line.push_str(" | ");
        }
        write!(line, "{:<width$}", cell, width = *width)?;
    }
    writeln!(f, "{}{}", indent, line.trim_end())
}

fn status_label(status: SyncStatus) -> &'static str {
    match status {
        SyncStatus::Idle => "idle",
        SyncStatus::Refreshing => "refreshing",
        SyncStatus::Degraded => "degraded",
    }
}

fn text(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

fn id(value: Option<&RecordId>) -> String {
    value.map(|id| id.to_string()).unwrap_or_default()
}

fn format_timestamp(at: Option<DateTime<Utc>>) -> String {
    at.map(|at| at.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_default()
}
