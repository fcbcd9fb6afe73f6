use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::constants::DASHBOARD_API_PREFIX;

/// One of the four resource sets served by the dashboard API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Teams,
    Members,
    Tasks,
    Workspaces,
}

impl Collection {
    pub const ALL: [Collection; 4] = [
        Collection::Teams,
        Collection::Members,
        Collection::Tasks,
        Collection::Workspaces,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Teams => "teams",
            Collection::Members => "members",
            Collection::Tasks => "tasks",
            Collection::Workspaces => "workspaces",
        }
    }

    /// Relative API path, e.g. `dashboard/teams`.
    pub fn path(&self) -> String {
        format!("{}/{}", DASHBOARD_API_PREFIX, self.as_str())
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque record identity.
///
/// The backend sends ids as JSON numbers or strings; both forms map onto the
/// same string so `1` and `"1"` identify the same record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Reads an id out of an arbitrary JSON value, if it has an id shape.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) if !s.is_empty() => Some(Self(s.clone())),
            Value::Number(n) => Some(Self(n.to_string())),
            _ => None,
        }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<i64> for RecordId {
    fn from(value: i64) -> Self {
        Self(value.to_string())
    }
}

impl Serialize for RecordId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

/// A team with its embedded member list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Team {
    #[serde(default, deserialize_with = "lenient::id")]
    pub id: Option<RecordId>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub team_name: Option<String>,
    #[serde(default, deserialize_with = "lenient::members")]
    pub members: Vec<Member>,
}

/// A Slack user known to the todo bot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Member {
    #[serde(default, deserialize_with = "lenient::id")]
    pub id: Option<RecordId>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub display_name: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub slack_user_id: Option<String>,
}

/// Lifecycle state of a task.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TaskStatus {
    Done,
    Pending,
    Failed,
    /// Any status string this build does not recognize, kept verbatim.
    Other(String),
}

impl TaskStatus {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "done" => TaskStatus::Done,
            "pending" => TaskStatus::Pending,
            "failed" => TaskStatus::Failed,
            other => TaskStatus::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            TaskStatus::Done => "done",
            TaskStatus::Pending => "pending",
            TaskStatus::Failed => "failed",
            TaskStatus::Other(raw) => raw,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for TaskStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// A todo item created through the Slack integration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Task {
    #[serde(default, deserialize_with = "lenient::id")]
    pub id: Option<RecordId>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub title: Option<String>,
    /// May reference a member that is not (yet) in the snapshot.
    #[serde(default, deserialize_with = "lenient::id")]
    pub assigned_member_id: Option<RecordId>,
    #[serde(default, deserialize_with = "lenient::status")]
    pub status: Option<TaskStatus>,
    #[serde(default, deserialize_with = "lenient::timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient::timestamp")]
    pub completed_at: Option<DateTime<Utc>>,
}

/// A Slack workspace installation of the bot.
///
/// There is deliberately no field for the OAuth payload: records are redacted
/// before they are decoded into this type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Workspace {
    #[serde(default, deserialize_with = "lenient::id")]
    pub id: Option<RecordId>,
    #[serde(default, deserialize_with = "lenient::id")]
    pub team_id: Option<RecordId>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub team_name: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub bot_user_id: Option<String>,
    #[serde(default, deserialize_with = "lenient::timestamp")]
    pub installed_at: Option<DateTime<Utc>>,
}

/// Field decoders that map absent, null, or wrongly-typed values to `None`
/// instead of failing the whole record.
mod lenient {
    use super::*;

    pub fn id<'de, D: Deserializer<'de>>(d: D) -> Result<Option<RecordId>, D::Error> {
        let value = Option::<Value>::deserialize(d)?;
        Ok(value.as_ref().and_then(RecordId::from_value))
    }

    pub fn text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        let value = Option::<Value>::deserialize(d)?;
        Ok(match value {
            Some(Value::String(s)) => Some(s),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        })
    }

    pub fn status<'de, D: Deserializer<'de>>(d: D) -> Result<Option<TaskStatus>, D::Error> {
        Ok(text(d)?.map(|raw| TaskStatus::parse(&raw)))
    }

    pub fn timestamp<'de, D: Deserializer<'de>>(
        d: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        Ok(text(d)?.and_then(|raw| parse_timestamp(&raw)))
    }

    pub fn members<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<Member>, D::Error> {
        let value = Option::<Value>::deserialize(d)?;
        let Some(Value::Array(items)) = value else {
            return Ok(Vec::new());
        };
        Ok(items
            .into_iter()
            .filter(Value::is_object)
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect())
    }

    pub(super) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
        if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
            return Some(ts.with_timezone(&Utc));
        }
        ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
            .map(|naive| naive.and_utc())
    }
}
