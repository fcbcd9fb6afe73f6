/// Display value for a task whose assigned member cannot be resolved.
pub const UNKNOWN_MEMBER: &str = "Unknown";

/// Display value for a task status that is absent from the record.
pub const UNKNOWN_STATUS: &str = "unknown";

/// Display value for a missing completion timestamp.
pub const NOT_COMPLETED: &str = "—";

/// Placeholder shown in place of the workspace bot token.
pub const MASKED_SECRET: &str = "*******";

/// Workspace fields stripped at the fetch boundary.
pub const REDACTED_WORKSPACE_FIELDS: &[&str] = &["raw_oauth"];

/// Path prefix of the dashboard read API.
pub const DASHBOARD_API_PREFIX: &str = "dashboard";
