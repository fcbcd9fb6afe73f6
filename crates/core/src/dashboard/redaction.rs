use serde_json::Value;

use crate::constants::REDACTED_WORKSPACE_FIELDS;

/// Strips sensitive fields from a raw workspace record.
///
/// Every other field passes through untouched. Values that are not JSON
/// objects are returned as-is.
pub fn redact_workspace(mut record: Value) -> Value {
    if let Value::Object(fields) = &mut record {
        for key in REDACTED_WORKSPACE_FIELDS {
            fields.remove(*key);
        }
    }
    record
}
