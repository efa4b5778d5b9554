//! JSON serialization for run results.

use crate::result::RunResult;

/// Serialize a RunResult to a compact JSON string.
///
/// # Errors
///
/// Returns an error if serialization fails (should not happen for RunResult).
pub fn to_json(result: &RunResult) -> Result<String, serde_json::Error> {
    serde_json::to_string(result)
}

/// Serialize a RunResult to a pretty-printed JSON string.
///
/// # Errors
///
/// Returns an error if serialization fails (should not happen for RunResult).
pub fn to_json_pretty(result: &RunResult) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(result)
}
