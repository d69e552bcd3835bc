//! JSON serialization for decoding summaries and information estimates.

use serde::Serialize;

/// Serialize a result to a compact JSON string.
///
/// # Errors
///
/// Returns an error if serialization fails (should not happen for the
/// crate's result types).
pub fn to_json<T: Serialize + ?Sized>(result: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string(result)
}

/// Serialize a result to a pretty-printed JSON string.
///
/// # Errors
///
/// Returns an error if serialization fails (should not happen for the
/// crate's result types).
pub fn to_json_pretty<T: Serialize + ?Sized>(result: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(result)
}
