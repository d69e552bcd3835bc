//! Output formatting for decoding and information results.

mod json;

pub use json::{to_json, to_json_pretty};
