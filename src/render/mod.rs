//! Output rendering for human and JSON modes.

pub mod error;
pub mod human;

use crate::error::Result;

pub use error::render_error;

/// Render any serializable value as JSON.
///
/// # Errors
///
/// Returns a JSON error if serialization fails.
pub fn render_json<T: serde::Serialize>(output: &T, pretty: bool) -> Result<String> {
    if pretty {
        Ok(serde_json::to_string_pretty(output)?)
    } else {
        Ok(serde_json::to_string(output)?)
    }
}
