//! YAML rendering for structured values in tracing events.

use serde::Serialize;
use std::fmt::Debug;

/// Renders a schema graph, diff or report as an indented YAML block so a
/// `debug!` line stays readable when the value has dozens of nested entries.
///
/// ```ignore
/// debug!(diff = %Pretty(&diff), "schema diff");
/// ```
///
/// Values that YAML cannot represent (maps with non-string keys) fall back to
/// the alternate `Debug` form.
pub struct Pretty<T>(pub T);

impl<T: Serialize + Debug> std::fmt::Display for Pretty<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match serde_yaml_ng::to_string(&self.0) {
            Ok(yaml) => write!(f, "\n{}", yaml),
            Err(_) => write!(f, "\n{:#?}", self.0),
        }
    }
}

impl<T: Serialize + Debug> std::fmt::Debug for Pretty<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(self, f)
    }
}
