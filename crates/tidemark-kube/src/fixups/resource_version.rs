//! Keep the live `metadata.resourceVersion` on updates

use serde_json::Value as JsonValue;
use tidemark_core::Document;

use super::Fixup;

const PATH: [&str; 2] = ["metadata", "resourceVersion"];

/// Copies a non-empty `metadata.resourceVersion` from the live object, for
/// every kind, so a replace is checked against the version that was read.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResourceVersion;

impl Fixup for ResourceVersion {
    fn name(&self) -> &'static str {
        "metadata-resource-version"
    }

    fn apply(&self, original: &Document, target: &mut Document) -> tidemark_core::Result<()> {
        match original.get_str(&PATH) {
            Some(version) if !version.is_empty() => {
                target.set_path(&PATH, JsonValue::String(version.to_string()))
            }
            _ => Ok(()),
        }
    }
}
