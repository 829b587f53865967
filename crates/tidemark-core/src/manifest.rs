//! Rendered manifests

use serde::{Deserialize, Serialize};

/// The output of rendering one template: possibly several YAML documents
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedManifest {
    /// Template the content was rendered from (diagnostics only)
    pub source: String,

    /// Rendered text, documents separated by `---` lines
    pub content: String,
}

impl RenderedManifest {
    pub fn new(source: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            content: content.into(),
        }
    }
}
