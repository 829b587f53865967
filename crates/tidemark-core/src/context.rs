//! Template rendering context

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::project::Project;
use crate::values::Values;

/// Context available to all templates
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderContext {
    /// Project identity
    pub project: ProjectInfo,

    /// Selected kubeconfig context name (empty when none)
    pub context: String,

    /// User values (merged)
    pub values: JsonValue,
}

impl RenderContext {
    pub fn new(project: &Project, context: impl Into<String>, values: Values) -> Self {
        Self {
            project: ProjectInfo::from(project),
            context: context.into(),
            values: values.into_inner(),
        }
    }

    /// Replace the values, keeping project and context
    pub fn with_values(mut self, values: Values) -> Self {
        self.values = values.into_inner();
        self
    }
}

/// Project information for templates
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectInfo {
    pub group_id: String,
    pub artifact_id: String,
    pub release: String,
}

impl From<&Project> for ProjectInfo {
    fn from(project: &Project) -> Self {
        Self {
            group_id: project.group_id.clone(),
            artifact_id: project.artifact_id.clone(),
            release: project.release.clone(),
        }
    }
}
