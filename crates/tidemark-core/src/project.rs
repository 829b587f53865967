//! Project definition and loading
//!
//! A project is a directory holding a `tidemark.yaml`, an optional
//! `values.yaml` and a templates directory.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::path::{Path, PathBuf};

use crate::error::{CoreError, Result};
use crate::values::Values;

/// Name of the project file inside the project root
pub const PROJECT_FILE: &str = "tidemark.yaml";

/// Name of the optional default values file
pub const VALUES_FILE: &str = "values.yaml";

/// A Tidemark project definition (`tidemark.yaml`)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    #[serde(default)]
    pub group_id: String,

    pub artifact_id: String,

    #[serde(default)]
    pub release: String,

    /// Template directory, relative to the project root
    #[serde(default = "default_templates_dir")]
    pub templates_dir: PathBuf,

    /// Inline values, merged over `values.yaml`
    #[serde(default = "Values::new")]
    pub values: Values,

    /// Values merged only when their predicate matches the render context
    #[serde(default)]
    pub conditional_values: Vec<ConditionalValues>,
}

fn default_templates_dir() -> PathBuf {
    PathBuf::from("templates")
}

/// Values applied when `on` matches
///
/// ```yaml
/// conditionalValues:
///   - on: "{{ context }}=^prod-"
///     replicas: 3
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConditionalValues {
    /// Predicate text in the `[!]<template>=<regex>` form; empty always applies
    #[serde(default)]
    pub on: String,

    #[serde(flatten)]
    pub values: Map<String, JsonValue>,
}

impl ConditionalValues {
    pub fn values(&self) -> Values {
        Values(JsonValue::Object(self.values.clone()))
    }
}

/// A project loaded from disk
#[derive(Debug, Clone)]
pub struct LoadedProject {
    pub project: Project,
    pub root: PathBuf,
    pub templates_dir: PathBuf,
    pub values_path: PathBuf,
}

impl LoadedProject {
    /// Load a project from its root directory
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let root = path.as_ref().to_path_buf();
        let project_file = root.join(PROJECT_FILE);

        if !project_file.exists() {
            return Err(CoreError::ProjectNotFound {
                path: root.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(&project_file)?;
        let project: Project = serde_yaml::from_str(&content)?;

        if project.artifact_id.trim().is_empty() {
            return Err(CoreError::InvalidProject {
                message: "artifactId must not be empty".to_string(),
            });
        }

        let templates_dir = root.join(&project.templates_dir);
        let values_path = root.join(VALUES_FILE);

        Ok(Self {
            project,
            root,
            templates_dir,
            values_path,
        })
    }

    /// `values.yaml` (if present) with the inline project values merged on top
    pub fn base_values(&self) -> Result<Values> {
        let mut values = if self.values_path.exists() {
            Values::from_file(&self.values_path)?
        } else {
            Values::new()
        };

        if !self.project.values.is_empty() {
            values.merge(&self.project.values);
        }

        Ok(values)
    }

    /// Template files, sorted for deterministic render order
    pub fn template_files(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();

        if !self.templates_dir.exists() {
            return Ok(files);
        }

        for entry in walkdir::WalkDir::new(&self.templates_dir) {
            let entry = entry.map_err(|e| CoreError::Io(e.into()))?;
            let path = entry.path();
            if path.is_file() {
                if let Some(ext) = path.extension() {
                    let ext = ext.to_string_lossy().to_lowercase();
                    if matches!(ext.as_str(), "yaml" | "yml" | "j2" | "json") {
                        files.push(path.to_path_buf());
                    }
                }
            }
        }

        files.sort();
        Ok(files)
    }
}
