//! Core error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Project not found: {path}")]
    ProjectNotFound { path: String },

    #[error("Invalid tidemark.yaml: {message}")]
    InvalidProject { message: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Values merge error: {message}")]
    ValuesMerge { message: String },

    /// A write into a document hit an existing node that is not a mapping
    #[error("'{path}' property of target already exists but is not a mapping, it is a {found}")]
    TypeConflict { path: String, found: &'static str },
}

pub type Result<T> = std::result::Result<T, CoreError>;
