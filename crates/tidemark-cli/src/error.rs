//! CLI error types with exit code handling
//!
//! Every command returns [`CliError`], which knows its exit code and renders
//! through miette. Template errors keep their source-annotated diagnostic.

use miette::Diagnostic;
use thiserror::Error;
use tidemark_core::CoreError;
use tidemark_engine::{EngineError, PredicateError, TemplateError};
use tidemark_kube::KubeError;

use crate::exit_codes;

/// CLI-specific error type that includes exit code information
#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    /// Template rendering failed, with source location
    #[error(transparent)]
    #[diagnostic(transparent)]
    Template(TemplateError),

    /// Rendered output could not be turned into objects
    #[error("Manifest error: {message}")]
    #[diagnostic(code(tidemark::cli::manifest))]
    Manifest {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Project structure or values loading error
    #[error("Project error: {message}")]
    #[diagnostic(code(tidemark::cli::project))]
    Project {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Invalid `--predicate`
    #[error("{message}")]
    #[diagnostic(
        code(tidemark::cli::predicate),
        help("predicates have the form [!]<template>=<regex>, e.g. '{{{{ kind }}}}=^Service$'")
    )]
    Predicate { message: String },

    /// Kubeconfig, discovery or API failure
    #[error("{message}")]
    #[diagnostic(code(tidemark::cli::cluster))]
    Cluster {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// IO error (file not found, permissions, etc.)
    #[error("IO error: {message}")]
    #[diagnostic(code(tidemark::cli::io))]
    Io { message: String },

    /// Wrapped error for passthrough (stores the formatted message)
    #[error("{message}")]
    #[diagnostic(code(tidemark::cli::error))]
    Other { message: String },
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Template(_) | CliError::Manifest { .. } => exit_codes::TEMPLATE_ERROR,
            CliError::Project { .. } => exit_codes::PROJECT_ERROR,
            CliError::Predicate { .. } => exit_codes::USAGE_ERROR,
            CliError::Cluster { .. } => exit_codes::CLUSTER_ERROR,
            CliError::Io { .. } => exit_codes::IO_ERROR,
            CliError::Other { .. } => exit_codes::ERROR,
        }
    }

    /// Create a project error with help text
    pub fn project_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Project {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    /// Create a cluster error
    pub fn cluster(message: impl Into<String>) -> Self {
        Self::Cluster {
            message: message.into(),
            help: None,
        }
    }

    /// Create a generic error
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        CliError::other(format!("cannot serialize output: {err}"))
    }
}

impl From<serde_yaml::Error> for CliError {
    fn from(err: serde_yaml::Error) -> Self {
        CliError::other(format!("cannot serialize output: {err}"))
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Io(e) => e.into(),
            CoreError::ProjectNotFound { path } => CliError::project_with_help(
                format!("no {} found in {path}", tidemark_core::project::PROJECT_FILE),
                "point --project at the directory holding tidemark.yaml",
            ),
            other => CliError::Project {
                message: other.to_string(),
                help: None,
            },
        }
    }
}

impl From<PredicateError> for CliError {
    fn from(err: PredicateError) -> Self {
        CliError::Predicate {
            message: err.to_string(),
        }
    }
}

impl From<EngineError> for CliError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Template(te) => CliError::Template(te),
            EngineError::Predicate(pe) => pe.into(),
            EngineError::Project(ce) => ce.into(),
            EngineError::Io(e) => e.into(),
        }
    }
}

impl From<KubeError> for CliError {
    fn from(err: KubeError) -> Self {
        // Rendering errors are unwrapped to keep the template diagnostic
        let err = match err {
            KubeError::Render(engine) => return (*engine).into(),
            other => other,
        };

        let message = err.to_string();
        match err.root() {
            KubeError::Parse { .. } | KubeError::InvalidManifest(_) => CliError::Manifest {
                message,
                help: None,
            },
            KubeError::PredicateEvaluation { .. } => CliError::Predicate { message },
            KubeError::ResourceResolution { .. } => CliError::Cluster {
                message,
                help: Some("check that the kind's CRD is installed in the target cluster".to_string()),
            },
            KubeError::InvalidConfig(_) | KubeError::Kubeconfig(_) => CliError::Cluster {
                message,
                help: Some("pass --kubeconfig, set KUBE_CONFIG or create ~/.kube/config".to_string()),
            },
            _ => CliError::cluster(message),
        }
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
