//! Error types for tidemark-kube

use thiserror::Error;
use tidemark_core::Gvk;

/// Result type for tidemark-kube operations
pub type Result<T> = std::result::Result<T, KubeError>;

/// Errors that can occur while dispatching, fixing up and reconciling objects
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum KubeError {
    /// A rendered document could not be turned into an object
    #[error("cannot parse document #{index} of '{source_name}': {message}")]
    Parse {
        source_name: String,
        index: usize,
        message: String,
    },

    /// Predicate template failed while evaluating an object
    #[error("cannot evaluate predicate template '{template}': {message}")]
    PredicateEvaluation { template: String, message: String },

    /// A fixup would have to overwrite a non-mapping node of the target
    #[error("fixup '{fixup}' failed: '{path}' property of target already exists but is not a mapping, it is a {found}")]
    FixupTypeConflict {
        fixup: String,
        path: String,
        found: &'static str,
    },

    /// The cluster does not serve the requested kind
    #[error("resource type not found on cluster: apiVersion={api_version}, kind={kind}")]
    ResourceResolution { api_version: String, kind: String },

    /// The cluster rejected a write
    #[error("cannot apply {reference}: {message}")]
    Apply { reference: String, message: String },

    /// Kubernetes API error
    #[error("Kubernetes API error: {0}")]
    Api(#[from] kube::Error),

    /// Kubeconfig could not be read or resolved
    #[error("kubeconfig error: {0}")]
    Kubeconfig(#[from] kube::config::KubeconfigError),

    /// Template rendering failed upstream of dispatch
    #[error("render error: {0}")]
    Render(#[source] Box<tidemark_engine::EngineError>),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Object is structurally valid YAML but not a usable manifest
    #[error("invalid manifest: {0}")]
    InvalidManifest(String),

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Failure while handling one dispatched object
    #[error("{source_name}{}: {error}", gvk_suffix(.gvk))]
    Object {
        source_name: String,
        gvk: Option<Gvk>,
        #[source]
        error: Box<KubeError>,
    },
}

fn gvk_suffix(gvk: &Option<Gvk>) -> String {
    match gvk {
        Some(gvk) => format!(" ({gvk})"),
        None => String::new(),
    }
}

impl KubeError {
    /// Attach the source template and GVK of the object being handled
    pub fn for_object(self, source_name: impl Into<String>, gvk: Option<Gvk>) -> Self {
        match self {
            already @ KubeError::Object { .. } => already,
            error => KubeError::Object {
                source_name: source_name.into(),
                gvk,
                error: Box::new(error),
            },
        }
    }

    /// The underlying error, without object context
    pub fn root(&self) -> &KubeError {
        match self {
            KubeError::Object { error, .. } => error.root(),
            other => other,
        }
    }

    /// Check if this is a Kubernetes 404 Not Found error
    pub fn is_not_found(&self) -> bool {
        matches!(self.root(), KubeError::Api(kube::Error::Api(resp)) if resp.code == 404)
    }

    /// Check if this is a conflict error (409)
    pub fn is_conflict(&self) -> bool {
        matches!(self.root(), KubeError::Api(kube::Error::Api(resp)) if resp.code == 409)
    }
}

impl From<serde_json::Error> for KubeError {
    fn from(e: serde_json::Error) -> Self {
        KubeError::Serialization(e.to_string())
    }
}

impl From<serde_yaml::Error> for KubeError {
    fn from(e: serde_yaml::Error) -> Self {
        KubeError::Serialization(e.to_string())
    }
}

impl From<tidemark_core::CoreError> for KubeError {
    fn from(e: tidemark_core::CoreError) -> Self {
        KubeError::InvalidManifest(e.to_string())
    }
}

impl From<tidemark_engine::PredicateError> for KubeError {
    fn from(e: tidemark_engine::PredicateError) -> Self {
        match e {
            tidemark_engine::PredicateError::Evaluation { template, message } => {
                KubeError::PredicateEvaluation { template, message }
            }
            other => KubeError::InvalidConfig(other.to_string()),
        }
    }
}

impl From<tidemark_engine::EngineError> for KubeError {
    fn from(e: tidemark_engine::EngineError) -> Self {
        match e {
            tidemark_engine::EngineError::Predicate(p) => p.into(),
            other => KubeError::Render(Box::new(other)),
        }
    }
}
