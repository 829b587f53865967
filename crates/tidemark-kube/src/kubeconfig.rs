//! Kubeconfig discovery and client construction
//!
//! Sources, merged in this order (first definition wins):
//! 1. `KUBE_CONFIG`: kubeconfig YAML passed inline through the environment
//! 2. the file given with `--kubeconfig`, which must exist, or else
//!    `~/.kube/config` when present
//!
//! At least one source is required.

use kube::{
    Client, Config,
    config::{KubeConfigOptions, Kubeconfig},
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{KubeError, Result};

/// Environment variable holding inline kubeconfig content
pub const KUBE_CONFIG_ENV: &str = "KUBE_CONFIG";

/// Default timeout for Kubernetes API requests
const DEFAULT_API_TIMEOUT: Duration = Duration::from_secs(30);

/// Where to read the kubeconfig from and which context to select
#[derive(Debug, Clone, Default)]
pub struct KubeconfigLoader {
    path: Option<PathBuf>,
    context: Option<String>,
    inline: Option<String>,
    default_path: Option<PathBuf>,
}

/// A loaded kubeconfig with its selected context
#[derive(Debug, Clone)]
pub struct LoadedKubeconfig {
    pub kubeconfig: Kubeconfig,
    /// Context override, or the file's `current-context`
    pub context: Option<String>,
}

/// One context, as listed by `tidemark contexts`; false and empty fields are omitted
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContextEntry {
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub selected: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub cluster: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server: Option<String>,
    /// The context's user (AuthInfo)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

impl KubeconfigLoader {
    /// Loader using the process environment and `~/.kube/config`
    pub fn new(path: Option<PathBuf>, context: Option<String>) -> Self {
        Self {
            path,
            context: context.filter(|c| !c.is_empty()),
            inline: std::env::var(KUBE_CONFIG_ENV).ok(),
            default_path: dirs::home_dir().map(|home| home.join(".kube").join("config")),
        }
    }

    /// Replace the inline (environment) content
    pub fn with_inline(mut self, content: Option<String>) -> Self {
        self.inline = content;
        self
    }

    /// Replace the fallback file location
    pub fn with_default_path(mut self, path: Option<PathBuf>) -> Self {
        self.default_path = path;
        self
    }

    /// Read and merge every available source
    pub fn load(&self) -> Result<LoadedKubeconfig> {
        let mut merged: Option<Kubeconfig> = None;

        if let Some(content) = &self.inline {
            tracing::debug!("using kubeconfig from {}", KUBE_CONFIG_ENV);
            merged = Some(Kubeconfig::from_yaml(content)?);
        }

        if let Some(path) = self.file_path()? {
            let from_file = Kubeconfig::read_from(&path)?;
            tracing::debug!(path = %path.display(), "using kubeconfig file");
            merged = Some(match merged {
                Some(config) => config.merge(from_file)?,
                None => from_file,
            });
        }

        let kubeconfig = merged.ok_or_else(|| {
            KubeError::InvalidConfig(format!(
                "there is neither --kubeconfig nor {} provided nor does {} exist",
                KUBE_CONFIG_ENV,
                self.default_path
                    .as_deref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "~/.kube/config".to_string())
            ))
        })?;

        let context = self
            .context
            .clone()
            .or_else(|| kubeconfig.current_context.clone());
        tracing::debug!(context = ?context, "selected context");

        Ok(LoadedKubeconfig { kubeconfig, context })
    }

    /// Explicit path (must exist) or the default one (ignored when absent)
    fn file_path(&self) -> Result<Option<PathBuf>> {
        if let Some(path) = &self.path {
            if !path.exists() {
                return Err(KubeError::InvalidConfig(format!(
                    "kubeconfig file {} does not exist",
                    path.display()
                )));
            }
            return Ok(Some(path.clone()));
        }

        Ok(self
            .default_path
            .as_deref()
            .filter(|p| p.exists())
            .map(Path::to_path_buf))
    }

    /// Build a client for the selected context
    pub async fn client(&self) -> Result<(Client, LoadedKubeconfig)> {
        let loaded = self.load()?;
        let options = KubeConfigOptions {
            context: loaded.context.clone(),
            ..Default::default()
        };

        let mut config = Config::from_custom_kubeconfig(loaded.kubeconfig.clone(), &options).await?;
        config.read_timeout = Some(DEFAULT_API_TIMEOUT);
        let client = Client::try_from(config)?;

        Ok((client, loaded))
    }
}

impl LoadedKubeconfig {
    /// Name of the selected context, empty when there is none
    pub fn context_name(&self) -> &str {
        self.context.as_deref().unwrap_or_default()
    }

    /// All contexts with their cluster and server, in file order
    pub fn contexts(&self) -> Vec<(String, ContextEntry)> {
        self.kubeconfig
            .contexts
            .iter()
            .map(|named| {
                let cluster = named
                    .context
                    .as_ref()
                    .map(|c| c.cluster.clone())
                    .unwrap_or_default();
                let user = named
                    .context
                    .as_ref()
                    .and_then(|c| c.user.clone())
                    .filter(|u| !u.is_empty());
                let server = self
                    .kubeconfig
                    .clusters
                    .iter()
                    .find(|c| c.name == cluster)
                    .and_then(|c| c.cluster.as_ref())
                    .and_then(|c| c.server.clone());

                (
                    named.name.clone(),
                    ContextEntry {
                        selected: self.context.as_deref() == Some(named.name.as_str()),
                        cluster,
                        server,
                        user,
                    },
                )
            })
            .collect()
    }
}
