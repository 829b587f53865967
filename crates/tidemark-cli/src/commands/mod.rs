//! CLI commands

pub mod apply;
pub mod contexts;
pub mod get;
pub mod render;

use clap::{Args, ValueEnum};
use serde_json::Value as JsonValue;
use std::io::Write;
use std::path::PathBuf;
use tidemark_core::{LoadedProject, RenderContext, Values, parse_set_values};
use tidemark_engine::{Engine, Predicate};
use tidemark_kube::{KubeResolver, KubeconfigLoader, LoadedKubeconfig};

use crate::error::{CliError, Result};

/// Flags shared by every command
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Project directory holding tidemark.yaml
    #[arg(short = 'd', long = "project", global = true, default_value = ".", env = "TIDEMARK_PROJECT")]
    pub project: PathBuf,

    /// Values file(s) to merge over the project values
    #[arg(short = 'f', long = "values", global = true)]
    pub values: Vec<PathBuf>,

    /// Set values on command line (key=value)
    #[arg(long = "set", global = true)]
    pub set: Vec<String>,

    /// Kubeconfig file (default: ~/.kube/config)
    #[arg(long, global = true, env = "TIDEMARK_KUBECONFIG")]
    pub kubeconfig: Option<PathBuf>,

    /// Kubeconfig context to use instead of current-context
    #[arg(short = 'c', long, global = true, env = "TIDEMARK_CONTEXT")]
    pub context: Option<String>,
}

/// Output format for rendered and live objects
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Yaml,
    Json,
}

impl OutputFormat {
    /// Serialize one object, newline terminated
    pub fn format(&self, object: &JsonValue) -> Result<String> {
        match self {
            OutputFormat::Yaml => Ok(serde_yaml::to_string(object)?),
            OutputFormat::Json => Ok(format!("{}\n", serde_json::to_string_pretty(object)?)),
        }
    }

    /// Text written between two objects
    pub fn separator(&self) -> &'static str {
        match self {
            OutputFormat::Yaml => "---\n",
            OutputFormat::Json => "",
        }
    }
}

/// Writes objects as one stream: separators between them, optional source hints
pub struct ObjectWriter<W: Write> {
    out: W,
    format: OutputFormat,
    source_hint: bool,
    first: bool,
}

impl<W: Write> ObjectWriter<W> {
    pub fn new(out: W, format: OutputFormat, source_hint: bool) -> Self {
        Self {
            out,
            format,
            source_hint,
            first: true,
        }
    }

    pub fn write(&mut self, source: &str, object: &JsonValue) -> Result<()> {
        let text = self.format.format(object)?;

        if !self.first {
            self.out.write_all(self.format.separator().as_bytes())?;
        }
        self.first = false;

        if self.source_hint {
            writeln!(self.out, "# Source: {source}")?;
        }
        self.out.write_all(text.as_bytes())?;
        Ok(())
    }

    pub fn finish(mut self) -> Result<W> {
        self.out.flush()?;
        Ok(self.out)
    }
}

impl GlobalArgs {
    pub fn kubeconfig_loader(&self) -> KubeconfigLoader {
        KubeconfigLoader::new(self.kubeconfig.clone(), self.context.clone())
    }
}

/// A project ready to render
pub struct Prepared {
    pub engine: Engine,
    pub project: LoadedProject,
    pub context: RenderContext,
}

/// Load the project and build its render context for `context_name`.
///
/// Values are layered as: project values, matching conditional values,
/// `-f` files in order, then `--set`.
pub fn prepare(global: &GlobalArgs, context_name: &str) -> Result<Prepared> {
    let project = LoadedProject::load(&global.project)?;
    tracing::debug!(
        artifact = %project.project.artifact_id,
        root = %project.root.display(),
        "loaded project"
    );

    let mut overlays = Vec::with_capacity(global.values.len() + 1);
    for file in &global.values {
        let values = Values::from_file(file).map_err(|e| CliError::Project {
            message: format!("cannot load values file {}: {e}", file.display()),
            help: None,
        })?;
        overlays.push(values);
    }

    if !global.set.is_empty() {
        let values = parse_set_values(&global.set).map_err(|e| CliError::Project {
            message: format!("invalid --set value: {e}"),
            help: Some("use key=value, with dots for nesting: --set image.tag=v2".to_string()),
        })?;
        overlays.push(values);
    }

    let engine = Engine::builder().build();
    let context = engine.build_context(&project, context_name, &overlays)?;

    Ok(Prepared {
        engine,
        project,
        context,
    })
}

pub fn parse_predicate(text: &str) -> Result<Predicate> {
    Ok(Predicate::parse(text)?)
}

/// Connect to the cluster and discover its resources
pub async fn connect(global: &GlobalArgs) -> Result<(KubeResolver, LoadedKubeconfig)> {
    let (client, kubeconfig) = global.kubeconfig_loader().client().await?;
    tracing::info!(context = kubeconfig.context_name(), "connected");

    let resolver = KubeResolver::discover(client).await?;
    tracing::debug!(kinds = resolver.table().len(), "discovered resources");

    Ok((resolver, kubeconfig))
}
