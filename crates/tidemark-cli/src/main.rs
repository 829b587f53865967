//! Tidemark CLI - render Jinja2 manifest templates and reconcile them with a cluster

use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod error;
mod exit_codes;

use commands::{GlobalArgs, OutputFormat};

#[derive(Parser)]
#[command(name = "tidemark")]
#[command(version)]
#[command(about = "Render Kubernetes manifests from Jinja2 templates and reconcile them with a cluster", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalArgs,

    /// Log filter (e.g. debug, tidemark_kube=trace)
    #[arg(long, global = true, env = "TIDEMARK_LOG", default_value = "warn")]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Render project templates locally
    Render {
        /// Only output objects matching [!]<template>=<regex>
        #[arg(short, long, default_value = "", env = "TIDEMARK_PREDICATE")]
        predicate: String,

        /// Prefix every object with a '# Source: <template>' comment
        #[arg(long, env = "TIDEMARK_SOURCE_HINT")]
        source_hint: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Yaml)]
        output: OutputFormat,
    },

    /// Show the live cluster state of every rendered object
    Get {
        /// Only look up objects matching [!]<template>=<regex>
        #[arg(short, long, default_value = "", env = "TIDEMARK_PREDICATE")]
        predicate: String,

        /// Prefix every object with a '# Source: <template>' comment
        #[arg(long, env = "TIDEMARK_SOURCE_HINT")]
        source_hint: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Yaml)]
        output: OutputFormat,
    },

    /// Apply rendered objects to the cluster
    Apply {
        /// Only apply objects matching [!]<template>=<regex>
        #[arg(short, long, default_value = "", env = "TIDEMARK_PREDICATE")]
        predicate: String,

        /// Send every write as a server-side dry run
        #[arg(long)]
        dry_run: bool,
    },

    /// List kubeconfig contexts
    Contexts,
}

#[tokio::main]
async fn main() {
    miette::set_panic_hook();

    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let result = match cli.command {
        Commands::Render {
            predicate,
            source_hint,
            output,
        } => commands::render::run(&cli.global, &predicate, source_hint, output),
        Commands::Get {
            predicate,
            source_hint,
            output,
        } => commands::get::run(&cli.global, &predicate, source_hint, output).await,
        Commands::Apply { predicate, dry_run } => {
            commands::apply::run(&cli.global, &predicate, dry_run).await
        }
        Commands::Contexts => commands::contexts::run(&cli.global),
    };

    if let Err(err) = result {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

/// Logs go to stderr so rendered output stays clean
fn init_tracing(filter: &str) {
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();
}
