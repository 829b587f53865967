//! Apply command - reconcile rendered objects with the cluster

use console::style;
use tidemark_kube::{FixupRegistry, Outcome, Reconciler};

use super::{GlobalArgs, connect, parse_predicate, prepare};
use crate::error::Result;

pub async fn run(global: &GlobalArgs, predicate: &str, dry_run: bool) -> Result<()> {
    let predicate = parse_predicate(predicate)?;
    let (resolver, kubeconfig) = connect(global).await?;
    let prepared = prepare(global, kubeconfig.context_name())?;

    let manifests = prepared
        .engine
        .render_project(&prepared.project, &prepared.context)?;

    println!(
        "{} Applying {} to context {}{}",
        style("→").blue().bold(),
        style(&prepared.project.project.artifact_id).cyan(),
        style(kubeconfig.context_name()).yellow(),
        if dry_run { " (dry run)" } else { "" }
    );

    let fixups = FixupRegistry::with_defaults();
    let reconciler = Reconciler::new(&resolver, &fixups, &predicate).dry_run(dry_run);

    let summary = reconciler.apply(manifests, print_outcome).await?;

    println!();
    println!("{} {}", style("✓").green().bold(), summary.summary());
    Ok(())
}

fn print_outcome(outcome: &Outcome) {
    match outcome {
        Outcome::Applied { created: true, .. } => {
            println!("  {} {}", style("+").green(), outcome)
        }
        Outcome::Applied { .. } => println!("  {} {}", style("~").yellow(), outcome),
        Outcome::Skipped { .. } => println!("  {} {}", style("-").dim(), style(outcome).dim()),
    }
}
