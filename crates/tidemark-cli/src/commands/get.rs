//! Get command - show the live counterpart of every rendered object

use console::style;
use tidemark_kube::{FixupRegistry, LiveObject, Reconciler};

use super::{GlobalArgs, ObjectWriter, OutputFormat, connect, parse_predicate, prepare};
use crate::error::Result;

pub async fn run(
    global: &GlobalArgs,
    predicate: &str,
    source_hint: bool,
    output: OutputFormat,
) -> Result<()> {
    let predicate = parse_predicate(predicate)?;
    let (resolver, kubeconfig) = connect(global).await?;
    let prepared = prepare(global, kubeconfig.context_name())?;

    let manifests = prepared
        .engine
        .render_project(&prepared.project, &prepared.context)?;

    // Fixups only matter for writes
    let fixups = FixupRegistry::new();
    let reconciler = Reconciler::new(&resolver, &fixups, &predicate);

    let mut writer = ObjectWriter::new(std::io::stdout().lock(), output, source_hint);
    let mut failure = None;
    let summary = reconciler
        .get(manifests, |live| match live {
            LiveObject::Found { source, object, .. } => {
                if let Err(e) = writer.write(source, object.inner()) {
                    failure.get_or_insert(e);
                }
            }
            LiveObject::Missing { source, reference } => {
                eprintln!(
                    "{} {} not found (from {})",
                    style("!").yellow().bold(),
                    reference,
                    style(source).dim()
                );
            }
        })
        .await?;

    if let Some(e) = failure {
        return Err(e);
    }
    writer.finish()?;

    tracing::info!(summary = %summary.summary(), "get finished");
    Ok(())
}
