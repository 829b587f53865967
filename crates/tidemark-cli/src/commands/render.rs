//! Render command - render project templates locally

use tidemark_kube::dispatch;

use super::{GlobalArgs, ObjectWriter, OutputFormat, parse_predicate, prepare};
use crate::error::Result;

pub fn run(
    global: &GlobalArgs,
    predicate: &str,
    source_hint: bool,
    output: OutputFormat,
) -> Result<()> {
    let predicate = parse_predicate(predicate)?;
    let context_name = local_context(global);
    let prepared = prepare(global, &context_name)?;

    let manifests = prepared
        .engine
        .render_project(&prepared.project, &prepared.context)?;

    let mut writer = ObjectWriter::new(std::io::stdout().lock(), output, source_hint);

    dispatch(manifests, |source, document| -> Result<()> {
        if !predicate.matches(&document)? {
            tracing::debug!(source, name = document.name().unwrap_or_default(), "skipped");
            return Ok(());
        }
        writer.write(source, document.inner())
    })?;

    writer.finish()?;
    Ok(())
}

/// Context name for templates, without requiring a kubeconfig
fn local_context(global: &GlobalArgs) -> String {
    if let Some(context) = global.context.as_deref().filter(|c| !c.is_empty()) {
        return context.to_string();
    }

    match global.kubeconfig_loader().load() {
        Ok(loaded) => loaded.context_name().to_string(),
        Err(e) => {
            tracing::debug!(error = %e, "no kubeconfig, rendering without a context");
            String::new()
        }
    }
}
