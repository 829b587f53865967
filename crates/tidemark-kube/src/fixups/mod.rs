//! Fixups: corrections applied to a rendered object before it is written
//!
//! A fixup copies server-managed fields from the live object ("original") into
//! the rendered one ("target") so that an update does not clobber them. The
//! registry runs fixups in registration order; each one sees what the previous
//! ones wrote. A fixup only runs when original and target share the same GVK.

mod resource_version;
mod service_cluster_ip;

pub use resource_version::ResourceVersion;
pub use service_cluster_ip::ServiceClusterIp;

use tidemark_core::{CoreError, Document, Gvk};

use crate::error::{KubeError, Result};

/// A named correction rule
pub trait Fixup: Send + Sync {
    /// Stable name, used in errors and logs
    fn name(&self) -> &'static str;

    /// Whether the fixup concerns objects of this kind
    fn applies_to(&self, _gvk: &Gvk) -> bool {
        true
    }

    /// Patch `target` using `original` as reference.
    ///
    /// Reads that miss or find an unexpected type must be no-ops. Writes go
    /// through [`Document::set_path`] so type conflicts surface as errors.
    fn apply(&self, original: &Document, target: &mut Document) -> tidemark_core::Result<()>;
}

/// The baseline corrections, in the order they run
pub fn default_fixups() -> Vec<Box<dyn Fixup>> {
    vec![Box::new(ResourceVersion), Box::new(ServiceClusterIp)]
}

/// Ordered collection of fixups. Built once, then only read.
#[derive(Default)]
pub struct FixupRegistry {
    fixups: Vec<Box<dyn Fixup>>,
}

impl FixupRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding [`default_fixups`]
    pub fn with_defaults() -> Self {
        Self {
            fixups: default_fixups(),
        }
    }

    /// Append a fixup; it runs after every fixup registered before it
    pub fn register(&mut self, fixup: impl Fixup + 'static) -> &mut Self {
        self.fixups.push(Box::new(fixup));
        self
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.fixups.iter().map(|f| f.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.fixups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fixups.is_empty()
    }

    /// Run every applicable fixup against `target`, stopping at the first error.
    ///
    /// `original` is `None` when the live object does not exist; every fixup is
    /// then skipped. Mutations made before a failure are kept.
    pub fn apply_all(&self, original: Option<&Document>, target: &mut Document) -> Result<()> {
        let Some(original) = original else {
            tracing::debug!("no live object, fixups skipped");
            return Ok(());
        };

        for fixup in &self.fixups {
            let gvk = match (original.gvk(), target.gvk()) {
                (Some(live), Some(rendered)) if live == rendered => live,
                _ => {
                    tracing::debug!(fixup = fixup.name(), "kind differs from live object, skipped");
                    continue;
                }
            };

            if !fixup.applies_to(&gvk) {
                continue;
            }

            fixup.apply(original, target).map_err(|e| match e {
                CoreError::TypeConflict { path, found } => KubeError::FixupTypeConflict {
                    fixup: fixup.name().to_string(),
                    path,
                    found,
                },
                other => KubeError::InvalidManifest(format!("fixup '{}': {}", fixup.name(), other)),
            })?;

            tracing::debug!(fixup = fixup.name(), %gvk, "fixup applied");
        }

        Ok(())
    }
}

impl std::fmt::Debug for FixupRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
