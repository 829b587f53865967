//! Reconciliation driver
//!
//! For every dispatched object, strictly in order:
//! predicate, resolve, fetch live object, fixups, apply.
//! The first failure ends the run; objects applied before it stay applied.

use std::fmt;
use tidemark_core::{Document, Gvk, ObjectReference, RenderedManifest};
use tidemark_engine::Predicate;

use crate::dispatch::ObjectDispatcher;
use crate::error::{KubeError, Result};
use crate::fixups::FixupRegistry;
use crate::resolver::ResourceResolver;

/// Terminal state of one object in an apply run
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Applied {
        source: String,
        reference: ObjectReference,
        created: bool,
    },
    /// Rejected by the predicate
    Skipped { source: String, gvk: Gvk, name: Option<String> },
}

impl Outcome {
    pub fn source(&self) -> &str {
        match self {
            Outcome::Applied { source, .. } | Outcome::Skipped { source, .. } => source,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Applied { reference, created: true, .. } => write!(f, "{} created", reference),
            Outcome::Applied { reference, .. } => write!(f, "{} configured", reference),
            Outcome::Skipped { gvk, name, .. } => {
                write!(f, "{}/{} skipped", gvk.kind, name.as_deref().unwrap_or("unnamed"))
            }
        }
    }
}

/// Live counterpart of one object in a get run
#[derive(Debug, Clone, PartialEq)]
pub enum LiveObject {
    Found {
        source: String,
        reference: ObjectReference,
        object: Document,
    },
    Missing {
        source: String,
        reference: ObjectReference,
    },
}

/// Summary of a run
#[derive(Debug, Clone, Default)]
pub struct ReconcileSummary {
    /// Applied or found objects
    pub processed: Vec<String>,
    /// Objects that were looked up but do not exist
    pub missing: Vec<String>,
    /// Objects rejected by the predicate
    pub skipped: Vec<String>,
    /// How many of the processed objects were created
    pub created: usize,
}

impl ReconcileSummary {
    /// Get total count
    pub fn total(&self) -> usize {
        self.processed.len() + self.missing.len() + self.skipped.len()
    }

    fn record(&mut self, outcome: &Outcome) {
        match outcome {
            Outcome::Applied { created, .. } => {
                if *created {
                    self.created += 1;
                }
                self.processed.push(outcome.to_string());
            }
            Outcome::Skipped { .. } => self.skipped.push(outcome.to_string()),
        }
    }

    /// Format as human-readable summary
    pub fn summary(&self) -> String {
        let mut parts = Vec::with_capacity(3);
        if !self.processed.is_empty() {
            if self.created > 0 {
                parts.push(format!("{} processed ({} created)", self.processed.len(), self.created));
            } else {
                parts.push(format!("{} processed", self.processed.len()));
            }
        }
        if !self.missing.is_empty() {
            parts.push(format!("{} missing", self.missing.len()));
        }
        if !self.skipped.is_empty() {
            parts.push(format!("{} skipped", self.skipped.len()));
        }
        if parts.is_empty() {
            "No resources processed".to_string()
        } else {
            parts.join(", ")
        }
    }
}

/// Drives objects from a manifest stream to the cluster
pub struct Reconciler<'a> {
    resolver: &'a dyn ResourceResolver,
    fixups: &'a FixupRegistry,
    predicate: &'a Predicate,
    dry_run: bool,
}

impl<'a> Reconciler<'a> {
    pub fn new(
        resolver: &'a dyn ResourceResolver,
        fixups: &'a FixupRegistry,
        predicate: &'a Predicate,
    ) -> Self {
        Self {
            resolver,
            fixups,
            predicate,
            dry_run: false,
        }
    }

    /// Send writes with the server-side dry-run flag
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Reconcile every object of `manifests`, reporting each outcome in order
    pub async fn apply<I, E, F>(&self, manifests: I, mut on_outcome: F) -> Result<ReconcileSummary>
    where
        I: IntoIterator<Item = std::result::Result<RenderedManifest, E>>,
        KubeError: From<E>,
        F: FnMut(&Outcome),
    {
        let mut summary = ReconcileSummary::default();

        for object in ObjectDispatcher::new(manifests.into_iter()) {
            let object = object?;
            let outcome = self.reconcile_object(&object.source, object.document).await?;
            summary.record(&outcome);
            on_outcome(&outcome);
        }

        tracing::info!(summary = %summary.summary(), dry_run = self.dry_run, "apply finished");
        Ok(summary)
    }

    /// Fetch the live counterpart of every matching object, in order
    pub async fn get<I, E, F>(&self, manifests: I, mut on_live: F) -> Result<ReconcileSummary>
    where
        I: IntoIterator<Item = std::result::Result<RenderedManifest, E>>,
        KubeError: From<E>,
        F: FnMut(&LiveObject),
    {
        let mut summary = ReconcileSummary::default();

        for object in ObjectDispatcher::new(manifests.into_iter()) {
            let object = object?;
            let gvk = Some(object.gvk.clone());
            let live = self
                .lookup(&object.source, &object.document)
                .await
                .map_err(|e| e.for_object(&object.source, gvk))?;

            match live {
                Some(LiveObject::Found { ref reference, .. }) => {
                    summary.processed.push(reference.to_string())
                }
                Some(LiveObject::Missing { ref reference, .. }) => {
                    summary.missing.push(reference.to_string())
                }
                None => summary.skipped.push(object.gvk.to_string()),
            }

            if let Some(live) = &live {
                on_live(live);
            }
        }

        Ok(summary)
    }

    /// Run one object through predicate, fixups and apply.
    ///
    /// Errors carry the object's source and GVK.
    pub async fn reconcile_object(&self, source: &str, target: Document) -> Result<Outcome> {
        let gvk = target.gvk();
        self.reconcile(source, target)
            .await
            .map_err(|e| e.for_object(source, gvk))
    }

    async fn reconcile(&self, source: &str, mut target: Document) -> Result<Outcome> {
        if !self.accepts(&target)? {
            return Ok(Outcome::Skipped {
                source: source.to_string(),
                gvk: gvk_of(&target)?,
                name: target.name().map(str::to_string),
            });
        }

        let reference = reference_of(&target)?;
        let handle = self.resolver.resolve(&reference.gvk)?;
        let live = handle
            .get(reference.namespace.as_deref(), &reference.name)
            .await?;

        if live.is_none() {
            tracing::debug!(object = %reference, "no live object");
        }

        self.fixups.apply_all(live.as_ref(), &mut target)?;

        let result = handle.apply(&target, self.dry_run).await?;
        tracing::info!(
            object = %result.reference,
            created = result.created,
            dry_run = self.dry_run,
            "applied"
        );

        Ok(Outcome::Applied {
            source: source.to_string(),
            reference: result.reference,
            created: result.created,
        })
    }

    /// `None` when the predicate rejects the object
    async fn lookup(&self, source: &str, document: &Document) -> Result<Option<LiveObject>> {
        if !self.accepts(document)? {
            return Ok(None);
        }

        let reference = reference_of(document)?;
        let handle = self.resolver.resolve(&reference.gvk)?;
        let live = handle
            .get(reference.namespace.as_deref(), &reference.name)
            .await?;

        let source = source.to_string();
        Ok(Some(match live {
            Some(object) => LiveObject::Found {
                source,
                reference,
                object,
            },
            None => LiveObject::Missing { source, reference },
        }))
    }

    fn accepts(&self, document: &Document) -> Result<bool> {
        let accepted = self.predicate.matches(document)?;
        if !accepted {
            tracing::debug!(
                kind = document.kind().unwrap_or_default(),
                name = document.name().unwrap_or_default(),
                predicate = %self.predicate,
                "rejected by predicate"
            );
        }
        Ok(accepted)
    }
}

fn gvk_of(document: &Document) -> Result<Gvk> {
    document
        .gvk()
        .ok_or_else(|| KubeError::InvalidManifest("object has no apiVersion or kind".to_string()))
}

fn reference_of(document: &Document) -> Result<ObjectReference> {
    document
        .reference()
        .ok_or_else(|| KubeError::InvalidManifest("object has no metadata.name".to_string()))
}
