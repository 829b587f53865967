//! Boundary toward the cluster: GVK routing and per-kind handles

use async_trait::async_trait;
use tidemark_core::{Document, Gvk, ObjectReference};

use crate::error::Result;

/// Maps a GVK to a handle that can read and write objects of that kind
pub trait ResourceResolver: Send + Sync {
    /// Fails with [`KubeError::ResourceResolution`](crate::KubeError::ResourceResolution)
    /// for kinds the cluster does not serve.
    fn resolve(&self, gvk: &Gvk) -> Result<Box<dyn ResourceHandle + '_>>;
}

/// Operations on one resource type
#[async_trait]
pub trait ResourceHandle: Send + Sync {
    /// Fetch a live object. `Ok(None)` means it does not exist.
    async fn get(&self, namespace: Option<&str>, name: &str) -> Result<Option<Document>>;

    /// Create or update `object`. With `dry_run` nothing is persisted.
    async fn apply(&self, object: &Document, dry_run: bool) -> Result<ApplyResult>;
}

/// Result of applying a single object
#[derive(Debug, Clone)]
pub struct ApplyResult {
    pub reference: ObjectReference,
    /// Whether it was created (true) or updated (false)
    pub created: bool,
    /// The object as returned by the cluster
    pub object: Document,
}
