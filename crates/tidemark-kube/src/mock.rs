//! In-memory cluster for testing
//!
//! Behaves like an API server for the parts the reconciler relies on: kinds
//! must be registered before objects of that kind can be read or written,
//! every write bumps `metadata.resourceVersion`, and a write carrying a stale
//! `resourceVersion` is rejected.

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tidemark_core::{Document, Gvk, ObjectReference};

use crate::error::{KubeError, Result};
use crate::resolver::{ApplyResult, ResourceHandle, ResourceResolver};

/// Namespace used for namespaced objects that do not set one
pub const DEFAULT_NAMESPACE: &str = "default";

/// In-memory resolver and object store
#[derive(Clone, Default)]
pub struct MockCluster {
    state: Arc<RwLock<MockState>>,
}

#[derive(Default)]
struct MockState {
    /// Served kinds: GVK -> namespaced
    kinds: HashMap<Gvk, bool>,
    objects: HashMap<ObjectReference, Document>,
    rejections: HashMap<ObjectReference, String>,
    /// Every payload passed to apply, in call order
    applied: Vec<Document>,
    last_version: u64,
    counts: OperationCounts,
}

/// Counts of operations performed for testing assertions
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct OperationCounts {
    pub resolves: usize,
    pub gets: usize,
    pub applies: usize,
}

impl MockCluster {
    /// Create a new cluster that serves no kinds
    pub fn new() -> Self {
        Self::default()
    }

    /// Cluster serving the usual built-in kinds
    pub fn with_builtin_kinds() -> Self {
        Self::new()
            .with_kind(Gvk::new("", "v1", "Service"), true)
            .with_kind(Gvk::new("", "v1", "ConfigMap"), true)
            .with_kind(Gvk::new("", "v1", "Secret"), true)
            .with_kind(Gvk::new("", "v1", "Namespace"), false)
            .with_kind(Gvk::new("apps", "v1", "Deployment"), true)
    }

    pub fn with_kind(self, gvk: Gvk, namespaced: bool) -> Self {
        self.write().kinds.insert(gvk, namespaced);
        self
    }

    /// Store a live object as-is, assigning a resourceVersion if it has none
    pub fn insert(&self, document: Document) -> Result<ObjectReference> {
        let mut state = self.write();
        let reference = state.normalize(&document)?;
        let mut document = document;

        if document.get_str(&["metadata", "resourceVersion"]).is_none() {
            let version = state.next_version();
            document.set_path(&["metadata", "resourceVersion"], JsonValue::String(version))?;
        }

        state.objects.insert(reference.clone(), document);
        Ok(reference)
    }

    /// Make every apply of `reference` fail with `message`
    pub fn reject_apply(&self, reference: ObjectReference, message: impl Into<String>) {
        self.write().rejections.insert(reference, message.into());
    }

    /// Live object, if stored
    pub fn object(&self, gvk: &Gvk, namespace: Option<&str>, name: &str) -> Option<Document> {
        let state = self.read();
        let reference = state.reference(gvk, namespace, name);
        state.objects.get(&reference).cloned()
    }

    pub fn object_count(&self) -> usize {
        self.read().objects.len()
    }

    /// Payloads passed to apply, in call order
    pub fn applied(&self) -> Vec<Document> {
        self.read().applied.clone()
    }

    /// Get operation counts for assertions
    pub fn operation_counts(&self) -> OperationCounts {
        self.read().counts.clone()
    }

    /// Reset operation counts
    pub fn reset_counts(&self) {
        self.write().counts = OperationCounts::default();
    }

    fn read(&self) -> RwLockReadGuard<'_, MockState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, MockState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl MockState {
    fn next_version(&mut self) -> String {
        self.last_version += 1;
        self.last_version.to_string()
    }

    fn namespaced(&self, gvk: &Gvk) -> Result<bool> {
        self.kinds
            .get(gvk)
            .copied()
            .ok_or_else(|| KubeError::ResourceResolution {
                api_version: gvk.api_version(),
                kind: gvk.kind.clone(),
            })
    }

    /// Address used for storage: default namespace filled in, cluster-scoped
    /// objects stripped of theirs
    fn reference(&self, gvk: &Gvk, namespace: Option<&str>, name: &str) -> ObjectReference {
        let namespace = match self.kinds.get(gvk) {
            Some(true) => Some(namespace.unwrap_or(DEFAULT_NAMESPACE).to_string()),
            _ => None,
        };

        ObjectReference {
            gvk: gvk.clone(),
            namespace,
            name: name.to_string(),
        }
    }

    fn normalize(&self, document: &Document) -> Result<ObjectReference> {
        let reference = document
            .reference()
            .ok_or_else(|| KubeError::InvalidManifest("object has no metadata.name".to_string()))?;
        self.namespaced(&reference.gvk)?;
        Ok(self.reference(&reference.gvk, reference.namespace.as_deref(), &reference.name))
    }
}

impl ResourceResolver for MockCluster {
    fn resolve(&self, gvk: &Gvk) -> Result<Box<dyn ResourceHandle + '_>> {
        let mut state = self.write();
        state.counts.resolves += 1;
        state.namespaced(gvk)?;

        Ok(Box::new(MockHandle {
            cluster: self,
            gvk: gvk.clone(),
        }))
    }
}

struct MockHandle<'a> {
    cluster: &'a MockCluster,
    gvk: Gvk,
}

#[async_trait]
impl ResourceHandle for MockHandle<'_> {
    async fn get(&self, namespace: Option<&str>, name: &str) -> Result<Option<Document>> {
        let mut state = self.cluster.write();
        state.counts.gets += 1;

        let reference = state.reference(&self.gvk, namespace, name);
        Ok(state.objects.get(&reference).cloned())
    }

    async fn apply(&self, object: &Document, dry_run: bool) -> Result<ApplyResult> {
        let mut state = self.cluster.write();
        state.counts.applies += 1;
        state.applied.push(object.clone());

        let reference = state.normalize(object)?;
        let apply_error = |message: String| KubeError::Apply {
            reference: reference.to_string(),
            message,
        };

        if let Some(message) = state.rejections.get(&reference) {
            return Err(apply_error(message.clone()));
        }

        let existing = state
            .objects
            .get(&reference)
            .and_then(|live| live.get_str(&["metadata", "resourceVersion"]))
            .map(str::to_string);
        let requested = object.get_str(&["metadata", "resourceVersion"]);

        let created = match (existing.as_deref(), requested) {
            (None, None) => true,
            (Some(_), None) => {
                return Err(apply_error("object already exists".to_string()));
            }
            (None, Some(_)) => {
                return Err(apply_error("object not found".to_string()));
            }
            (Some(live), Some(requested)) if live != requested => {
                return Err(apply_error(format!(
                    "conflict: resourceVersion {requested} is stale, live is {live}"
                )));
            }
            (Some(_), Some(_)) => false,
        };

        let mut stored = object.clone();
        if let Some(namespace) = &reference.namespace {
            stored.set_path(&["metadata", "namespace"], JsonValue::String(namespace.clone()))?;
        }
        let version = state.next_version();
        stored.set_path(&["metadata", "resourceVersion"], JsonValue::String(version))?;

        if !dry_run {
            state.objects.insert(reference.clone(), stored.clone());
        }

        Ok(ApplyResult {
            reference,
            created,
            object: stored,
        })
    }
}
