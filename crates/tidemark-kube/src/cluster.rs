//! Live cluster resolver backed by kube-rs
//!
//! Discovery runs once and fills an explicit [`ResourceTable`]; every object is
//! then routed through that table. Writes are plain create/replace calls so
//! that the `resourceVersion` carried by the target is checked by the server.

use async_trait::async_trait;
use kube::{
    Client,
    api::{Api, DynamicObject, PostParams},
    discovery::{ApiResource, Discovery, Scope},
};
use std::collections::HashMap;
use tidemark_core::{Document, Gvk};

use crate::error::{KubeError, Result};
use crate::resolver::{ApplyResult, ResourceHandle, ResourceResolver};

/// Field manager recorded on writes
const FIELD_MANAGER: &str = "tidemark";

/// One routable resource type
#[derive(Debug, Clone)]
pub struct ResourceEntry {
    pub resource: ApiResource,
    pub namespaced: bool,
}

/// Lookup table from GVK to API resource
#[derive(Debug, Clone, Default)]
pub struct ResourceTable {
    entries: HashMap<Gvk, ResourceEntry>,
}

impl ResourceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every served version of every group, not only the preferred one
    pub fn from_discovery(discovery: &Discovery) -> Self {
        let mut table = Self::new();

        for group in discovery.groups() {
            for version in group.versions() {
                for (resource, capabilities) in group.versioned_resources(version) {
                    table.insert(resource, capabilities.scope == Scope::Namespaced);
                }
            }
        }

        table
    }

    pub fn insert(&mut self, resource: ApiResource, namespaced: bool) {
        let gvk = Gvk::new(&resource.group, &resource.version, &resource.kind);
        self.entries.insert(gvk, ResourceEntry { resource, namespaced });
    }

    pub fn get(&self, gvk: &Gvk) -> Option<&ResourceEntry> {
        self.entries.get(gvk)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Resolver for a real cluster
#[derive(Clone)]
pub struct KubeResolver {
    client: Client,
    table: ResourceTable,
}

impl KubeResolver {
    /// Run API discovery and build the routing table
    pub async fn discover(client: Client) -> Result<Self> {
        let discovery = Discovery::new(client.clone()).run().await?;
        let table = ResourceTable::from_discovery(&discovery);
        tracing::debug!(kinds = table.len(), "api discovery complete");

        Ok(Self { client, table })
    }

    /// Create from an existing client and table (for reuse)
    pub fn with_table(client: Client, table: ResourceTable) -> Self {
        Self { client, table }
    }

    pub fn table(&self) -> &ResourceTable {
        &self.table
    }
}

impl ResourceResolver for KubeResolver {
    fn resolve(&self, gvk: &Gvk) -> Result<Box<dyn ResourceHandle + '_>> {
        let entry = self
            .table
            .get(gvk)
            .ok_or_else(|| KubeError::ResourceResolution {
                api_version: gvk.api_version(),
                kind: gvk.kind.clone(),
            })?;

        Ok(Box::new(KubeHandle {
            client: &self.client,
            entry,
        }))
    }
}

struct KubeHandle<'a> {
    client: &'a Client,
    entry: &'a ResourceEntry,
}

impl KubeHandle<'_> {
    /// Namespaced kinds without a namespace use the client's default one
    fn api(&self, namespace: Option<&str>) -> Api<DynamicObject> {
        let client = self.client.clone();
        let resource = &self.entry.resource;

        match (self.entry.namespaced, namespace) {
            (true, Some(ns)) => Api::namespaced_with(client, ns, resource),
            (true, None) => Api::default_namespaced_with(client, resource),
            (false, _) => Api::all_with(client, resource),
        }
    }
}

#[async_trait]
impl ResourceHandle for KubeHandle<'_> {
    async fn get(&self, namespace: Option<&str>, name: &str) -> Result<Option<Document>> {
        let live = self.api(namespace).get_opt(name).await?;
        live.map(to_document).transpose()
    }

    async fn apply(&self, object: &Document, dry_run: bool) -> Result<ApplyResult> {
        let mut reference = object
            .reference()
            .ok_or_else(|| KubeError::InvalidManifest("object has no metadata.name".to_string()))?;

        if self.entry.namespaced && reference.namespace.is_none() {
            reference.namespace = Some(self.client.default_namespace().to_string());
        }

        let dynamic: DynamicObject = serde_json::from_value(object.inner().clone())?;
        let api = self.api(reference.namespace.as_deref());
        let params = PostParams {
            dry_run,
            field_manager: Some(FIELD_MANAGER.to_string()),
        };

        // A resourceVersion is only present when the live object was read
        let created = object.get_str(&["metadata", "resourceVersion"]).is_none();
        let written = if created {
            api.create(&params, &dynamic).await
        } else {
            api.replace(&reference.name, &params, &dynamic).await
        };

        let written = written.map_err(|e| KubeError::Apply {
            reference: reference.to_string(),
            message: e.to_string(),
        })?;

        Ok(ApplyResult {
            reference,
            created,
            object: to_document(written)?,
        })
    }
}

fn to_document(object: DynamicObject) -> Result<Document> {
    Ok(Document::from(serde_json::to_value(object)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::core::GroupVersionKind;

    fn api_resource(group: &str, version: &str, kind: &str) -> ApiResource {
        ApiResource::from_gvk(&GroupVersionKind::gvk(group, version, kind))
    }

    #[test]
    fn test_table_routes_by_full_gvk() {
        let mut table = ResourceTable::new();
        table.insert(api_resource("", "v1", "Service"), true);
        table.insert(api_resource("apps", "v1", "Deployment"), true);
        table.insert(api_resource("", "v1", "Namespace"), false);

        assert_eq!(table.len(), 3);
        assert!(table.get(&Gvk::new("", "v1", "Service")).is_some());
        assert!(!table.get(&Gvk::new("", "v1", "Namespace")).unwrap().namespaced);
        assert!(table.get(&Gvk::new("apps", "v2", "Deployment")).is_none());
        assert!(table.get(&Gvk::new("extensions", "v1", "Deployment")).is_none());
    }

    #[test]
    fn test_to_document_keeps_fields() {
        let dynamic: DynamicObject = serde_json::from_value(serde_json::json!({
            "apiVersion": "v1",
            "kind": "ConfigMap",
            "metadata": {"name": "cfg", "resourceVersion": "12"},
            "data": {"a": "b"}
        }))
        .unwrap();

        let document = to_document(dynamic).unwrap();
        assert_eq!(document.name(), Some("cfg"));
        assert_eq!(document.get_str(&["metadata", "resourceVersion"]), Some("12"));
        assert_eq!(document.get_str(&["data", "a"]), Some("b"));
    }
}
