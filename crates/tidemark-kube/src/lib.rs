//! Tidemark Kube - reconciling rendered manifests with a cluster
//!
//! This crate provides:
//! - **Object dispatch**: rendered manifest streams to identified objects
//! - **Fixups**: ordered corrections that keep server-managed fields on update
//! - **Resolution**: GVK routing to cluster handles (kube-rs or in-memory)
//! - **Reconciliation**: predicate, fetch, fixups, apply; fail-fast and in order
//! - **Kubeconfig**: `KUBE_CONFIG` / `--kubeconfig` / `~/.kube/config` loading

pub mod cluster;
pub mod dispatch;
pub mod error;
pub mod fixups;
pub mod kubeconfig;
pub mod mock;
pub mod reconcile;
pub mod resolver;

pub use cluster::{KubeResolver, ResourceEntry, ResourceTable};
pub use dispatch::{DispatchedObject, ObjectDispatcher, dispatch, from_manifests, split_documents};
pub use error::{KubeError, Result};
pub use fixups::{Fixup, FixupRegistry, ResourceVersion, ServiceClusterIp, default_fixups};
pub use kubeconfig::{ContextEntry, KUBE_CONFIG_ENV, KubeconfigLoader, LoadedKubeconfig};
pub use mock::{MockCluster, OperationCounts};
pub use reconcile::{LiveObject, Outcome, ReconcileSummary, Reconciler};
pub use resolver::{ApplyResult, ResourceHandle, ResourceResolver};
