//! Keep the cluster-assigned address of a `v1` Service

use serde_json::Value as JsonValue;
use tidemark_core::{Document, Gvk};

use super::Fixup;

const PATH: [&str; 2] = ["spec", "clusterIP"];

/// Marks a headless service; not an assigned address
const HEADLESS: &str = "None";

/// `spec.clusterIP` is assigned by the API server and immutable afterwards.
/// A rendered manifest usually omits it or carries a placeholder, so the live
/// value is written back before the update.
#[derive(Debug, Clone, Copy, Default)]
pub struct ServiceClusterIp;

impl Fixup for ServiceClusterIp {
    fn name(&self) -> &'static str {
        "service-cluster-ip"
    }

    fn applies_to(&self, gvk: &Gvk) -> bool {
        gvk.group.is_empty() && gvk.version == "v1" && gvk.kind == "Service"
    }

    fn apply(&self, original: &Document, target: &mut Document) -> tidemark_core::Result<()> {
        match original.get_str(&PATH) {
            Some(address) if !address.is_empty() && !address.eq_ignore_ascii_case(HEADLESS) => {
                target.set_path(&PATH, JsonValue::String(address.to_string()))
            }
            _ => Ok(()),
        }
    }
}
