//! Contexts command - list kubeconfig contexts as YAML

use serde_json::{Map, Value as JsonValue};

use super::GlobalArgs;
use crate::error::Result;

pub fn run(global: &GlobalArgs) -> Result<()> {
    let loaded = global.kubeconfig_loader().load()?;

    let mut contexts = Map::new();
    for (name, entry) in loaded.contexts() {
        contexts.insert(name, serde_json::to_value(entry)?);
    }

    print!("{}", serde_yaml::to_string(&JsonValue::Object(contexts))?);
    Ok(())
}
