//! Generic manifest documents and resource identity
//!
//! A [`Document`] is one parsed manifest (or live cluster object) held as an
//! ordered JSON tree. Fields are reached through [`Document::get_path`] and
//! written through [`Document::set_path`], which never overwrites a non-mapping
//! intermediate node.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::fmt;

use crate::error::{CoreError, Result};

/// A manifest object: mapping / sequence / string / number / bool / null
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document(pub JsonValue);

impl Document {
    /// Create an empty mapping document
    pub fn new() -> Self {
        Self(JsonValue::Object(Map::new()))
    }

    /// Parse a single YAML document
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let value: JsonValue = serde_yaml::from_str(yaml)?;
        Ok(Self(value))
    }

    /// Get the inner JSON value
    pub fn inner(&self) -> &JsonValue {
        &self.0
    }

    /// Convert to JSON value
    pub fn into_inner(self) -> JsonValue {
        self.0
    }

    /// True for `null` and for an empty mapping
    pub fn is_empty(&self) -> bool {
        match &self.0 {
            JsonValue::Object(map) => map.is_empty(),
            JsonValue::Null => true,
            _ => false,
        }
    }

    pub fn api_version(&self) -> Option<&str> {
        self.get_str(&["apiVersion"])
    }

    pub fn kind(&self) -> Option<&str> {
        self.get_str(&["kind"])
    }

    pub fn name(&self) -> Option<&str> {
        self.get_str(&["metadata", "name"])
    }

    pub fn namespace(&self) -> Option<&str> {
        self.get_str(&["metadata", "namespace"])
    }

    /// Group-Version-Kind, if both `apiVersion` and `kind` are strings
    pub fn gvk(&self) -> Option<Gvk> {
        Some(Gvk::from_api_version(self.api_version()?, self.kind()?))
    }

    /// Addressable identity of this object, if it carries a name
    pub fn reference(&self) -> Option<ObjectReference> {
        Some(ObjectReference {
            gvk: self.gvk()?,
            namespace: self.namespace().map(str::to_string),
            name: self.name()?.to_string(),
        })
    }

    /// Look up a value by path. Only mappings are traversed.
    pub fn get_path(&self, path: &[&str]) -> Option<&JsonValue> {
        path.iter()
            .try_fold(&self.0, |current, key| current.as_object()?.get(*key))
    }

    /// Look up a string value by path
    pub fn get_str(&self, path: &[&str]) -> Option<&str> {
        self.get_path(path).and_then(JsonValue::as_str)
    }

    /// Write a value at `path`, creating missing intermediate mappings.
    ///
    /// An intermediate node that exists but is not a mapping is left untouched
    /// and reported as [`CoreError::TypeConflict`]. An explicit `null` counts as
    /// absent.
    pub fn set_path(&mut self, path: &[&str], value: JsonValue) -> Result<()> {
        let Some((last, parents)) = path.split_last() else {
            self.0 = value;
            return Ok(());
        };

        let mut current = &mut self.0;
        let mut walked: Vec<&str> = Vec::with_capacity(parents.len());

        for key in parents {
            let map = mapping_mut(current, &walked)?;
            walked.push(*key);
            current = map
                .entry(key.to_string())
                .or_insert_with(|| JsonValue::Object(Map::new()));
        }

        mapping_mut(current, &walked)?.insert(last.to_string(), value);
        Ok(())
    }
}

impl From<JsonValue> for Document {
    fn from(value: JsonValue) -> Self {
        Self(value)
    }
}

fn mapping_mut<'a>(value: &'a mut JsonValue, path: &[&str]) -> Result<&'a mut Map<String, JsonValue>> {
    if value.is_null() {
        *value = JsonValue::Object(Map::new());
    }
    let found = type_name(value);
    value.as_object_mut().ok_or_else(|| CoreError::TypeConflict {
        path: path.join("."),
        found,
    })
}

/// Human-readable name of a value's variant
pub fn type_name(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "bool",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "sequence",
        JsonValue::Object(_) => "mapping",
    }
}

/// Group-Version-Kind identity of a resource type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Gvk {
    pub group: String,
    pub version: String,
    pub kind: String,
}

impl Gvk {
    pub fn new(group: impl Into<String>, version: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            version: version.into(),
            kind: kind.into(),
        }
    }

    /// Split an `apiVersion` into group and version:
    /// - "apps/v1" -> group="apps", version="v1"
    /// - "v1" -> group="", version="v1" (core API)
    pub fn from_api_version(api_version: &str, kind: &str) -> Self {
        let (group, version) = match api_version.rsplit_once('/') {
            Some((g, v)) => (g, v),
            None => ("", api_version),
        };
        Self::new(group, version, kind)
    }

    /// Reassemble the `apiVersion` string
    pub fn api_version(&self) -> String {
        if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }
}

impl fmt::Display for Gvk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, Kind={}", self.api_version(), self.kind)
    }
}

/// `(Gvk, namespace, name)` - the address of a live object
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectReference {
    pub gvk: Gvk,
    /// None for cluster-scoped kinds or when the manifest leaves it unset
    pub namespace: Option<String>,
    pub name: String,
}

impl fmt::Display for ObjectReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{}/{}/{}", ns, self.gvk.kind, self.name),
            None => write!(f, "{}/{}", self.gvk.kind, self.name),
        }
    }
}
