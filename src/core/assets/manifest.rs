//=========================================================================
// Manifest
//=========================================================================
//
// Nested asset manifest and its flattening into keyed descriptors.
//
// Node shapes are decided once, when JSON is ingested:
//   "path" or "data:..."                     → Asset
//   { frames, meta: { image } }              → Atlas (metadata, not walked)
//   { ... }                                  → Group (keys joined with '_')
//   [ ... ]                                  → List  (index used as key)
//   anything else (numbers, null, "")        → Unsupported, skipped
//
//=========================================================================

//=== External Dependencies ===============================================

use std::collections::HashMap;

use log::warn;
use serde::Deserialize;
use serde_json::Value;

//=== Internal Dependencies ===============================================

use super::AssetDescriptor;
use crate::error::StageError;

//=== Manifest Node =======================================================

/// One node of a manifest tree.
#[derive(Debug, Clone, PartialEq)]
pub enum ManifestNode {
    Asset(String),
    Atlas(Value),
    Group(Vec<(String, ManifestNode)>),
    List(Vec<ManifestNode>),
    Unsupported(&'static str),
}

impl From<Value> for ManifestNode {
    fn from(value: Value) -> Self {
        match value {
            Value::String(raw) if raw.is_empty() => Self::Unsupported("empty string"),
            Value::String(raw) => Self::Asset(raw),
            Value::Object(_) if is_atlas_metadata(&value) => Self::Atlas(value),
            Value::Object(map) => Self::Group(
                map.into_iter()
                    .map(|(key, child)| (key, Self::from(child)))
                    .collect(),
            ),
            Value::Array(items) => Self::List(items.into_iter().map(Self::from).collect()),
            Value::Number(_) => Self::Unsupported("number"),
            Value::Bool(_) => Self::Unsupported("boolean"),
            Value::Null => Self::Unsupported("null"),
        }
    }
}

/// Atlas metadata has truthy `frames`, `meta` and `meta.image` fields.
fn is_atlas_metadata(value: &Value) -> bool {
    let truthy = |field: Option<&Value>| match field {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_) | Value::Object(_)) => true,
    };
    let meta = value.get("meta");
    truthy(value.get("frames")) && truthy(meta) && truthy(meta.and_then(|meta| meta.get("image")))
}

//=== Manifest ============================================================

/// A manifest tree. The root is always a keyed group; a list root is
/// keyed by index on ingestion.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(from = "Value")]
pub struct Manifest {
    entries: Vec<(String, ManifestNode)>,
}

impl From<Value> for Manifest {
    fn from(value: Value) -> Self {
        let entries = match ManifestNode::from(value) {
            ManifestNode::Group(entries) => entries,
            ManifestNode::List(items) => items
                .into_iter()
                .enumerate()
                .map(|(idx, node)| (idx.to_string(), node))
                .collect(),
            other => {
                warn!("Manifest root is not a group or list, ignoring {:?}", other);
                Vec::new()
            }
        };
        Self { entries }
    }
}

impl Manifest {
    //--- Construction -----------------------------------------------------

    /// Creates an empty manifest.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a manifest from JSON text.
    pub fn from_json(text: &str) -> Result<Self, StageError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Adds a top-level asset entry.
    pub fn with_asset(mut self, key: impl Into<String>, raw: impl Into<String>) -> Self {
        self.insert(key, ManifestNode::Asset(raw.into()));
        self
    }

    /// Inserts or replaces a top-level entry.
    ///
    /// A replaced entry keeps its position.
    pub fn insert(&mut self, key: impl Into<String>, node: ManifestNode) {
        let key = key.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, slot)) => *slot = node,
            None => self.entries.push((key, node)),
        }
    }

    /// Merges `other` into this manifest. Entries of `other` win on
    /// key collisions.
    pub fn merge(&mut self, other: Manifest) {
        for (key, node) in other.entries {
            self.insert(key, node);
        }
    }

    pub fn entries(&self) -> &[(String, ManifestNode)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    //--- Flattening -------------------------------------------------------

    /// Flattens the tree into descriptors in manifest order.
    ///
    /// Group keys equal to a reserved token are skipped with their whole
    /// subtree. Atlas metadata nodes are collected by their joined key so
    /// the loader can find an atlas image's `<key>_data` sibling.
    pub fn flatten(&self, reserved: &[String]) -> FlatManifest {
        let mut flat = FlatManifest::default();
        let mut path = Vec::new();
        walk_group(&self.entries, &mut path, reserved, &mut flat);
        flat
    }
}

//=== Flat Manifest =======================================================

/// Flattened manifest: ordered descriptors plus atlas metadata by key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlatManifest {
    pub descriptors: Vec<AssetDescriptor>,
    pub atlas_data: HashMap<String, Value>,
}

fn walk(node: &ManifestNode, path: &mut Vec<String>, reserved: &[String], out: &mut FlatManifest) {
    match node {
        ManifestNode::Asset(raw) => {
            out.descriptors.push(AssetDescriptor::new(path.join("_"), raw.clone()));
        }
        ManifestNode::Atlas(metadata) => {
            out.atlas_data.insert(path.join("_"), metadata.clone());
        }
        ManifestNode::Group(entries) => walk_group(entries, path, reserved, out),
        ManifestNode::List(items) => {
            for (idx, child) in items.iter().enumerate() {
                path.push(idx.to_string());
                walk(child, path, reserved, out);
                path.pop();
            }
        }
        ManifestNode::Unsupported(shape) => {
            warn!("Skipping manifest entry '{}': unsupported {}", path.join("_"), shape);
        }
    }
}

fn walk_group(
    entries: &[(String, ManifestNode)],
    path: &mut Vec<String>,
    reserved: &[String],
    out: &mut FlatManifest,
) {
    for (key, child) in entries {
        if reserved.iter().any(|token| token == key) {
            continue;
        }
        path.push(key.clone());
        walk(child, path, reserved, out);
        path.pop();
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
