//! Configuration document model.
//!
//! # Data Flow
//! ```text
//! backend (JSON / TOML)
//!     → ConfigDocument (namespace → section → field map)
//!     → FormSchema reads field values for rendering
//!     → edit cycle produces a Patch (changed fields only)
//!     → ConfigStore shallow-merges the Patch back
//! ```
//!
//! # Design Decisions
//! - Fields stay as raw JSON values so that fields this editor does not
//!   own round-trip through load/save unchanged
//! - A merge touches only the keys present in the patch
//! - A null patch value unsets the field: the key is removed, matching
//!   the persisted shape where unset fields are simply absent

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Identifies one patchable section: a namespace plus a section path.
///
/// The section path may be instance-qualified with dots, e.g.
/// `upstreams.charts` addresses the `charts` instance inside the
/// `upstreams` section of the namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SectionKey {
    namespace: String,
    section: String,
}

impl SectionKey {
    pub fn new(namespace: impl Into<String>, section: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            section: section.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn section(&self) -> &str {
        &self.section
    }
}

impl fmt::Display for SectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.section)
    }
}

/// Partial field mapping scoped to exactly one section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Patch {
    fields: Map<String, Value>,
}

impl Patch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: impl Into<String>, value: Value) {
        self.fields.insert(field.into(), value);
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn fields(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }
}

impl FromIterator<(String, Value)> for Patch {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

/// The full configuration document: namespace → section → field map.
///
/// Loaded wholesale once per session and mutated only through
/// [`ConfigDocument::merge`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigDocument {
    root: Map<String, Value>,
}

impl ConfigDocument {
    /// Build a document from a JSON object value.
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    /// Build a document holding a single namespace.
    pub fn from_namespace(namespace: &str, sections: Map<String, Value>) -> Self {
        let mut root = Map::new();
        root.insert(namespace.to_string(), Value::Object(sections));
        Self { root }
    }

    /// All sections of one namespace.
    pub fn namespace(&self, namespace: &str) -> Option<&Map<String, Value>> {
        self.root.get(namespace)?.as_object()
    }

    /// The field map of one section, if present.
    pub fn section(&self, key: &SectionKey) -> Option<&Map<String, Value>> {
        let mut current = self.root.get(key.namespace())?;
        for segment in key.section().split('.') {
            current = current.as_object()?.get(segment)?;
        }
        current.as_object()
    }

    /// One field of one section.
    pub fn field(&self, key: &SectionKey, field: &str) -> Option<&Value> {
        self.section(key)?.get(field)
    }

    /// Shallow-merge `patch` into the section at `key`.
    ///
    /// Only the keys present in the patch are touched; every other field
    /// of the section, and every other section, stays byte-identical.
    /// Null values unset their field. Missing intermediate objects are
    /// created, since a patch the backend accepted targets a section
    /// that exists remotely.
    pub fn merge(&mut self, key: &SectionKey, patch: &Patch) {
        let section = self.section_mut(key);
        for (field, value) in patch.fields() {
            if value.is_null() {
                section.remove(field);
            } else {
                section.insert(field.clone(), value.clone());
            }
        }
    }

    fn section_mut(&mut self, key: &SectionKey) -> &mut Map<String, Value> {
        let mut current = self
            .root
            .entry(key.namespace().to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        for segment in key.section().split('.') {
            current = ensure_object(current)
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
        }
        ensure_object(current)
    }
}

fn ensure_object(value: &mut Value) -> &mut Map<String, Value> {
    if !value.is_object() {
        *value = Value::Object(Map::new());
    }
    match value {
        Value::Object(map) => map,
        _ => unreachable!("value was just replaced with an object"),
    }
}
