//! Structural (schema) validation seam.
//!
//! Full JSON Schema validation is an external concern: anything implementing
//! [`SchemaValidator`] can be plugged in front of the semantic checks.
//! [`StructuralSchema`] is the built-in implementation for KDF v0.1. It checks
//! the shape the semantic validator relies on (required arrays, string ids,
//! supported version) and nothing more.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::types::SUPPORTED_KDF_VERSION;

/// One schema finding. `path` is a `/`-joined JSON pointer without the
/// leading slash (`""` for the document root).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SchemaViolation {
    pub path: String,
    pub message: String,
}

impl SchemaViolation {
    fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// A structural validator for raw artifact JSON.
pub trait SchemaValidator: Send + Sync {
    /// Every violation found, in a stable order. Empty means conformant.
    fn validate(&self, document: &Value) -> Vec<SchemaViolation>;
}

/// Built-in structural check for KDF v0.1 artifacts.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuralSchema;

impl SchemaValidator for StructuralSchema {
    fn validate(&self, document: &Value) -> Vec<SchemaViolation> {
        let mut out = Vec::new();
        let Some(root) = document.as_object() else {
            out.push(SchemaViolation::new("", "artifact must be a JSON object"));
            return out;
        };

        if let Some(version) = root.get("kdf_version") {
            if version.as_str() != Some(SUPPORTED_KDF_VERSION) {
                out.push(SchemaViolation::new(
                    "kdf_version",
                    format!("unsupported kdf_version {version}; expected \"{SUPPORTED_KDF_VERSION}\""),
                ));
            }
        }

        if let Some(items) = array_field(root, "", "sources", false, &mut out) {
            for (i, item) in items.iter().enumerate() {
                let path = format!("sources/{i}");
                if let Some(obj) = object_item(item, &path, &mut out) {
                    required_string(obj, &path, "id", &mut out);
                    required_string(obj, &path, "text", &mut out);
                }
            }
        }

        if let Some(items) = array_field(root, "", "document_nodes", true, &mut out) {
            for (i, item) in items.iter().enumerate() {
                let path = format!("document_nodes/{i}");
                if let Some(obj) = object_item(item, &path, &mut out) {
                    required_string(obj, &path, "id", &mut out);
                    required_string(obj, &path, "type", &mut out);
                    optional_string(obj, &path, "parent_id", &mut out);
                    optional_string(obj, &path, "text", &mut out);
                }
            }
        }

        if let Some(items) = array_field(root, "", "atoms", true, &mut out) {
            for (i, item) in items.iter().enumerate() {
                let path = format!("atoms/{i}");
                if let Some(obj) = object_item(item, &path, &mut out) {
                    required_string(obj, &path, "id", &mut out);
                    required_string(obj, &path, "text", &mut out);
                    required_string(obj, &path, "node_path", &mut out);
                }
            }
        }

        if let Some(items) = array_field(root, "", "evidence", true, &mut out) {
            for (i, item) in items.iter().enumerate() {
                let path = format!("evidence/{i}");
                let Some(obj) = object_item(item, &path, &mut out) else {
                    continue;
                };
                required_string(obj, &path, "atom_id", &mut out);
                optional_string(obj, &path, "source_id", &mut out);
                match obj.get("validation") {
                    Some(Value::Object(validation)) => {
                        required_string(validation, &format!("{path}/validation"), "status", &mut out);
                    }
                    Some(_) => out.push(SchemaViolation::new(
                        format!("{path}/validation"),
                        "validation must be an object",
                    )),
                    None => out.push(SchemaViolation::new(
                        path.clone(),
                        "missing required property \"validation\"",
                    )),
                }
                if let Some(anchors) = array_field(obj, &path, "anchors", false, &mut out) {
                    for (j, anchor) in anchors.iter().enumerate() {
                        let anchor_path = format!("{path}/anchors/{j}");
                        if let Some(a) = object_item(anchor, &anchor_path, &mut out) {
                            required_string(a, &anchor_path, "type", &mut out);
                        }
                    }
                }
            }
        }

        out.sort();
        out
    }
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn join(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{parent}/{key}")
    }
}

fn array_field<'v>(
    obj: &'v Map<String, Value>,
    parent: &str,
    key: &str,
    required: bool,
    out: &mut Vec<SchemaViolation>,
) -> Option<&'v Vec<Value>> {
    match obj.get(key) {
        Some(Value::Array(items)) => Some(items),
        Some(_) => {
            out.push(SchemaViolation::new(join(parent, key), format!("{key} must be an array")));
            None
        }
        None if required => {
            out.push(SchemaViolation::new(
                parent,
                format!("missing required property {key:?}"),
            ));
            None
        }
        None => None,
    }
}

fn object_item<'v>(
    item: &'v Value,
    path: &str,
    out: &mut Vec<SchemaViolation>,
) -> Option<&'v Map<String, Value>> {
    let obj = item.as_object();
    if obj.is_none() {
        out.push(SchemaViolation::new(path, "item must be an object"));
    }
    obj
}

fn required_string(obj: &Map<String, Value>, path: &str, key: &str, out: &mut Vec<SchemaViolation>) {
    match obj.get(key) {
        Some(Value::String(_)) => {}
        Some(_) => out.push(SchemaViolation::new(
            join(path, key),
            format!("{key} must be a string"),
        )),
        None => out.push(SchemaViolation::new(
            path,
            format!("missing required property {key:?}"),
        )),
    }
}

fn optional_string(obj: &Map<String, Value>, path: &str, key: &str, out: &mut Vec<SchemaViolation>) {
    match obj.get(key) {
        None | Some(Value::Null) | Some(Value::String(_)) => {}
        Some(_) => out.push(SchemaViolation::new(
            join(path, key),
            format!("{key} must be a string or null"),
        )),
    }
}
