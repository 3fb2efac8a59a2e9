//! Schema summarization
//!
//! Reduces an arbitrary JSON Schema node to a bounded [`SchemaSummary`].
//! The node's own fields, its resolved `$ref` target and every combinator
//! branch are summarized independently and merged in that order, so the
//! local declaration wins scalar conflicts.
//!
//! Recursion is bounded twice: by `max_depth`, and by a stack of node
//! addresses on the current path that breaks self-referencing schemas. The
//! stack is path-local, so the same component reached through two sibling
//! properties is expanded both times.

use crate::services::merger::{append_description, merge_summaries};
use crate::services::resolver::resolve_ref;
use crate::types::{DEFAULT_MAX_DEPTH, SchemaProperty, SchemaSummary};
use serde_json::{Map, Value};
use std::collections::HashSet;

const COMBINATORS: [&str; 3] = ["allOf", "oneOf", "anyOf"];

/// Summarizes schema nodes of one document
pub struct SchemaSummarizer<'a> {
    root: &'a Value,
    max_depth: usize,
}

impl<'a> SchemaSummarizer<'a> {
    pub fn new(root: &'a Value) -> Self {
        Self {
            root,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Summarize a schema node, or `None` if it carries no usable data
    pub fn summarize(&self, node: &Value) -> Option<SchemaSummary> {
        let mut path = Vec::new();
        self.summarize_at(node, 0, &mut path)
    }

    fn summarize_at(
        &self,
        node: &Value,
        depth: usize,
        path: &mut Vec<*const Value>,
    ) -> Option<SchemaSummary> {
        let obj = node.as_object()?;
        if depth > self.max_depth {
            return None;
        }

        let id = node as *const Value;
        if path.contains(&id) {
            tracing::trace!(depth, "schema cycle detected, skipping");
            return None;
        }

        path.push(id);
        let summary = self.summarize_object(obj, depth, path);
        path.pop();
        summary
    }

    fn summarize_object(
        &self,
        obj: &Map<String, Value>,
        depth: usize,
        path: &mut Vec<*const Value>,
    ) -> Option<SchemaSummary> {
        let mut direct = direct_fields(obj);
        let reference = obj.get("$ref").and_then(|v| v.as_str());

        // At the depth limit only the node's own scalars are kept, plus a
        // type inferred from its shape or its `$ref` target without expanding
        if depth >= self.max_depth {
            if direct.schema_type.is_none() {
                direct.schema_type = implied_type(obj).or_else(|| {
                    reference
                        .and_then(|r| resolve_ref(self.root, r))
                        .and_then(|target| target.as_object())
                        .and_then(|target| schema_type(target).or_else(|| implied_type(target)))
                });
            }
            return direct.into_option();
        }

        if let Some(items) = obj.get("items") {
            if let Some(items_summary) = self.summarize_at(items, depth + 1, path) {
                direct.items_type = items_summary.schema_type.clone();
                direct.items_enum = items_summary.enum_values.clone();
                direct.items_schema = Some(Box::new(items_summary));
            }
            direct.schema_type.get_or_insert_with(|| "array".to_string());
        }

        if let Some(properties) = obj.get("properties").and_then(|v| v.as_object()) {
            let required = required_names(obj);
            let mut summarized = Vec::with_capacity(properties.len());
            for (name, prop) in properties {
                let schema = self.summarize_at(prop, depth + 1, path);
                let description = prop
                    .get("description")
                    .and_then(|v| v.as_str())
                    .map(String::from)
                    .or_else(|| schema.as_ref().and_then(|s| s.description.clone()));
                summarized.push(SchemaProperty {
                    name: name.clone(),
                    required: required.contains(name.as_str()),
                    description,
                    schema,
                });
            }
            if !summarized.is_empty() {
                direct.properties = Some(summarized);
            }
            direct.schema_type.get_or_insert_with(|| "object".to_string());
        }

        let mut branches = Vec::new();
        for keyword in COMBINATORS {
            let Some(members) = obj.get(keyword).and_then(|v| v.as_array()) else {
                continue;
            };
            if keyword != "allOf" && members.len() > 1 {
                let marker = format!("{keyword} ({} variants)", members.len());
                append_description(&mut direct.description, &marker);
            }
            for member in members {
                if let Some(summary) = self.summarize_at(member, depth + 1, path) {
                    branches.push(summary);
                }
            }
        }

        let mut contributions = Vec::with_capacity(branches.len() + 2);
        if !direct.is_empty() {
            contributions.push(direct);
        }

        if let Some(reference) = reference {
            match resolve_ref(self.root, reference).filter(|target| target.is_object()) {
                Some(target) => {
                    if let Some(resolved) = self.summarize_at(target, depth + 1, path) {
                        contributions.push(resolved);
                    }
                }
                None => tracing::debug!(reference, "unresolved $ref"),
            }
        }

        contributions.extend(branches);

        let mut merged = merge_summaries(contributions)?;
        if let Some(reference) = reference {
            merged
                .reference
                .get_or_insert_with(|| reference.to_string());
        }
        Some(merged)
    }
}

/// Summary built from the node's own scalar keys only
fn direct_fields(obj: &Map<String, Value>) -> SchemaSummary {
    let text = |key: &str| obj.get(key).and_then(|v| v.as_str()).map(String::from);

    let mut summary = SchemaSummary {
        schema_type: schema_type(obj),
        format: text("format"),
        title: text("title"),
        enum_values: obj.get("enum").and_then(sanitize_enum),
        default: obj.get("default").cloned(),
        example: obj.get("example").cloned(),
        reference: text("$ref"),
        ..Default::default()
    };
    if let Some(description) = obj.get("description").and_then(|v| v.as_str()) {
        append_description(&mut summary.description, description);
    }
    summary
}

/// `type` as a string, or the first non-null entry of a 3.1 type array
fn schema_type(obj: &Map<String, Value>) -> Option<String> {
    match obj.get("type")? {
        Value::String(s) => Some(s.clone()),
        Value::Array(types) => types
            .iter()
            .filter_map(|t| t.as_str())
            .find(|t| *t != "null")
            .map(String::from),
        _ => None,
    }
}

/// Type implied by structural keywords when `type` is omitted
fn implied_type(obj: &Map<String, Value>) -> Option<String> {
    if obj.contains_key("properties") {
        Some("object".to_string())
    } else if obj.contains_key("items") {
        Some("array".to_string())
    } else {
        None
    }
}

/// Keep primitive enum members only
fn sanitize_enum(value: &Value) -> Option<Vec<Value>> {
    let members: Vec<Value> = value
        .as_array()?
        .iter()
        .filter(|v| v.is_string() || v.is_number() || v.is_boolean())
        .cloned()
        .collect();
    if members.is_empty() { None } else { Some(members) }
}

fn required_names(obj: &Map<String, Value>) -> HashSet<&str> {
    obj.get("required")
        .and_then(|v| v.as_array())
        .map(|arr| arr.iter().filter_map(|v| v.as_str()).collect())
        .unwrap_or_default()
}
