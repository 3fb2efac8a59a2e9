//! Document-wide metadata: title, operation count and tag set

use crate::types::{DocumentMetadata, HttpMethod};
use serde_json::Value;
use std::collections::BTreeSet;

const UNTITLED: &str = "Untitled API";

/// Count operations and collect tags from operations and the top-level
/// `tags` declaration
pub fn compute_metadata(document: &Value) -> DocumentMetadata {
    let mut tags = BTreeSet::new();
    let mut total_endpoints = 0;

    if let Some(paths) = document.get("paths").and_then(|v| v.as_object()) {
        for item in paths.values().filter_map(|v| v.as_object()) {
            for method in HttpMethod::ALL {
                let Some(operation) = item.get(method.as_key()).filter(|op| op.is_object()) else {
                    continue;
                };
                total_endpoints += 1;
                if let Some(op_tags) = operation.get("tags").and_then(|v| v.as_array()) {
                    insert_tags(&mut tags, op_tags.iter().filter_map(|t| t.as_str()));
                }
            }
        }
    }

    if let Some(declared) = document.get("tags").and_then(|v| v.as_array()) {
        insert_tags(
            &mut tags,
            declared
                .iter()
                .filter_map(|t| t.get("name").and_then(|n| n.as_str())),
        );
    }

    let info = document.get("info");
    let info_text = |key: &str| {
        info.and_then(|i| i.get(key))
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
    };

    let openapi_version = ["openapi", "swagger"]
        .into_iter()
        .find_map(|key| document.get(key).and_then(|v| v.as_str()))
        .map(String::from);

    DocumentMetadata {
        project_title: info_text("title").unwrap_or_else(|| UNTITLED.to_string()),
        api_version: info_text("version"),
        openapi_version,
        total_endpoints,
        total_tags: tags.len(),
        tags: tags.into_iter().collect(),
    }
}

fn insert_tags<'a>(tags: &mut BTreeSet<String>, names: impl Iterator<Item = &'a str>) {
    for name in names.map(str::trim).filter(|n| !n.is_empty()) {
        tags.insert(name.to_string());
    }
}
