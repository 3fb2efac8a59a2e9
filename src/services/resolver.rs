//! In-document `$ref` resolution
//!
//! Only `#`-prefixed JSON pointers are followed. External files and URLs
//! resolve to `None`, which callers treat as an absent contribution.

use serde_json::Value;

const FRAGMENT_PREFIX: char = '#';

/// Resolve a `$ref` pointer against the document root
pub fn resolve_ref<'a>(root: &'a Value, reference: &str) -> Option<&'a Value> {
    let pointer = reference.strip_prefix(FRAGMENT_PREFIX)?;
    if pointer.is_empty() {
        return Some(root);
    }

    let pointer = pointer.strip_prefix('/')?;
    pointer
        .split('/')
        .try_fold(root, |node, raw| step(node, &unescape_segment(raw)))
}

/// Apply JSON pointer escaping rules (`~1` -> `/`, then `~0` -> `~`)
pub fn unescape_segment(segment: &str) -> String {
    segment.replace("~1", "/").replace("~0", "~")
}

fn step<'a>(node: &'a Value, segment: &str) -> Option<&'a Value> {
    match node {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => {
            // Leading zeros and signs are not valid array indices
            if segment.is_empty()
                || (segment.len() > 1 && segment.starts_with('0'))
                || !segment.bytes().all(|b| b.is_ascii_digit())
            {
                return None;
            }
            segment.parse::<usize>().ok().and_then(|i| items.get(i))
        }
        _ => None,
    }
}

/// Resolve `node` if it carries an own `$ref`, returning the target object
pub fn resolve_object<'a>(root: &'a Value, node: &'a Value) -> Option<&'a Value> {
    node.get("$ref")
        .and_then(|r| r.as_str())
        .and_then(|r| resolve_ref(root, r))
        .filter(|target| target.is_object())
}

/// Merge a referenced object under its local override.
///
/// The resolved target supplies the base fields; every key of the local
/// object except `$ref` itself wins on conflict. Non-ref nodes are returned
/// unchanged.
pub fn overlay_ref(root: &Value, node: &Value) -> Value {
    let Some(local) = node.as_object() else {
        return node.clone();
    };
    let Some(target) = resolve_object(root, node).and_then(|t| t.as_object()) else {
        return node.clone();
    };

    let mut merged = target.clone();
    for (key, value) in local {
        if key != "$ref" {
            merged.insert(key.clone(), value.clone());
        }
    }
    Value::Object(merged)
}
