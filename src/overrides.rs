//! Guarded deep merge of caller supplied payload overrides.
//!
//! Callers may tune a vendor body with a partial JSON object, but never touch
//! the keys the dispatcher relies on. A single forbidden key anywhere in the
//! override (nested objects and array elements included) rejects the whole
//! override and leaves the body untouched.

use serde_json::Value;
use tracing::warn;

/// Keys an override may never set, at any depth. Case-sensitive.
pub const FORBIDDEN_OVERRIDE_KEYS: [&str; 4] = ["stream", "messages", "tools", "model"];

pub fn is_forbidden_key(key: &str) -> bool {
    FORBIDDEN_OVERRIDE_KEYS.contains(&key)
}

/// Path of the first forbidden key in `value`, e.g. `extra.tools` or `a[1].model`.
pub fn find_forbidden_key(value: &Value) -> Option<String> {
    find_at(value, "")
}

fn find_at(value: &Value, path: &str) -> Option<String> {
    match value {
        Value::Object(map) => map.iter().find_map(|(k, v)| {
            let here = if path.is_empty() {
                k.clone()
            } else {
                format!("{}.{}", path, k)
            };
            if is_forbidden_key(k) {
                Some(here)
            } else {
                find_at(v, &here)
            }
        }),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .find_map(|(i, v)| find_at(v, &format!("{}[{}]", path, i))),
        _ => None,
    }
}

pub fn has_forbidden_key(value: &Value) -> bool {
    find_forbidden_key(value).is_some()
}

/// Deep merge `patch` into `target`: objects merge key by key, anything else
/// (arrays included) replaces the target value.
pub fn merge_deep(target: &mut Value, patch: &Value) {
    match (target, patch) {
        (Value::Object(t), Value::Object(p)) => {
            for (k, v) in p {
                match t.get_mut(k) {
                    Some(existing) if existing.is_object() && v.is_object() => {
                        merge_deep(existing, v)
                    }
                    _ => {
                        t.insert(k.clone(), v.clone());
                    }
                }
            }
        }
        (t, p) => *t = p.clone(),
    }
}

/// What [`apply_request_overrides`] did with an override.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverrideOutcome {
    Applied,
    /// A forbidden key was found; the body is unchanged.
    Rejected { key_path: String },
    /// The override is not a JSON object.
    Ignored,
}

/// Merge `overrides` into a freshly built request body.
///
/// The override value itself is never modified.
pub fn apply_request_overrides(body: &mut Value, overrides: &Value) -> OverrideOutcome {
    if !overrides.is_object() {
        return OverrideOutcome::Ignored;
    }
    if let Some(key_path) = find_forbidden_key(overrides) {
        warn!(
            key = key_path.as_str(),
            "request overrides rejected: protocol-critical key present"
        );
        return OverrideOutcome::Rejected { key_path };
    }
    merge_deep(body, overrides);
    OverrideOutcome::Applied
}
