//! JSON deep merge
//!
//! Object keys are unioned with patch values overriding same-named keys.
//! Arrays merge by identity: an equal element de-duplicates, and an object
//! element carrying a `name` key replaces an existing object with the same
//! name. Both rules keep the merge idempotent: `merge(doc, doc) == doc`.

use serde_json::{Map, Value};

/// Key that gives an array element an identity.
const IDENTITY_KEY: &str = "name";

/// Merge `patch` into `base`, returning the merged document. Keys the merge
/// does not understand round-trip unchanged.
pub fn deep_merge(base: &Value, patch: &Value) -> Value {
    match (base, patch) {
        (Value::Object(base_map), Value::Object(patch_map)) => {
            let mut merged: Map<String, Value> = base_map.clone();
            for (key, patch_value) in patch_map {
                let entry = match merged.get(key) {
                    Some(base_value) => deep_merge(base_value, patch_value),
                    None => patch_value.clone(),
                };
                merged.insert(key.clone(), entry);
            }
            Value::Object(merged)
        }
        (Value::Array(base_items), Value::Array(patch_items)) => {
            Value::Array(merge_arrays(base_items, patch_items))
        }
        // Scalar or mismatched shapes: patch wins
        (_, patch_value) => patch_value.clone(),
    }
}

fn merge_arrays(base: &[Value], patch: &[Value]) -> Vec<Value> {
    let mut merged: Vec<Value> = base.to_vec();
    for item in patch {
        if merged.contains(item) {
            continue;
        }
        if let Some(name) = identity_of(item)
            && let Some(existing) = merged
                .iter_mut()
                .find(|e| identity_of(e) == Some(name))
        {
            *existing = item.clone();
            continue;
        }
        merged.push(item.clone());
    }
    merged
}

fn identity_of(value: &Value) -> Option<&str> {
    value.as_object()?.get(IDENTITY_KEY)?.as_str()
}
