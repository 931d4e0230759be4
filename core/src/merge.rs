//! JSON-aware merging of stored values.

use serde_json::{Map, Value};

/// Merge `new` into `old`.
///
/// When both parse as JSON objects they are deep merged, with `new` winning wherever the two sides
/// are not both objects (arrays included, which are replaced wholesale). Otherwise `new` replaces
/// `old` outright.
pub fn merge_values(old: &str, new: &str) -> String {
    match (parse_object(old), parse_object(new)) {
        (Some(mut base), Some(overlay)) => {
            deep_merge_into(&mut base, overlay);
            Value::Object(base).to_string()
        }
        _ => new.to_owned(),
    }
}

/// Recursively merge `overlay` into `base`.
fn deep_merge_into(base: &mut Map<String, Value>, overlay: Map<String, Value>) {
    for (key, incoming) in overlay {
        match (base.get_mut(&key), incoming) {
            (Some(Value::Object(existing)), Value::Object(nested)) => deep_merge_into(existing, nested),
            (_, incoming) => {
                base.insert(key, incoming);
            }
        }
    }
}

fn parse_object(raw: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str(raw) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}
