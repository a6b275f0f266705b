//! Canonical JSON: keys sorted lexicographically at every depth, arrays
//! left in their original order, no insignificant whitespace.

/// Re-serialize `value` with every object's keys sorted. Two logically
/// equal values produce byte-identical output.
#[must_use]
pub fn canonical_string(value: &serde_json::Value) -> String {
    serde_json::to_string(&sort_keys(value)).expect("Value always serializes")
}

fn sort_keys(value: &serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut sorted = serde_json::Map::new();
            for key in keys {
                sorted.insert(key.clone(), sort_keys(&map[key]));
            }
            serde_json::Value::Object(sorted)
        }
        serde_json::Value::Array(items) => {
            serde_json::Value::Array(items.iter().map(sort_keys).collect())
        }
        other => other.clone(),
    }
}
