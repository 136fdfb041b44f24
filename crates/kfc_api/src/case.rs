//! Key conversion between the wire convention (snake_case) and the client
//! convention (camelCase), plus `_id` → `id` normalization.
//!
//! The conversion is algorithmic and therefore not a bijection: keys with
//! consecutive capitals (`userID` → `user_i_d` → `userID`) survive, but wire
//! keys that already carry capitals (`user_ID` → `user__i_d`) do not come
//! back unchanged.

use serde_json::{Map, Value};
use tracing::warn;

/// `snake_case` → `snakeCase`. Only `_` followed by a lowercase ASCII
/// letter is folded.
pub fn snake_to_camel(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut chars = key.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '_' {
            if let Some(&next) = chars.peek() {
                if next.is_ascii_lowercase() {
                    out.push(next.to_ascii_uppercase());
                    chars.next();
                    continue;
                }
            }
        }
        out.push(c);
    }
    out
}

/// `camelCase` → `camel_case`. Every ASCII capital becomes `_` + lowercase.
pub fn camel_to_snake(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    for c in key.chars() {
        if c.is_ascii_uppercase() {
            out.push('_');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Recursively camelCases object keys, descending into arrays.
pub fn keys_to_camel(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (snake_to_camel(&k), keys_to_camel(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(keys_to_camel).collect()),
        other => other,
    }
}

/// Recursively snake_cases object keys. A top-level array is returned as
/// is, and arrays nested in objects are not descended into.
pub fn keys_to_snake(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| {
                    let v = match v {
                        Value::Object(_) => keys_to_snake(v),
                        other => other,
                    };
                    (camel_to_snake(&k), v)
                })
                .collect(),
        ),
        other => other,
    }
}

/// Numeric `id`s become strings and `_id` is renamed to `id`, recursively.
///
/// When both `_id` and a different `id` are present, `_id` wins and a
/// warning names both values.
pub fn normalize_ids(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(normalize_object(map)),
        Value::Array(items) => Value::Array(items.into_iter().map(normalize_ids).collect()),
        other => other,
    }
}

fn normalize_object(mut map: Map<String, Value>) -> Map<String, Value> {
    if let Some(Value::Number(n)) = map.get("id") {
        let id = n.to_string();
        map.insert("id".to_string(), Value::String(id));
    }

    if let Some(mongo_id) = map.remove("_id") {
        let mongo_id = match mongo_id {
            Value::Number(n) => Value::String(n.to_string()),
            other => other,
        };
        if let Some(existing) = map.get("id") {
            if existing != &mongo_id {
                warn!(
                    "⚠️ Conflicting identifiers: `_id` {} replaces `id` {}",
                    mongo_id, existing
                );
            }
        }
        map.insert("id".to_string(), mongo_id);
    }

    map.into_iter()
        .map(|(k, v)| {
            let v = match v {
                Value::Object(_) | Value::Array(_) => normalize_ids(v),
                other => other,
            };
            (k, v)
        })
        .collect()
}
