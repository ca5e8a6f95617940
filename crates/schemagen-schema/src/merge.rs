use serde_json::{Map, Value};

use crate::keywords::{PROPERTIES, REQUIRED};

/// Folds `overlay` onto `target`.
///
/// `required` names are unioned in first-seen order, `properties` are merged
/// per property (recursively when both sides are schemas), and every other
/// keyword from `overlay` replaces the one in `target`.
pub fn merge_into(target: &mut Map<String, Value>, overlay: &Map<String, Value>) {
    for (keyword, value) in overlay {
        match keyword.as_str() {
            REQUIRED => union_required(target, value),
            PROPERTIES => merge_properties(target, value),
            _ => {
                target.insert(keyword.clone(), value.clone());
            }
        }
    }
}

/// Merges two schema nodes into a new one; `overlay` wins on conflicts.
pub fn merge(base: &Value, overlay: &Value) -> Value {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            let mut merged = base.clone();
            merge_into(&mut merged, overlay);
            Value::Object(merged)
        }
        (_, Value::Object(_)) => overlay.clone(),
        (Value::Object(_), _) => base.clone(),
        _ => overlay.clone(),
    }
}

/// Folds a sequence of schema nodes left to right with [`merge_into`].
pub fn merge_all<'a>(parts: impl IntoIterator<Item = &'a Value>) -> Map<String, Value> {
    let mut merged = Map::new();
    for part in parts {
        if let Value::Object(part) = part {
            merge_into(&mut merged, part);
        }
    }
    merged
}

fn union_required(target: &mut Map<String, Value>, incoming: &Value) {
    let Value::Array(incoming) = incoming else {
        target.insert(REQUIRED.to_string(), incoming.clone());
        return;
    };
    let mut names = match target.get(REQUIRED) {
        Some(Value::Array(existing)) => existing.clone(),
        _ => Vec::with_capacity(incoming.len()),
    };
    for name in incoming {
        if !names.contains(name) {
            names.push(name.clone());
        }
    }
    target.insert(REQUIRED.to_string(), Value::Array(names));
}

fn merge_properties(target: &mut Map<String, Value>, incoming: &Value) {
    let Value::Object(incoming) = incoming else {
        target.insert(PROPERTIES.to_string(), incoming.clone());
        return;
    };
    match target.get_mut(PROPERTIES) {
        Some(Value::Object(existing)) => {
            for (name, schema) in incoming {
                if let (Some(Value::Object(current)), Value::Object(schema)) =
                    (existing.get_mut(name), schema)
                {
                    merge_into(current, schema);
                    continue;
                }
                existing.insert(name.clone(), schema.clone());
            }
        }
        _ => {
            target.insert(PROPERTIES.to_string(), Value::Object(incoming.clone()));
        }
    }
}
