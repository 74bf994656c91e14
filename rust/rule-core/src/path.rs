//! Dotted-path access into a nested [`Value::Map`] document, specialized to
//! the single-element path as the hot case.

use crate::value::Value;

/// An ordered sequence of textual keys addressing a location inside nested
/// maps.
pub type Path = [String];

/// Walk `path` left to right through nested maps. Any missing key, or
/// traversal into a non-map, yields `None` — this function never raises.
pub fn get<'a>(path: &Path, document: &'a Value) -> Option<&'a Value> {
    let Some((first, rest)) = path.split_first() else {
        return Some(document);
    };
    let Value::Map(map) = document else {
        return None;
    };
    let next = map.get(first)?;
    if rest.is_empty() {
        Some(next)
    } else {
        get(rest, next)
    }
}

/// Return a document equal to `document` except that `path` is created or
/// overwritten with `value`. Intermediate maps are created as needed;
/// existing sibling keys are preserved. Pure — `document` is not mutated.
pub fn put(path: &Path, value: Value, document: &Value) -> Value {
    let mut out = match document {
        Value::Map(m) => m.clone(),
        _ => Default::default(),
    };
    put_in_map(path, value, &mut out);
    Value::Map(out)
}

fn put_in_map(path: &Path, value: Value, map: &mut indexmap::IndexMap<String, Value>) {
    let Some((first, rest)) = path.split_first() else {
        return;
    };
    if rest.is_empty() {
        map.insert(first.clone(), value);
        return;
    }
    let entry = map
        .entry(first.clone())
        .or_insert_with(|| Value::Map(Default::default()));
    if !matches!(entry, Value::Map(_)) {
        *entry = Value::Map(Default::default());
    }
    if let Value::Map(inner) = entry {
        put_in_map(rest, value, inner);
    }
}

/// Convenience: split `"a.b.c"` into owned path segments. An empty string
/// yields an empty path (addresses the document itself).
pub fn parse(dotted: &str) -> Vec<String> {
    if dotted.is_empty() {
        Vec::new()
    } else {
        dotted.split('.').map(str::to_owned).collect()
    }
}
