//! Loose coercion helpers. None of these raise except `number`, whose
//! failure is surfaced as [`RuleError::Coercion`] so `predicate::compare`
//! can fold it into `match_conditions_error`.

use crate::error::RuleError;
use crate::external::JsonCodec;
use crate::value::Value;
use indexmap::IndexMap;

/// Parse a textual number: integer first, then float, else
/// [`RuleError::Coercion`].
pub fn number(text: &str) -> Result<Value, RuleError> {
    if let Ok(n) = text.parse::<i64>() {
        return Ok(Value::Int(n));
    }
    match text.parse::<f64>() {
        Ok(f) => Ok(Value::Float(f)),
        Err(_) => Err(RuleError::Coercion(format!(
            "cannot parse {text:?} as a number"
        ))),
    }
}

/// If `v` is already a map, return it unchanged. Otherwise attempt to decode
/// it as textual JSON via `codec`; on decode failure, or if the decoded
/// value is not itself a map, return an empty map. Never fails.
pub fn ensure_map(v: &Value, codec: &dyn JsonCodec) -> IndexMap<String, Value> {
    if let Value::Map(m) = v {
        return m.clone();
    }
    let text = match v {
        Value::Text(s) | Value::Atom(s) => s.as_str(),
        _ => return IndexMap::new(),
    };
    match codec.decode(text) {
        Some(Value::Map(m)) => m,
        _ => IndexMap::new(),
    }
}

/// If `v` is a list, return it. Otherwise the empty list.
pub fn ensure_list(v: &Value) -> Vec<Value> {
    match v {
        Value::List(items) => items.clone(),
        _ => Vec::new(),
    }
}

/// Canonical UTF-8 rendering of a symbolic atom.
pub fn atom_to_text(v: &Value) -> Option<String> {
    match v {
        Value::Atom(s) => Some(s.clone()),
        _ => None,
    }
}
