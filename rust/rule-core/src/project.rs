//! The projector: SELECT (`transform`) and FOREACH (`collect`).

use crate::ast::{Expr, FieldEntry};
use crate::coerce::ensure_list;
use crate::eval::{eval, Context};
use crate::value::Value;
use indexmap::IndexMap;

/// A FOREACH collection binding: the key (an alias, a derived key, or the
/// literal atom `item`) and the list of items to iterate.
pub struct Collection {
    pub key: String,
    pub items: Vec<Value>,
}

/// Execute `fields` in Transform mode: build an output map, threading the
/// in-flight input through the fold so earlier aliases are visible to later
/// entries. Returns the output map alone.
pub fn transform(
    fields: &[FieldEntry],
    input: &Value,
    ctx: &Context,
) -> Result<Value, String> {
    let (output, _input) = run(fields, input, ctx)?;
    Ok(output)
}

/// Execute `fields` in Collect mode: same traversal as `transform`, but the
/// *last* field entry additionally determines the FOREACH collection — its
/// alias (or derived key, or `item`) becomes the collection key, and its
/// value passed through `ensure_list` becomes the collection items.
pub fn collect(
    fields: &[FieldEntry],
    input: &Value,
    ctx: &Context,
) -> Result<(Value, Collection), String> {
    if fields.is_empty() {
        return Ok((
            Value::map([]),
            Collection {
                key: "item".to_string(),
                items: Vec::new(),
            },
        ));
    }
    let mut output = IndexMap::new();
    let mut in_flight = input.clone();
    let mut last_binding: Option<(String, Value)> = None;

    for (i, entry) in fields.iter().enumerate() {
        let is_last = i == fields.len() - 1;
        match entry {
            FieldEntry::Wildcard => {
                merge_wildcard(&mut output, &in_flight);
                if is_last {
                    last_binding = Some(("item".to_string(), in_flight.clone()));
                }
            }
            FieldEntry::Aliased(expr, alias) => {
                let value = eval(expr, &in_flight, ctx)?;
                output.insert(alias.clone(), value.clone());
                put_in_flight(&mut in_flight, alias, value.clone());
                if is_last {
                    last_binding = Some((alias.clone(), value));
                }
            }
            FieldEntry::Bare(expr) => {
                let value = eval(expr, &in_flight, ctx)?;
                let key = derive_key(expr, &value);
                if let Some(k) = &key {
                    output.insert(k.clone(), value.clone());
                }
                if is_last {
                    last_binding = Some((key.unwrap_or_else(|| "item".to_string()), value));
                }
            }
        }
    }

    let (key, value) = last_binding.expect("fields non-empty implies a last binding");
    Ok((
        Value::Map(output),
        Collection {
            key,
            items: ensure_list(&value),
        },
    ))
}

/// Shared traversal for Transform mode (and the non-collection part of
/// Collect mode): fold `fields` left to right, producing the output map and
/// the in-flight input both modes need.
fn run(fields: &[FieldEntry], input: &Value, ctx: &Context) -> Result<(Value, Value), String> {
    let mut output = IndexMap::new();
    let mut in_flight = input.clone();

    for entry in fields {
        match entry {
            FieldEntry::Wildcard => merge_wildcard(&mut output, &in_flight),
            FieldEntry::Aliased(expr, alias) => {
                let value = eval(expr, &in_flight, ctx)?;
                output.insert(alias.clone(), value.clone());
                put_in_flight(&mut in_flight, alias, value);
            }
            FieldEntry::Bare(expr) => {
                let value = eval(expr, &in_flight, ctx)?;
                if let Some(key) = derive_key(expr, &value) {
                    output.insert(key, value);
                }
            }
        }
    }

    Ok((Value::Map(output), in_flight))
}

/// Merge the entire current (in-flight) input into `output`; input entries
/// take precedence over anything `output` already holds, mirroring all
/// visible fields at that point.
fn merge_wildcard(output: &mut IndexMap<String, Value>, in_flight: &Value) {
    if let Value::Map(m) = in_flight {
        for (k, v) in m {
            output.insert(k.clone(), v.clone());
        }
    }
}

/// Derive an output key for a bare (un-aliased) field entry.
/// `Var(path)` keys on the path's last component; `Const(v)` keys on the
/// literal rendered as text. Anything else has no well-defined key — see
/// `DESIGN.md`'s Open Question resolution — and is simply not placed in the
/// output (the value remains visible through the in-flight input of later
/// entries is not guaranteed, since no alias was requested).
fn derive_key(expr: &Expr, value: &Value) -> Option<String> {
    match expr {
        Expr::Var(path) => path.last().cloned(),
        Expr::Const(_) => Some(value.to_string()),
        _ => None,
    }
}

fn put_in_flight(in_flight: &mut Value, alias: &str, value: Value) {
    if let Value::Map(m) = in_flight {
        m.insert(alias.to_string(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::{FunctionLibrary, JsonCodec, TopicMatcher};

    struct Stub;
    impl FunctionLibrary for Stub {
        fn call(&self, name: &str, _args: Vec<Value>, _doc: &Value) -> Result<Value, String> {
            Err(format!("unexpected call {name}"))
        }
    }
    impl TopicMatcher for Stub {
        fn matches(&self, _text: &str, _pattern: &str) -> bool {
            false
        }
    }
    impl JsonCodec for Stub {
        fn decode(&self, _text: &str) -> Option<Value> {
            None
        }
    }
    fn ctx() -> Context<'static> {
        static STUB: Stub = Stub;
        Context {
            functions: &STUB,
            topics: &STUB,
            json: &STUB,
        }
    }

    #[test]
    fn wildcard_alone_is_idempotent() {
        let input = Value::map([("a".to_string(), Value::Int(1)), ("b".to_string(), Value::Text("x".into()))]);
        let out = transform(&[FieldEntry::Wildcard], &input, &ctx()).unwrap();
        assert_eq!(out, input);
    }

    #[test]
    fn alias_visible_to_later_entries() {
        let fields = vec![
            FieldEntry::Aliased(Expr::Const(Value::Int(42)), "v".to_string()),
            FieldEntry::Bare(Expr::Var(vec!["v".to_string()])),
        ];
        let out = transform(&fields, &Value::map([]), &ctx()).unwrap();
        assert_eq!(out.as_map().unwrap().get("v"), Some(&Value::Int(42)));
    }

    #[test]
    fn bare_var_keys_on_last_component() {
        let input = Value::map([("a".to_string(), Value::Int(1))]);
        let out = transform(&[FieldEntry::Bare(Expr::Var(vec!["a".to_string()]))], &input, &ctx()).unwrap();
        assert_eq!(out.as_map().unwrap().get("a"), Some(&Value::Int(1)));
    }

    #[test]
    fn collect_uses_last_entry_as_collection() {
        let input = Value::map([("xs".to_string(), Value::List(vec![Value::Int(1), Value::Int(2)]))]);
        let fields = vec![FieldEntry::Aliased(Expr::Var(vec!["xs".to_string()]), "items".to_string())];
        let (_selected, collection) = collect(&fields, &input, &ctx()).unwrap();
        assert_eq!(collection.key, "items");
        assert_eq!(collection.items.len(), 2);
    }

    #[test]
    fn collect_non_list_yields_zero_items() {
        let input = Value::map([("xs".to_string(), Value::Int(5))]);
        let fields = vec![FieldEntry::Aliased(Expr::Var(vec!["xs".to_string()]), "items".to_string())];
        let (_selected, collection) = collect(&fields, &input, &ctx()).unwrap();
        assert!(collection.items.is_empty());
    }
}
