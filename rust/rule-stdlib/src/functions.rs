//! Arithmetic and string builtins, plus one partial-application example
//! (`coalesce`) demonstrating `FunctionLibrary::call`'s `doc` parameter.
//!
//! One dispatch `match` on the function name, JSON-like values in and out.

use rule_core::external::FunctionLibrary;
use rule_core::path;
use rule_core::value::Value;

#[derive(Debug, Default)]
pub struct StdFunctionLibrary;

impl FunctionLibrary for StdFunctionLibrary {
    fn call(&self, name: &str, args: Vec<Value>, doc: &Value) -> Result<Value, String> {
        match name {
            "+" | "-" | "*" | "/" | "mod" => arith(name, &args),
            "str.upper" => one_str(&args, str::to_uppercase),
            "str.lower" => one_str(&args, str::to_lowercase),
            "str.len" => {
                let s = text_arg(&args, 0)?;
                Ok(Value::Int(s.chars().count() as i64))
            }
            "str.concat" => {
                let mut out = String::new();
                for a in &args {
                    out.push_str(&a.to_string());
                }
                Ok(Value::Text(out))
            }
            "coalesce" => coalesce(&args, doc),
            other => Err(format!("unknown function {other:?}")),
        }
    }
}

fn arith(op: &str, args: &[Value]) -> Result<Value, String> {
    let [l, r] = args else {
        return Err(format!("{op} expects exactly two arguments"));
    };
    let (lf, rf) = (numeric(l)?, numeric(r)?);
    if let (Value::Int(a), Value::Int(b)) = (l, r) {
        return int_arith(op, *a, *b);
    }
    let result = match op {
        "+" => lf + rf,
        "-" => lf - rf,
        "*" => lf * rf,
        "/" => lf / rf,
        "mod" => lf % rf,
        _ => unreachable!(),
    };
    Ok(Value::Float(result))
}

fn int_arith(op: &str, a: i64, b: i64) -> Result<Value, String> {
    match op {
        "+" => Ok(Value::Int(a + b)),
        "-" => Ok(Value::Int(a - b)),
        "*" => Ok(Value::Int(a * b)),
        "/" => {
            if b == 0 {
                Err("division by zero".to_string())
            } else {
                Ok(Value::Int(a / b))
            }
        }
        "mod" => {
            if b == 0 {
                Err("division by zero".to_string())
            } else {
                Ok(Value::Int(a % b))
            }
        }
        _ => unreachable!(),
    }
}

fn numeric(v: &Value) -> Result<f64, String> {
    v.as_f64().ok_or_else(|| format!("{v} is not numeric"))
}

fn one_str(args: &[Value], f: impl Fn(&str) -> String) -> Result<Value, String> {
    let s = text_arg(args, 0)?;
    Ok(Value::Text(f(s)))
}

fn text_arg(args: &[Value], index: usize) -> Result<&str, String> {
    args.get(index)
        .and_then(Value::as_str)
        .ok_or_else(|| format!("argument {index} must be text"))
}

/// `coalesce(path1, path2, ...)`: reads `doc` directly rather than
/// returning a closure for the caller to apply later — the first listed
/// path present (and non-null) in `doc` wins.
fn coalesce(args: &[Value], doc: &Value) -> Result<Value, String> {
    for candidate in args {
        let dotted = candidate
            .as_str()
            .ok_or_else(|| "coalesce arguments must be textual paths".to_string())?;
        if let Some(v) = path::get(&path::parse(dotted), doc) {
            if !v.is_null() {
                return Ok(v.clone());
            }
        }
    }
    Ok(Value::Null)
}
