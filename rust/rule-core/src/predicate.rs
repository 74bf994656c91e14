//! The predicate matcher.

use crate::ast::{CmpOp, Expr, Predicate};
use crate::coerce::number;
use crate::eval::{eval, Context};
use crate::value::Value;

/// Evaluate `predicate` against `document`.
pub fn matches(predicate: &Predicate, document: &Value, ctx: &Context) -> Result<bool, String> {
    match predicate {
        Predicate::And(l, r) => Ok(matches(l, document, ctx)? && matches(r, document, ctx)?),
        Predicate::Or(l, r) => Ok(matches(l, document, ctx)? || matches(r, document, ctx)?),
        Predicate::Not(x) => {
            // Any non-boolean result from X causes the whole `Not` to yield
            // false — deliberately, authors must produce a boolean to
            // participate in negation.
            match eval(x, document, ctx)? {
                Value::Bool(b) => Ok(!b),
                _ => Ok(false),
            }
        }
        Predicate::In(x, list) => {
            let needle = eval(x, document, ctx)?;
            for member in list {
                if eval(member, document, ctx)? == needle {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        Predicate::Call(name, args) => {
            let args = args
                .iter()
                .map(|a| eval(a, document, ctx))
                .collect::<Result<Vec<_>, _>>()?;
            match ctx.functions.call(name, args, document)? {
                Value::Bool(b) => Ok(b),
                // Non-boolean call results used as a predicate fail closed.
                _ => Ok(false),
            }
        }
        Predicate::Cmp(op, l, r) => {
            let l = eval(l, document, ctx)?;
            let r = eval(r, document, ctx)?;
            compare(*op, l, r, ctx)
        }
        Predicate::True => Ok(true),
    }
}

/// Cross-type coercion followed by the operator's semantics.
fn compare(op: CmpOp, l: Value, r: Value, ctx: &Context) -> Result<bool, String> {
    if op == CmpOp::TopicMatch {
        let (Value::Text(text) | Value::Atom(text)) = &l else {
            return Err("=~ requires a textual left-hand operand".to_string());
        };
        let (Value::Text(pattern) | Value::Atom(pattern)) = &r else {
            return Err("=~ requires a textual pattern".to_string());
        };
        return Ok(ctx.topics.matches(text, pattern));
    }

    let (l, r) = coerce_pair(l, r)?;

    let ordering = l.partial_cmp(&r);
    Ok(match op {
        CmpOp::Eq => l == r,
        CmpOp::Ne => l != r,
        CmpOp::Gt => ordering == Some(std::cmp::Ordering::Greater),
        CmpOp::Lt => ordering == Some(std::cmp::Ordering::Less),
        CmpOp::Ge => matches!(
            ordering,
            Some(std::cmp::Ordering::Greater) | Some(std::cmp::Ordering::Equal)
        ),
        CmpOp::Le => matches!(
            ordering,
            Some(std::cmp::Ordering::Less) | Some(std::cmp::Ordering::Equal)
        ),
        CmpOp::TopicMatch => unreachable!("handled above"),
    })
}

/// Applies the two coercion rules in order: numeric/textual pairs coerce
/// the textual side via `number`; atom/textual pairs coerce the atom to
/// text. Anything else is compared as-is.
fn coerce_pair(l: Value, r: Value) -> Result<(Value, Value), String> {
    match (&l, &r) {
        (Value::Int(_) | Value::Float(_), Value::Text(t)) => {
            Ok((l, number(t).map_err(|e| e.to_string())?))
        }
        (Value::Text(t), Value::Int(_) | Value::Float(_)) => {
            Ok((number(t).map_err(|e| e.to_string())?, r))
        }
        (Value::Atom(a), Value::Text(_)) => Ok((Value::Text(a.clone()), r)),
        (Value::Text(_), Value::Atom(a)) => Ok((l, Value::Text(a.clone()))),
        _ => Ok((l, r)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::{FunctionLibrary, JsonCodec, TopicMatcher};

    struct Stub;
    impl FunctionLibrary for Stub {
        fn call(&self, name: &str, args: Vec<Value>, _doc: &Value) -> Result<Value, String> {
            match (name, args.as_slice()) {
                ("fails_closed", _) => Ok(Value::Text("not a bool".into())),
                ("is_even", [Value::Int(n)]) => Ok(Value::Bool(n % 2 == 0)),
                _ => Err(format!("unknown function {name}")),
            }
        }
    }
    impl TopicMatcher for Stub {
        fn matches(&self, text: &str, pattern: &str) -> bool {
            text == pattern
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
    fn true_predicate_always_matches() {
        assert!(matches(&Predicate::True, &Value::Null, &ctx()).unwrap());
    }

    #[test]
    fn numeric_text_coercion_in_eq() {
        let p = Predicate::Cmp(CmpOp::Eq, Expr::Const(Value::Int(5)), Expr::Const(Value::Text("5".into())));
        assert!(matches(&p, &Value::Null, &ctx()).unwrap());
    }

    #[test]
    fn uncoercible_text_fails() {
        let p = Predicate::Cmp(CmpOp::Eq, Expr::Const(Value::Int(5)), Expr::Const(Value::Text("five".into())));
        assert!(matches(&p, &Value::Null, &ctx()).is_err());
    }

    #[test]
    fn not_of_non_boolean_is_false() {
        let p = Predicate::Not(Box::new(Expr::Const(Value::Text("maybe".into()))));
        assert!(!matches(&p, &Value::Null, &ctx()).unwrap());
    }

    #[test]
    fn not_of_boolean_negates() {
        let p = Predicate::Not(Box::new(Expr::Const(Value::Bool(false))));
        assert!(matches(&p, &Value::Null, &ctx()).unwrap());
    }

    #[test]
    fn and_short_circuits() {
        // A right side that would error must never be evaluated.
        let p = Predicate::And(
            Box::new(Predicate::Cmp(CmpOp::Eq, Expr::Const(Value::Bool(false)), Expr::Const(Value::Bool(true)))),
            Box::new(Predicate::Call("boom".to_string(), vec![])),
        );
        assert!(!matches(&p, &Value::Null, &ctx()).unwrap());
    }

    #[test]
    fn call_as_predicate_non_bool_fails_closed() {
        let p = Predicate::Call("fails_closed".to_string(), vec![]);
        assert!(!matches(&p, &Value::Null, &ctx()).unwrap());
    }

    #[test]
    fn call_as_predicate_bool_passes_through() {
        let p = Predicate::Call("is_even".to_string(), vec![Expr::Const(Value::Int(4))]);
        assert!(matches(&p, &Value::Null, &ctx()).unwrap());
    }

    #[test]
    fn in_membership_by_value_equality() {
        let p = Predicate::In(
            Expr::Const(Value::Int(2)),
            vec![Expr::Const(Value::Int(1)), Expr::Const(Value::Int(2))],
        );
        assert!(matches(&p, &Value::Null, &ctx()).unwrap());
    }

    #[test]
    fn topic_match_delegates_to_matcher() {
        let p = Predicate::Cmp(
            CmpOp::TopicMatch,
            Expr::Const(Value::Text("a/b".into())),
            Expr::Const(Value::Text("a/b".into())),
        );
        assert!(matches(&p, &Value::Null, &ctx()).unwrap());
    }

    #[test]
    fn atom_text_coercion_in_eq() {
        let p = Predicate::Cmp(CmpOp::Eq, Expr::Const(Value::Atom("x".into())), Expr::Const(Value::Text("x".into())));
        assert!(matches(&p, &Value::Null, &ctx()).unwrap());
    }
}
