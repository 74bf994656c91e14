//! The expression evaluator.
//!
//! `eval` and `predicate::matches` are mutually recursive — a `Case` without
//! a subject scans predicate-valued clause conditions, and a predicate's
//! `Cmp`/`In`/`Call` all evaluate expressions — so both live under one
//! crate and share a [`Context`] bundling the external collaborators they
//! need: the function library and the JSON codec (used only indirectly, by
//! the scratch cache, for `payload.*` reads).

use crate::ast::{Case, CaseCondition, Expr};
use crate::external::{FunctionLibrary, JsonCodec, TopicMatcher};
use crate::path;
use crate::predicate;
use crate::scratch;
use crate::value::Value;

/// Bundles the external collaborators the evaluator and predicate matcher
/// need for one call. Borrowed, not owned — callers typically construct
/// one `Context` per input and reuse it across every rule.
pub struct Context<'a> {
    pub functions: &'a dyn FunctionLibrary,
    pub topics: &'a dyn TopicMatcher,
    pub json: &'a dyn JsonCodec,
}

/// Evaluate `node` against `document`, producing a [`Value`]. Never panics;
/// failures from the function library surface as `Err(reason)` — the
/// caller (projector, predicate matcher, or the rule driver) decides which
/// named error kind that becomes.
pub fn eval(node: &Expr, document: &Value, ctx: &Context) -> Result<Value, String> {
    match node {
        Expr::Var(segments) => Ok(var_value(segments, document, ctx)),
        Expr::Const(v) => Ok(v.clone()),
        Expr::Arith(op, l, r) => {
            let l = eval(l, document, ctx)?;
            let r = eval(r, document, ctx)?;
            ctx.functions.call(op.function_name(), vec![l, r], document)
        }
        Expr::Case(case) => eval_case(case, document, ctx),
        Expr::Call(name, args) => {
            let args = args
                .iter()
                .map(|a| eval(a, document, ctx))
                .collect::<Result<Vec<_>, _>>()?;
            ctx.functions.call(name, args, document)
        }
    }
}

fn eval_case(case: &Case, document: &Value, ctx: &Context) -> Result<Value, String> {
    match &case.subject {
        None => {
            for (cond, body) in &case.clauses {
                let CaseCondition::Predicate(p) = cond else {
                    return Err("case clause condition/subject mismatch".to_string());
                };
                if predicate::matches(p, document, ctx)? {
                    return eval(body, document, ctx);
                }
            }
            eval_or_else(&case.or_else, document, ctx)
        }
        Some(subject) => {
            let subject_val = eval(subject, document, ctx)?;
            for (cond, body) in &case.clauses {
                let CaseCondition::Expr(e) = cond else {
                    return Err("case clause condition/subject mismatch".to_string());
                };
                let clause_val = eval(e, document, ctx)?;
                if clause_val == subject_val {
                    return eval(body, document, ctx);
                }
            }
            eval_or_else(&case.or_else, document, ctx)
        }
    }
}

fn eval_or_else(or_else: &Option<Box<Expr>>, document: &Value, ctx: &Context) -> Result<Value, String> {
    match or_else {
        Some(e) => eval(e, document, ctx),
        None => Ok(Value::Null),
    }
}

/// Read a `Var` path. Paths rooted at `payload` are served from the
/// per-input scratch cache — the decoded map is memoized there, not walked
/// fresh from the raw document each time — so repeated `payload.*` reads
/// within one input share a single decode. Returns an owned [`Value`]
/// (rather than a reference into `document`) because the payload-rooted
/// case reads through a cache-owned clone.
fn var_value(segments: &[String], document: &Value, ctx: &Context) -> Value {
    if segments.first().map(String::as_str) == Some("payload") {
        let raw_payload = path::get(&["payload".to_string()], document).cloned().unwrap_or(Value::Null);
        let decoded = scratch::payload_map(&raw_payload, ctx.json);
        let rest = &segments[1..];
        if rest.is_empty() {
            Value::Map(decoded)
        } else {
            path::get(rest, &Value::Map(decoded)).cloned().unwrap_or(Value::Null)
        }
    } else {
        path::get(segments, document).cloned().unwrap_or(Value::Null)
    }
}
