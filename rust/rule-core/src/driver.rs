//! The rule driver: sequences the projector, predicate matcher, and action
//! dispatcher across a rule list for one input, with per-rule failure
//! isolation.

use crate::ast::{FieldEntry, Rule};
use crate::dispatch::dispatch;
use crate::error::RuleError;
use crate::eval::Context;
use crate::predicate::matches;
use crate::project::{collect, transform};
use crate::scratch::clear_rule_payload;
use crate::value::Value;
use indexmap::IndexMap;

/// Bundles the collaborators `apply_rules`/`apply_rule` need beyond the
/// `Context` already required by `eval`/`predicate`/`project`.
pub struct Driver<'a> {
    pub ctx: Context<'a>,
    pub registry: &'a dyn crate::external::ActionRegistry,
    pub metrics: &'a dyn crate::external::MetricsSink,
}

/// Drive `rules` against `input`. Disabled rules are skipped. Four named
/// error kinds
/// (`SelectAndTransform`/`SelectAndCollect`/`MatchConditions`/`MatchIncase`)
/// are logged as warnings and evaluation continues with the next rule;
/// anything else — including `TakeActionFailed`, which is never matched by
/// name here — is logged at error level with its `Debug` form as the stack
/// trace. The scratch cache is cleared unconditionally once every rule has
/// run, whether or not any of them failed.
pub fn apply_rules(rules: &[Rule], input: &Value, driver: &Driver) {
    for rule in rules {
        if !rule.enabled {
            continue;
        }
        let span = tracing::info_span!("apply_rule", rule_id = %rule.id);
        let _enter = span.enter();
        match apply_rule(rule, input, driver) {
            Ok(_outcome) => {}
            Err(err) if err.is_named_isolation_kind() => {
                tracing::warn!(rule_id = %rule.id, error = %err, "rule evaluation failed, skipping");
            }
            Err(err) => {
                tracing::error!(rule_id = %rule.id, error = %err, stack = ?err, "unrecovered rule failure");
            }
        }
    }
    clear_rule_payload();
}

/// Run a single rule against `input`, exposed separately from
/// `apply_rules` for targeted testing. `Ok(None)` means the rule's
/// conditions did not match `input`; `Ok(Some(results))` means they did,
/// whether or not any actions ended up firing. May return any of the
/// named error kinds — callers that want driver-style isolation should
/// use `apply_rules` instead.
pub fn apply_rule(
    rule: &Rule,
    input: &Value,
    driver: &Driver,
) -> Result<Option<Vec<Value>>, RuleError> {
    match &rule.foreach {
        None => apply_non_foreach(rule, input, driver),
        Some(spec) => apply_foreach(rule, spec, input, driver),
    }
}

fn apply_non_foreach(
    rule: &Rule,
    input: &Value,
    driver: &Driver,
) -> Result<Option<Vec<Value>>, RuleError> {
    let projected = transform(&rule.fields, input, &driver.ctx).map_err(|reason| {
        RuleError::SelectAndTransform {
            rule_id: rule.id.clone(),
            reason,
        }
    })?;
    let matched = matches(&rule.conditions, input, &driver.ctx).map_err(|reason| {
        RuleError::MatchConditions {
            rule_id: rule.id.clone(),
            reason,
        }
    })?;
    if !matched {
        return Ok(None);
    }
    driver.metrics.inc(&rule.id, "rules.matched");
    dispatch(
        &rule.id,
        &rule.actions,
        &projected,
        input,
        driver.registry,
        driver.metrics,
    )
    .map(Some)
}

fn apply_foreach(
    rule: &Rule,
    spec: &crate::ast::ForeachSpec,
    input: &Value,
    driver: &Driver,
) -> Result<Option<Vec<Value>>, RuleError> {
    let (selected, collection) = collect(&spec.fields, input, &driver.ctx).map_err(|reason| {
        RuleError::SelectAndCollect {
            rule_id: rule.id.clone(),
            reason,
        }
    })?;
    let outer = overlay(input, &selected);
    let matched = matches(&rule.conditions, &outer, &driver.ctx).map_err(|reason| {
        RuleError::MatchConditions {
            rule_id: rule.id.clone(),
            reason,
        }
    })?;
    if !matched {
        return Ok(None);
    }
    // The outer WHERE clause matching is independent of whether the
    // FOREACH collection itself turned out to hold any items: a non-list
    // (or otherwise uncoercible) collection field yields zero items and
    // must not bump `rules.matched`, regardless of `matched` above.
    if !collection.items.is_empty() {
        driver.metrics.inc(&rule.id, "rules.matched");
    }

    let mut results = Vec::new();
    for item in &collection.items {
        let per_item = overlay_key(input, &collection.key, item);

        let incase_passes = if is_empty_incase(&spec.incase) {
            true
        } else {
            matches(&spec.incase, &per_item, &driver.ctx).map_err(|reason| {
                RuleError::MatchIncase {
                    rule_id: rule.id.clone(),
                    reason,
                }
            })?
        };
        if !incase_passes {
            continue;
        }

        let doeach_projected = if spec.doeach.is_empty() {
            item.clone()
        } else {
            transform(&spec.doeach, &per_item, &driver.ctx).map_err(|reason| {
                RuleError::DoEach {
                    rule_id: rule.id.clone(),
                    reason,
                }
            })?
        };

        let mut item_results = dispatch(
            &rule.id,
            &rule.actions,
            &doeach_projected,
            input,
            driver.registry,
            driver.metrics,
        )?;
        results.append(&mut item_results);
    }
    Ok(Some(results))
}

/// Merges `selected` into `input` for the outer FOREACH predicate.
/// `selected`'s keys win on collision, matching the projector's own
/// wildcard-merge precedence (`project::merge_wildcard`).
fn overlay(input: &Value, selected: &Value) -> Value {
    let mut base = input.as_map().cloned().unwrap_or_default();
    if let Some(extra) = selected.as_map() {
        for (k, v) in extra {
            base.insert(k.clone(), v.clone());
        }
    }
    Value::Map(base)
}

/// Overlay `{key: item}` onto `input` for one FOREACH item's per-item
/// context.
fn overlay_key(input: &Value, key: &str, item: &Value) -> Value {
    let mut base = input.as_map().cloned().unwrap_or_default();
    base.insert(key.to_string(), item.clone());
    Value::Map(base)
}

/// An INCASE of `Predicate::True` is the "no INCASE supplied" case: an
/// empty DOEACH short-circuits to keep the item as-is, and an absent
/// INCASE generalizes the same way.
fn is_empty_incase(p: &crate::ast::Predicate) -> bool {
    matches!(p, crate::ast::Predicate::True)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{CmpOp, Expr, ForeachSpec, Predicate};
    use crate::external::{ActionApplier, ActionRegistry, FunctionLibrary, JsonCodec, MetricsSink, NullMetrics, TopicMatcher};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};

    struct Stub;
    impl FunctionLibrary for Stub {
        fn call(&self, name: &str, args: Vec<Value>, _doc: &Value) -> Result<Value, String> {
            match (name, args.as_slice()) {
                ("+", [Value::Int(a), Value::Int(b)]) => Ok(Value::Int(a + b)),
                _ => Err(format!("unknown function {name}")),
            }
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

    struct CollectingApplier(Arc<Mutex<Vec<Value>>>);
    impl ActionApplier for CollectingApplier {
        fn apply(&self, projected: &Value, _input: &Value) -> Result<Value, String> {
            self.0.lock().unwrap().push(projected.clone());
            Ok(projected.clone())
        }
    }

    struct FailingApplier;
    impl ActionApplier for FailingApplier {
        fn apply(&self, _projected: &Value, _input: &Value) -> Result<Value, String> {
            Err("boom".to_string())
        }
    }

    struct MapRegistry(HashMap<String, Arc<dyn ActionApplier>>);
    impl ActionRegistry for MapRegistry {
        fn get_action(&self, action_id: &str) -> Option<Arc<dyn ActionApplier>> {
            self.0.get(action_id).cloned()
        }
    }

    #[derive(Default)]
    struct CountingMetrics {
        counts: Mutex<HashMap<(String, String), u32>>,
    }
    impl MetricsSink for CountingMetrics {
        fn inc(&self, id: &str, counter: &str) {
            *self
                .counts
                .lock()
                .unwrap()
                .entry((id.to_string(), counter.to_string()))
                .or_insert(0) += 1;
        }
    }
    impl CountingMetrics {
        fn get(&self, id: &str, counter: &str) -> u32 {
            *self
                .counts
                .lock()
                .unwrap()
                .get(&(id.to_string(), counter.to_string()))
                .unwrap_or(&0)
        }
    }

    fn driver<'a>(
        registry: &'a dyn ActionRegistry,
        metrics: &'a dyn MetricsSink,
    ) -> Driver<'a> {
        static STUB: Stub = Stub;
        Driver {
            ctx: Context {
                functions: &STUB,
                topics: &STUB,
                json: &STUB,
            },
            registry,
            metrics,
        }
    }

    #[test]
    fn s1_simple_match() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut map: HashMap<String, Arc<dyn ActionApplier>> = HashMap::new();
        map.insert("notify".to_string(), Arc::new(CollectingApplier(seen.clone())));
        let registry = MapRegistry(map);
        let metrics = CountingMetrics::default();
        let d = driver(&registry, &metrics);

        let rule = Rule {
            id: "s1".to_string(),
            enabled: true,
            fields: vec![FieldEntry::Aliased(Expr::Var(vec!["a".to_string()]), "v".to_string())],
            conditions: Predicate::Cmp(CmpOp::Gt, Expr::Var(vec!["v".to_string()]), Expr::Const(Value::Int(2))),
            actions: vec![crate::ast::ActionBinding {
                action_id: "notify".to_string(),
            }],
            foreach: None,
        };
        let input = Value::map([("a".to_string(), Value::Int(3)), ("b".to_string(), Value::Text("x".into()))]);
        apply_rules(std::slice::from_ref(&rule), &input, &d);

        assert_eq!(metrics.get("s1", "rules.matched"), 1);
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].as_map().unwrap().get("v"), Some(&Value::Int(3)));
    }

    #[test]
    fn s4_foreach_with_incase() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut map: HashMap<String, Arc<dyn ActionApplier>> = HashMap::new();
        map.insert("notify".to_string(), Arc::new(CollectingApplier(seen.clone())));
        let registry = MapRegistry(map);
        let metrics = CountingMetrics::default();
        let d = driver(&registry, &metrics);

        let rule = Rule {
            id: "s4".to_string(),
            enabled: true,
            fields: vec![],
            conditions: Predicate::True,
            actions: vec![crate::ast::ActionBinding {
                action_id: "notify".to_string(),
            }],
            foreach: Some(ForeachSpec {
                fields: vec![FieldEntry::Aliased(Expr::Var(vec!["xs".to_string()]), "item".to_string())],
                incase: Predicate::Cmp(CmpOp::Ge, Expr::Var(vec!["item".to_string()]), Expr::Const(Value::Int(3))),
                doeach: vec![FieldEntry::Aliased(Expr::Var(vec!["item".to_string()]), "y".to_string())],
            }),
        };
        let input = Value::map([(
            "xs".to_string(),
            Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(3), Value::Int(4)]),
        )]);
        apply_rules(std::slice::from_ref(&rule), &input, &d);

        assert_eq!(metrics.get("s4", "rules.matched"), 1);
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].as_map().unwrap().get("y"), Some(&Value::Int(3)));
        assert_eq!(seen[1].as_map().unwrap().get("y"), Some(&Value::Int(4)));
    }

    #[test]
    fn foreach_over_non_list_yields_zero_items_and_no_match_metric() {
        let registry = MapRegistry(HashMap::new());
        let metrics = CountingMetrics::default();
        let d = driver(&registry, &metrics);

        let rule = Rule {
            id: "zero".to_string(),
            enabled: true,
            fields: vec![],
            conditions: Predicate::True,
            actions: vec![],
            foreach: Some(ForeachSpec {
                fields: vec![FieldEntry::Aliased(Expr::Var(vec!["n".to_string()]), "item".to_string())],
                incase: Predicate::True,
                doeach: vec![],
            }),
        };
        let input = Value::map([("n".to_string(), Value::Int(5))]);
        let result = apply_rule(&rule, &input, &d).unwrap();
        assert_eq!(result, Some(Vec::new()));
        assert_eq!(metrics.get("zero", "rules.matched"), 0);
    }

    #[test]
    fn s6_action_failure_does_not_abort_sibling_rules() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut map: HashMap<String, Arc<dyn ActionApplier>> = HashMap::new();
        map.insert("fails".to_string(), Arc::new(FailingApplier));
        map.insert("succeeds".to_string(), Arc::new(CollectingApplier(seen.clone())));
        let registry = MapRegistry(map);
        let metrics = CountingMetrics::default();
        let d = driver(&registry, &metrics);

        let rule_a = Rule {
            id: "a".to_string(),
            enabled: true,
            fields: vec![],
            conditions: Predicate::True,
            actions: vec![crate::ast::ActionBinding {
                action_id: "fails".to_string(),
            }],
            foreach: None,
        };
        let rule_b = Rule {
            id: "b".to_string(),
            enabled: true,
            fields: vec![],
            conditions: Predicate::True,
            actions: vec![crate::ast::ActionBinding {
                action_id: "succeeds".to_string(),
            }],
            foreach: None,
        };
        apply_rules(&[rule_a, rule_b], &Value::map([]), &d);

        assert_eq!(metrics.get("fails", "actions.failure"), 1);
        assert_eq!(metrics.get("succeeds", "actions.success"), 1);
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn error_isolation_allows_next_rule_to_run() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut map: HashMap<String, Arc<dyn ActionApplier>> = HashMap::new();
        map.insert("notify".to_string(), Arc::new(CollectingApplier(seen.clone())));
        let registry = MapRegistry(map);
        let metrics = CountingMetrics::default();
        let d = driver(&registry, &metrics);

        // Uncoercible comparison -> MatchConditions (a named isolation kind).
        let bad = Rule {
            id: "bad".to_string(),
            enabled: true,
            fields: vec![],
            conditions: Predicate::Cmp(
                CmpOp::Eq,
                Expr::Const(Value::Int(1)),
                Expr::Const(Value::Text("one".into())),
            ),
            actions: vec![],
            foreach: None,
        };
        let good = Rule {
            id: "good".to_string(),
            enabled: true,
            fields: vec![],
            conditions: Predicate::True,
            actions: vec![crate::ast::ActionBinding {
                action_id: "notify".to_string(),
            }],
            foreach: None,
        };
        apply_rules(&[bad, good], &Value::map([]), &d);

        assert_eq!(metrics.get("good", "rules.matched"), 1);
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn and_short_circuits_side_effecting_right_operand() {
        let calls = Arc::new(AtomicU32::new(0));

        struct CountingFn(Arc<AtomicU32>);
        impl FunctionLibrary for CountingFn {
            fn call(&self, name: &str, _args: Vec<Value>, _doc: &Value) -> Result<Value, String> {
                if name == "side_effect" {
                    self.0.fetch_add(1, Ordering::SeqCst);
                    Ok(Value::Bool(true))
                } else {
                    Err(format!("unknown function {name}"))
                }
            }
        }

        let f = CountingFn(calls.clone());
        let ctx = Context {
            functions: &f,
            topics: &Stub,
            json: &Stub,
        };
        let p = Predicate::And(
            Box::new(Predicate::Cmp(CmpOp::Eq, Expr::Const(Value::Bool(false)), Expr::Const(Value::Bool(true)))),
            Box::new(Predicate::Call("side_effect".to_string(), vec![])),
        );
        assert!(!matches(&p, &Value::Null, &ctx).unwrap());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
