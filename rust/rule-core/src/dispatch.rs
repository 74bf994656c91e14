//! The action dispatcher.

use crate::ast::ActionBinding;
use crate::error::RuleError;
use crate::external::{ActionRegistry, MetricsSink};
use crate::value::Value;

/// Invoke each of `rule_id`'s bound actions, in order, with `(projected,
/// input)`. Stops at the first failure: the failing action's failure is
/// counted and returned as [`RuleError::TakeActionFailed`], and later
/// actions in `actions` are not invoked. (Isolating one rule's failure from
/// its *sibling rules* is the rule driver's job, not this one's — see
/// `driver`.)
pub fn dispatch(
    rule_id: &str,
    actions: &[ActionBinding],
    projected: &Value,
    input: &Value,
    registry: &dyn ActionRegistry,
    metrics: &dyn MetricsSink,
) -> Result<Vec<Value>, RuleError> {
    let mut results = Vec::with_capacity(actions.len());
    for binding in actions {
        let applier = registry.get_action(&binding.action_id).ok_or_else(|| {
            metrics.inc(&binding.action_id, "actions.failure");
            RuleError::TakeActionFailed {
                rule_id: rule_id.to_string(),
                action_id: binding.action_id.clone(),
                reason: "no action registered for this id".to_string(),
            }
        })?;
        match applier.apply(projected, input) {
            Ok(v) => {
                metrics.inc(&binding.action_id, "actions.success");
                results.push(v);
            }
            Err(reason) => {
                metrics.inc(&binding.action_id, "actions.failure");
                return Err(RuleError::TakeActionFailed {
                    rule_id: rule_id.to_string(),
                    action_id: binding.action_id.clone(),
                    reason,
                });
            }
        }
    }
    Ok(results)
}
