//! Named error kinds. Each carries enough context for the rule driver's
//! per-rule failure isolation (see `driver`) to log something actionable,
//! and for callers of the single-rule test entry point (`apply_rule`) to
//! match on a specific kind rather than a string.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuleError {
    #[error("rule {rule_id}: select and transform failed: {reason}")]
    SelectAndTransform { rule_id: String, reason: String },

    #[error("rule {rule_id}: select and collect failed: {reason}")]
    SelectAndCollect { rule_id: String, reason: String },

    #[error("rule {rule_id}: match conditions failed: {reason}")]
    MatchConditions { rule_id: String, reason: String },

    #[error("rule {rule_id}: match incase failed: {reason}")]
    MatchIncase { rule_id: String, reason: String },

    #[error("rule {rule_id}: doeach failed: {reason}")]
    DoEach { rule_id: String, reason: String },

    #[error("rule {rule_id}: action {action_id} failed: {reason}")]
    TakeActionFailed {
        rule_id: String,
        action_id: String,
        reason: String,
    },

    #[error("coercion error: {0}")]
    Coercion(String),
}

impl RuleError {
    /// True for the kinds the rule driver treats as per-rule isolation
    /// failures (logged as a warning, evaluation continues with the next
    /// rule). `TakeActionFailed` is deliberately excluded — it is caught
    /// only by the driver's catch-all, not matched by name, since action
    /// failures are not recovered at this level.
    pub fn is_named_isolation_kind(&self) -> bool {
        matches!(
            self,
            RuleError::SelectAndTransform { .. }
                | RuleError::SelectAndCollect { .. }
                | RuleError::MatchConditions { .. }
                | RuleError::MatchIncase { .. }
        )
    }
}
