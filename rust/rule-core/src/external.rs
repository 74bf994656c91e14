//! Contracts for the collaborators this crate consumes but does not
//! implement: the rule registry's action appliers, the function library,
//! the topic matcher, the JSON codec, and the metrics sink.
//!
//! One trait per collaborator, implementors live in their own crates
//! (`rule-stdlib`, `rule-metrics`) so `rule-core` never depends on
//! `serde_json`, `regex`, or any particular metrics backend.

use crate::value::Value;
use std::sync::Arc;

/// Resolves and invokes a rule's bound actions.
pub trait ActionRegistry {
    fn get_action(&self, action_id: &str) -> Option<Arc<dyn ActionApplier>>;
}

/// A single action's applier closure.
pub trait ActionApplier: Send + Sync {
    fn apply(&self, projected: &Value, input: &Value) -> Result<Value, String>;
}

/// The function library rule authors call from `Arith` and `Call` nodes.
/// `doc` is always the document currently being evaluated, which lets a
/// function behave like a closure awaiting the current document without a
/// second return channel — see `DESIGN.md` for why this crate folds that
/// case in here rather than modeling `Value | UnaryOfDocument` explicitly.
pub trait FunctionLibrary {
    fn call(&self, name: &str, args: Vec<Value>, doc: &Value) -> Result<Value, String>;
}

/// The external topic-pattern matcher used only by the `=~` comparison
/// operator.
pub trait TopicMatcher {
    fn matches(&self, text: &str, pattern: &str) -> bool;
}

/// Opportunistic JSON decode used by `coerce::ensure_map`. Failure is the
/// caller's problem to swallow, not this trait's — `decode` simply returns
/// `None`.
pub trait JsonCodec {
    fn decode(&self, text: &str) -> Option<Value>;
}

/// Counters bumped by the dispatcher and driver: `rules.matched`,
/// `actions.success`, `actions.failure`. Implementations must never panic
/// or raise — metrics are best-effort.
pub trait MetricsSink: Send + Sync {
    fn inc(&self, id: &str, counter: &str);
}

/// A `MetricsSink` that records nothing, for tests and examples that don't
/// care about counters.
pub struct NullMetrics;

impl MetricsSink for NullMetrics {
    fn inc(&self, _id: &str, _counter: &str) {}
}
