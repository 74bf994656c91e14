//! An in-memory action registry: actions registered by id, applied
//! directly in-process. A `HashMap` of id to a canned/closure response,
//! used by tests and the CLI demo rather than a production registry.

use rule_core::external::{ActionApplier, ActionRegistry};
use rule_core::value::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// An `ActionApplier` built from a plain closure, for registering actions
/// without defining a one-off type per action.
pub struct ClosureApplier<F>(pub F)
where
    F: Fn(&Value, &Value) -> Result<Value, String> + Send + Sync;

impl<F> ActionApplier for ClosureApplier<F>
where
    F: Fn(&Value, &Value) -> Result<Value, String> + Send + Sync,
{
    fn apply(&self, projected: &Value, input: &Value) -> Result<Value, String> {
        (self.0)(projected, input)
    }
}

#[derive(Default)]
pub struct InMemoryActionRegistry {
    actions: HashMap<String, Arc<dyn ActionApplier>>,
}

impl InMemoryActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, action_id: impl Into<String>, applier: Arc<dyn ActionApplier>) {
        self.actions.insert(action_id.into(), applier);
    }

    pub fn register_fn<F>(&mut self, action_id: impl Into<String>, f: F)
    where
        F: Fn(&Value, &Value) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.register(action_id, Arc::new(ClosureApplier(f)));
    }
}

impl ActionRegistry for InMemoryActionRegistry {
    fn get_action(&self, action_id: &str) -> Option<Arc<dyn ActionApplier>> {
        self.actions.get(action_id).cloned()
    }
}
