//! An in-memory counter sink: `inc(id, counter)` bumps a `(id, counter)`
//! pair in a shared map. Kept as its own crate, not folded into
//! `rule-core`, so a host can swap in a real sink (Prometheus, a broker's
//! own stats subsystem, ...) without touching the evaluator.
//!
//! Scaled down to the three counters this domain names: `rules.matched`,
//! `actions.success`, `actions.failure`.

use rule_core::external::MetricsSink;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Debug, Default, Clone)]
pub struct InMemoryMetrics {
    counts: Arc<Mutex<HashMap<(String, String), u64>>>,
}

impl InMemoryMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value of `(id, counter)`, or zero if never incremented.
    pub fn get(&self, id: &str, counter: &str) -> u64 {
        self.counts
            .lock()
            .expect("metrics mutex poisoned")
            .get(&(id.to_string(), counter.to_string()))
            .copied()
            .unwrap_or(0)
    }

    /// A snapshot of every counter recorded so far, for printing or assertions.
    pub fn snapshot(&self) -> HashMap<(String, String), u64> {
        self.counts.lock().expect("metrics mutex poisoned").clone()
    }
}

impl MetricsSink for InMemoryMetrics {
    fn inc(&self, id: &str, counter: &str) {
        let mut counts = self.counts.lock().expect("metrics mutex poisoned");
        *counts.entry((id.to_string(), counter.to_string())).or_insert(0) += 1;
    }
}
