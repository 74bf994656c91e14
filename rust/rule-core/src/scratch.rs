//! The per-input `payload` scratch cache.
//!
//! A single-slot, thread-local cache: the first `payload.*` read within the
//! evaluation of one input decodes and normalizes the raw `payload` field
//! once; every subsequent read for that same input reuses the stored map.
//! `driver::apply_rules` clears the slot unconditionally when it finishes
//! with an input, whether that input's rules all ran cleanly or not.

use crate::coerce::ensure_map;
use crate::external::JsonCodec;
use crate::value::Value;
use indexmap::IndexMap;
use std::cell::RefCell;

thread_local! {
    static PAYLOAD: RefCell<Option<IndexMap<String, Value>>> = const { RefCell::new(None) };
}

/// Read the decoded `payload` map for the current input, populating the
/// slot from `raw_payload` on first access.
pub fn payload_map(raw_payload: &Value, codec: &dyn JsonCodec) -> IndexMap<String, Value> {
    PAYLOAD.with(|slot| {
        let mut slot = slot.borrow_mut();
        if let Some(map) = slot.as_ref() {
            return map.clone();
        }
        let map = ensure_map(raw_payload, codec);
        *slot = Some(map.clone());
        map
    })
}

/// Release the scratch cache. Idempotent; safe to call even if nothing was
/// ever cached.
pub fn clear_rule_payload() {
    PAYLOAD.with(|slot| {
        *slot.borrow_mut() = None;
    });
}
