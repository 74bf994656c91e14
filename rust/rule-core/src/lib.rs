//! The rule evaluation runtime: an expression evaluator, predicate matcher,
//! SELECT/FOREACH projector, and per-input rule driver for a message-broker
//! rule engine. Everything outside this crate — the SQL parser that
//! produces the AST, the rule registry, the function library, the metrics
//! sink, the logger, the JSON codec, and the topic-pattern matcher — is
//! consumed only through the traits in [`external`]; reference
//! implementations live in the sibling `rule-stdlib` and `rule-metrics`
//! crates.

pub mod ast;
pub mod coerce;
pub mod dispatch;
pub mod driver;
pub mod error;
pub mod eval;
pub mod external;
pub mod path;
pub mod predicate;
pub mod project;
pub mod scratch;
pub mod value;

pub use ast::{
    ActionBinding, ArithOp, Case, CaseCondition, CmpOp, Expr, FieldEntry, ForeachSpec, Predicate,
    Rule,
};
pub use driver::{apply_rule, apply_rules, Driver};
pub use error::RuleError;
pub use eval::{eval, Context};
pub use external::{
    ActionApplier, ActionRegistry, FunctionLibrary, JsonCodec, MetricsSink, NullMetrics,
    TopicMatcher,
};
pub use predicate::matches;
pub use project::{collect, transform, Collection};
pub use scratch::clear_rule_payload;
pub use value::Value;
