//! Reference implementations of `rule-core`'s external collaborator
//! traits: a function library, a topic matcher, a JSON codec, and an
//! in-memory action registry. None of these are required by `rule-core`
//! itself — a host may substitute its own.

pub mod actions;
pub mod functions;
pub mod json;
pub mod topic;

pub use actions::{ClosureApplier, InMemoryActionRegistry};
pub use functions::StdFunctionLibrary;
pub use json::SerdeJsonCodec;
pub use topic::MqttTopicMatcher;
