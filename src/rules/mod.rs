//! Declarative rules — model, loading, evaluation, and action dispatch.
//!
//! A run flows: `loader::load_rules()` → `engine::run()` over the stored
//! records → `ActionDispatcher::apply()` per match. Load failures are fatal
//! before any side effect; evaluation and dispatch failures are isolated to
//! the offending rule or action.

pub mod dispatcher;
pub mod engine;
pub mod loader;
pub mod model;
pub mod predicate;

pub use dispatcher::{ActionDispatcher, ActionOutcome, ActionStatus};
pub use engine::MatchResult;
pub use loader::load_rules;
pub use model::{Clause, Condition, Field, Predicate, Rule, RuleAction};
