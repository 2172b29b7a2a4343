//! Declarative rule model.
//!
//! A rule is an ordered list of clauses, a combinator joining them, and the
//! actions to apply when the combinator is satisfied. Rules are loaded once
//! per run and treated as read-only; file order is rule priority.

use serde::{Deserialize, Serialize};

/// Which message field a clause tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Sender,
    Recipients,
    Subject,
    Date,
    Content,
}

impl Field {
    /// Short label for logging.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Sender => "sender",
            Self::Recipients => "recipients",
            Self::Subject => "subject",
            Self::Date => "date",
            Self::Content => "content",
        }
    }
}

/// Comparison applied to a field value.
///
/// `Before`/`After` are the ordering predicates and only make sense on
/// `Field::Date`; the evaluator rejects them on text fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    Contains,
    DoesNotContain,
    Equals,
    DoesNotEqual,
    Before,
    After,
}

impl Predicate {
    /// Short label for logging.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Contains => "contains",
            Self::DoesNotContain => "does_not_contain",
            Self::Equals => "equals",
            Self::DoesNotEqual => "does_not_equal",
            Self::Before => "before",
            Self::After => "after",
        }
    }
}

/// A single `{field, predicate, value}` test within a rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Clause {
    pub field: Field,
    pub predicate: Predicate,
    pub value: String,
}

/// Combinator joining a rule's clauses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    /// Conjunction: every clause must hold.
    #[default]
    All,
    /// Disjunction: at least one clause must hold.
    Any,
}

/// An abstract, idempotent mutation requested on a matched record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleAction {
    /// Remove the unread marker.
    MarkAsRead,
    /// Attach `destination`, a resolved label identifier, to the message.
    Move { destination: String },
}

impl RuleAction {
    /// Short label for logging.
    pub fn label(&self) -> &'static str {
        match self {
            Self::MarkAsRead => "mark_as_read",
            Self::Move { .. } => "move",
        }
    }
}

/// One declarative matching + action specification.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Rule {
    /// Diagnostic label shown in logs; optional.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Ordered clause list; never empty after loading.
    pub criteria: Vec<Clause>,
    /// How clauses combine; defaults to `All`.
    #[serde(default)]
    pub condition: Condition,
    /// Actions applied in declared order on a match.
    pub actions: Vec<RuleAction>,
}

impl Rule {
    /// Name for logs: the explicit name, or a positional fallback.
    pub fn display_name(&self, index: usize) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => format!("rule #{index}"),
        }
    }
}
