//! Rule engine — rules × records → an ordered list of matches.
//!
//! Pure with respect to its inputs: given identical records and rules the
//! output sequence is identical, in record-then-rule-priority order, and
//! neither input is mutated.

use tracing::{debug, warn};

use crate::rules::model::{Clause, Condition, Field, Rule};
use crate::rules::predicate::{self, FieldValue};
use crate::store::traits::EmailRecord;

/// A record matched by a rule. Transient; actions come from the rule.
#[derive(Debug, Clone, Copy)]
pub struct MatchResult<'a> {
    pub record: &'a EmailRecord,
    pub rule: &'a Rule,
    /// Load-order position of the rule, for logging and priority checks.
    pub rule_index: usize,
}

/// Evaluate every record against the rules in load order.
///
/// Per record, the first rule whose combinator is satisfied wins and the
/// remaining rules are skipped. Records with no matching rule emit nothing.
pub fn run<'a>(records: &'a [EmailRecord], rules: &'a [Rule]) -> Vec<MatchResult<'a>> {
    let mut matches = Vec::new();

    for record in records {
        for (rule_index, rule) in rules.iter().enumerate() {
            if rule_matches(record, rule, rule_index) {
                debug!(
                    record_id = record.id,
                    message_id = %record.message_id,
                    rule = %rule.display_name(rule_index),
                    "Record matched rule"
                );
                matches.push(MatchResult {
                    record,
                    rule,
                    rule_index,
                });
                break;
            }
        }
    }

    matches
}

/// Combine the rule's clause results per its condition.
///
/// An erroring clause is indeterminate: under `All` it forces non-match
/// (and evaluation of that rule stops), under `Any` it is skipped and the
/// remaining clauses may still produce a match. Either way the error is
/// logged and isolated to the offending rule.
fn rule_matches(record: &EmailRecord, rule: &Rule, rule_index: usize) -> bool {
    match rule.condition {
        Condition::All => {
            for clause in &rule.criteria {
                match eval_clause(record, clause) {
                    Ok(true) => {}
                    Ok(false) => return false,
                    Err(e) => {
                        log_clause_error(rule, rule_index, clause, &e);
                        return false;
                    }
                }
            }
            true
        }
        Condition::Any => {
            for clause in &rule.criteria {
                match eval_clause(record, clause) {
                    Ok(true) => return true,
                    Ok(false) => {}
                    Err(e) => log_clause_error(rule, rule_index, clause, &e),
                }
            }
            false
        }
    }
}

/// Evaluate one clause against the record's corresponding field.
fn eval_clause(record: &EmailRecord, clause: &Clause) -> Result<bool, crate::error::RuleError> {
    let value = match clause.field {
        Field::Sender => FieldValue::Text(&record.sender),
        Field::Recipients => FieldValue::Text(&record.recipients),
        Field::Subject => FieldValue::Text(&record.subject),
        Field::Content => FieldValue::Text(&record.snippet),
        Field::Date => FieldValue::Timestamp(record.date),
    };
    predicate::evaluate(value, clause.predicate, &clause.value)
}

fn log_clause_error(
    rule: &Rule,
    rule_index: usize,
    clause: &Clause,
    error: &crate::error::RuleError,
) {
    warn!(
        rule = %rule.display_name(rule_index),
        field = clause.field.label(),
        predicate = clause.predicate.label(),
        error = %error,
        "Clause evaluation failed; treating as indeterminate"
    );
}
