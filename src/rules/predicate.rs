//! Predicate evaluation — a pure, total function over the predicate set.
//!
//! Unknown (field, predicate) combinations fail loudly with a `RuleError`
//! instead of silently evaluating to false. The engine decides what an
//! erroring clause means for the enclosing rule.

use chrono::{DateTime, NaiveDate, Utc};

use crate::error::RuleError;
use crate::rules::model::Predicate;

/// A record field value handed to the evaluator.
///
/// Text fields compare as case-sensitive strings; the date field compares
/// as a normalized timestamp, never as its string representation.
#[derive(Debug, Clone, Copy)]
pub enum FieldValue<'a> {
    Text(&'a str),
    Timestamp(DateTime<Utc>),
}

/// Evaluate one predicate against a field value.
pub fn evaluate(
    value: FieldValue<'_>,
    predicate: Predicate,
    comparison: &str,
) -> Result<bool, RuleError> {
    match (value, predicate) {
        (FieldValue::Text(text), Predicate::Contains) => Ok(text.contains(comparison)),
        (FieldValue::Text(text), Predicate::DoesNotContain) => Ok(!text.contains(comparison)),
        (FieldValue::Text(text), Predicate::Equals) => Ok(text == comparison),
        (FieldValue::Text(text), Predicate::DoesNotEqual) => Ok(text != comparison),
        (FieldValue::Text(_), Predicate::Before | Predicate::After) => {
            Err(RuleError::UnsupportedPredicate {
                field: "text".into(),
                predicate: predicate.label().into(),
            })
        }

        (FieldValue::Timestamp(ts), Predicate::Equals) => {
            Ok(ts == parse_date_comparison(comparison)?)
        }
        (FieldValue::Timestamp(ts), Predicate::DoesNotEqual) => {
            Ok(ts != parse_date_comparison(comparison)?)
        }
        (FieldValue::Timestamp(ts), Predicate::Before) => {
            Ok(ts < parse_date_comparison(comparison)?)
        }
        (FieldValue::Timestamp(ts), Predicate::After) => {
            Ok(ts > parse_date_comparison(comparison)?)
        }
        (FieldValue::Timestamp(_), Predicate::Contains | Predicate::DoesNotContain) => {
            Err(RuleError::UnsupportedPredicate {
                field: "date".into(),
                predicate: predicate.label().into(),
            })
        }
    }
}

/// Parse a comparison value for date predicates.
///
/// Accepts RFC 3339 timestamps and bare `YYYY-MM-DD` dates; a bare date
/// means midnight UTC.
fn parse_date_comparison(value: &str) -> Result<DateTime<Utc>, RuleError> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(ts.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        && let Some(midnight) = date.and_hms_opt(0, 0, 0)
    {
        return Ok(midnight.and_utc());
    }
    Err(RuleError::InvalidDateComparison {
        value: value.into(),
    })
}
