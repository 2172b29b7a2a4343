//! Rule file loading and shape validation.
//!
//! Rules live in a JSON array. Serde enforces the enumerated field,
//! predicate, and action sets (unknown names fail the whole load); the
//! checks here cover what the schema cannot express.

use std::path::Path;

use tracing::info;

use crate::error::ConfigError;
use crate::rules::model::{Rule, RuleAction};

/// Load rules from a JSON file, preserving file order.
///
/// File order is the tie-break priority used by the engine. Fails with
/// `ConfigError` if the file is absent, malformed, references an unknown
/// field/predicate/action, has a rule with empty `criteria`, or a `move`
/// action with an empty destination.
pub fn load_rules(path: &Path) -> Result<Vec<Rule>, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::RulesNotFound(path.to_path_buf()));
    }

    let raw = std::fs::read_to_string(path)?;
    let rules: Vec<Rule> = serde_json::from_str(&raw)
        .map_err(|e| ConfigError::Parse(format!("{}: {e}", path.display())))?;

    for (index, rule) in rules.iter().enumerate() {
        validate_rule(rule, index)?;
    }

    info!(count = rules.len(), path = %path.display(), "Rules loaded");
    Ok(rules)
}

/// Structural checks beyond the serde schema.
fn validate_rule(rule: &Rule, index: usize) -> Result<(), ConfigError> {
    let name = rule.display_name(index);

    if rule.criteria.is_empty() {
        return Err(ConfigError::InvalidRule {
            rule: name,
            message: "criteria must contain at least one clause".into(),
        });
    }

    for action in &rule.actions {
        if let RuleAction::Move { destination } = action
            && destination.trim().is_empty()
        {
            return Err(ConfigError::InvalidRule {
                rule: name,
                message: "move action requires a non-empty destination".into(),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;
    use crate::rules::model::{Condition, Field, Predicate};

    fn write_rules(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn loads_valid_rules_in_file_order() {
        let file = write_rules(
            r#"[
                {
                    "name": "invoices",
                    "criteria": [
                        {"field": "subject", "predicate": "contains", "value": "Invoice"}
                    ],
                    "actions": ["mark_as_read"]
                },
                {
                    "name": "newsletters",
                    "condition": "any",
                    "criteria": [
                        {"field": "sender", "predicate": "contains", "value": "newsletter"},
                        {"field": "content", "predicate": "contains", "value": "Unsubscribe"}
                    ],
                    "actions": [{"move": {"destination": "Label_7"}}]
                }
            ]"#,
        );

        let rules = load_rules(file.path()).unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].name.as_deref(), Some("invoices"));
        assert_eq!(rules[0].condition, Condition::All);
        assert_eq!(rules[1].name.as_deref(), Some("newsletters"));
        assert_eq!(rules[1].condition, Condition::Any);
        assert_eq!(rules[1].criteria[0].field, Field::Sender);
        assert_eq!(rules[1].criteria[1].predicate, Predicate::Contains);
    }

    #[test]
    fn missing_file_is_config_error() {
        let err = load_rules(Path::new("/nonexistent/rules.json")).unwrap_err();
        assert!(matches!(err, ConfigError::RulesNotFound(_)));
    }

    #[test]
    fn malformed_json_is_parse_error() {
        let file = write_rules("[{not json");
        let err = load_rules(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn unknown_predicate_fails_load() {
        let file = write_rules(
            r#"[{
                "criteria": [{"field": "subject", "predicate": "sounds_like", "value": "x"}],
                "actions": ["mark_as_read"]
            }]"#,
        );
        assert!(matches!(
            load_rules(file.path()).unwrap_err(),
            ConfigError::Parse(_)
        ));
    }

    #[test]
    fn empty_criteria_rejected() {
        let file = write_rules(
            r#"[{"name": "hollow", "criteria": [], "actions": ["mark_as_read"]}]"#,
        );
        let err = load_rules(file.path()).unwrap_err();
        match err {
            ConfigError::InvalidRule { rule, .. } => assert_eq!(rule, "hollow"),
            other => panic!("expected InvalidRule, got {other:?}"),
        }
    }

    #[test]
    fn empty_move_destination_rejected() {
        let file = write_rules(
            r#"[{
                "criteria": [{"field": "subject", "predicate": "contains", "value": "x"}],
                "actions": [{"move": {"destination": "  "}}]
            }]"#,
        );
        let err = load_rules(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidRule { .. }));
    }

    #[test]
    fn empty_rule_list_is_valid() {
        let file = write_rules("[]");
        assert!(load_rules(file.path()).unwrap().is_empty());
    }
}
