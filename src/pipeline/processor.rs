//! Run orchestration — pulls records, evaluates rules, dispatches actions,
//! and aggregates the caller-visible summary.
//!
//! Fatal errors (store access) surface before side effects begin; per-record
//! and per-action failures are recovered locally and counted.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::client::MailClient;
use crate::error::Error;
use crate::rules::dispatcher::{ActionDispatcher, ActionOutcome};
use crate::rules::engine;
use crate::rules::model::{Rule, RuleAction};
use crate::store::traits::RecordStore;

/// Caller-visible outcome of one processing run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub records_considered: usize,
    pub matched: usize,
    pub actions_attempted: usize,
    pub actions_failed: usize,
    /// Failed outcomes, retained for diagnostics.
    pub failures: Vec<ActionOutcome>,
}

/// Evaluates stored records against rules and applies matched actions.
pub struct RuleProcessor {
    store: Arc<dyn RecordStore>,
    dispatcher: ActionDispatcher,
}

impl RuleProcessor {
    pub fn new(store: Arc<dyn RecordStore>, client: Arc<dyn MailClient>) -> Self {
        let dispatcher = ActionDispatcher::new(client, Arc::clone(&store));
        Self { store, dispatcher }
    }

    /// One full run: query records, match, dispatch, summarize.
    ///
    /// The store is only read here; the dispatcher's mirror updates are the
    /// sole writes during a run.
    pub async fn run(&self, rules: &[Rule]) -> Result<RunSummary, Error> {
        let run_id = Uuid::new_v4();
        let records = self.store.query().await?;

        info!(
            run_id = %run_id,
            records = records.len(),
            rules = rules.len(),
            "Starting rule run"
        );

        let matches = engine::run(&records, rules);
        let mut summary = RunSummary {
            run_id,
            records_considered: records.len(),
            matched: matches.len(),
            actions_attempted: 0,
            actions_failed: 0,
            failures: Vec::new(),
        };

        for matched in &matches {
            info!(
                run_id = %run_id,
                record_id = matched.record.id,
                message_id = %matched.record.message_id,
                rule = %matched.rule.display_name(matched.rule_index),
                actions = matched.rule.actions.len(),
                "Applying actions"
            );

            let outcomes = self.dispatcher.apply(matched).await;
            summary.actions_attempted += outcomes.len();
            for outcome in outcomes {
                if outcome.failed() {
                    summary.actions_failed += 1;
                    summary.failures.push(outcome);
                }
            }
        }

        info!(
            run_id = %run_id,
            records = summary.records_considered,
            matched = summary.matched,
            actions = summary.actions_attempted,
            failed = summary.actions_failed,
            "Rule run complete"
        );
        Ok(summary)
    }
}

/// Resolve `move` destinations that are display names into label ids.
///
/// Runs once at startup, before any record processing, so a bad label name
/// fails the run before side effects. Values that already look like
/// identifiers (user label ids such as `Label_7`, or system labels such as
/// `SPAM`) pass through untouched.
pub async fn resolve_destinations(
    client: &dyn MailClient,
    mut rules: Vec<Rule>,
) -> Result<Vec<Rule>, Error> {
    for rule in &mut rules {
        for action in &mut rule.actions {
            if let RuleAction::Move { destination } = action
                && !looks_resolved(destination)
            {
                let resolved = client.resolve_label(destination).await?;
                info!(name = %destination, id = %resolved, "Resolved label");
                *destination = resolved;
            }
        }
    }
    Ok(rules)
}

/// User label ids are `Label_<n>`; system labels are SCREAMING_SNAKE.
fn looks_resolved(destination: &str) -> bool {
    destination.starts_with("Label_")
        || destination
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::error::ClientError;
    use crate::rules::model::{Clause, Condition, Field, Predicate};
    use crate::store::traits::NewEmailRecord;
    use crate::store::LibSqlStore;

    // ── Mock client ─────────────────────────────────────────────────

    #[derive(Default)]
    struct MockClient {
        calls: Mutex<Vec<String>>,
        fail_on: Option<String>,
    }

    impl MockClient {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl MailClient for MockClient {
        async fn mark_as_read(&self, message_id: &str) -> Result<(), ClientError> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("mark_as_read:{message_id}"));
            if self.fail_on.as_deref() == Some(message_id) {
                return Err(ClientError::Api {
                    status: 403,
                    message: "permission revoked".into(),
                });
            }
            Ok(())
        }

        async fn add_label(&self, message_id: &str, label_id: &str) -> Result<(), ClientError> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("add_label:{message_id}:{label_id}"));
            if self.fail_on.as_deref() == Some(message_id) {
                return Err(ClientError::Api {
                    status: 404,
                    message: "gone".into(),
                });
            }
            Ok(())
        }

        async fn resolve_label(&self, name: &str) -> Result<String, ClientError> {
            match name {
                "Receipts" => Ok("Label_99".into()),
                other => Err(ClientError::LabelNotFound(other.into())),
            }
        }
    }

    // ── Fixtures ────────────────────────────────────────────────────

    fn new_record(message_id: &str, sender: &str, subject: &str) -> NewEmailRecord {
        NewEmailRecord {
            message_id: message_id.into(),
            sender: sender.into(),
            recipients: "me@example.com".into(),
            subject: subject.into(),
            date: Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
            snippet: "body".into(),
            is_read: false,
            labels: vec!["INBOX".into(), "UNREAD".into()],
        }
    }

    fn invoice_rule(actions: Vec<RuleAction>) -> Rule {
        Rule {
            name: Some("invoices".into()),
            criteria: vec![Clause {
                field: Field::Subject,
                predicate: Predicate::Contains,
                value: "Invoice".into(),
            }],
            condition: Condition::All,
            actions,
        }
    }

    async fn seeded_store() -> Arc<LibSqlStore> {
        let store = LibSqlStore::new_memory().await.unwrap();
        store
            .insert_record(&new_record("g1", "a@x.com", "Invoice #1"))
            .await
            .unwrap();
        store
            .insert_record(&new_record("g2", "b@y.com", "Newsletter"))
            .await
            .unwrap();
        Arc::new(store)
    }

    // ── Tests ───────────────────────────────────────────────────────

    #[tokio::test]
    async fn example_scenario_marks_only_the_invoice() {
        let store = seeded_store().await;
        let client = Arc::new(MockClient::default());
        let processor = RuleProcessor::new(store.clone(), client.clone());

        let rules = vec![invoice_rule(vec![RuleAction::MarkAsRead])];
        let summary = processor.run(&rules).await.unwrap();

        assert_eq!(summary.records_considered, 2);
        assert_eq!(summary.matched, 1);
        assert_eq!(summary.actions_attempted, 1);
        assert_eq!(summary.actions_failed, 0);
        assert_eq!(client.calls(), vec!["mark_as_read:g1"]);

        // Mirror state updated for the match, untouched for the rest.
        let records = store.query().await.unwrap();
        assert!(records[0].is_read);
        assert!(!records[1].is_read);
    }

    #[tokio::test]
    async fn partial_failure_continues_with_later_records() {
        let store = LibSqlStore::new_memory().await.unwrap();
        store
            .insert_record(&new_record("g1", "a@x.com", "Invoice #1"))
            .await
            .unwrap();
        store
            .insert_record(&new_record("g2", "b@y.com", "Invoice #2"))
            .await
            .unwrap();
        let store = Arc::new(store);

        let client = Arc::new(MockClient {
            calls: Mutex::new(Vec::new()),
            fail_on: Some("g1".into()),
        });
        let processor = RuleProcessor::new(store.clone(), client.clone());

        let rules = vec![invoice_rule(vec![RuleAction::MarkAsRead])];
        let summary = processor.run(&rules).await.unwrap();

        assert_eq!(summary.matched, 2);
        assert_eq!(summary.actions_attempted, 2);
        assert_eq!(summary.actions_failed, 1);
        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].message_id, "g1");
        // The second record still received its action.
        assert!(client.calls().contains(&"mark_as_read:g2".to_string()));

        let records = store.query().await.unwrap();
        assert!(!records[0].is_read);
        assert!(records[1].is_read);
    }

    #[tokio::test]
    async fn no_rules_means_no_actions() {
        let store = seeded_store().await;
        let client = Arc::new(MockClient::default());
        let processor = RuleProcessor::new(store, client.clone());

        let summary = processor.run(&[]).await.unwrap();
        assert_eq!(summary.matched, 0);
        assert_eq!(summary.actions_attempted, 0);
        assert!(client.calls().is_empty());
    }

    #[tokio::test]
    async fn resolve_destinations_maps_display_names() {
        let client = MockClient::default();
        let rules = vec![invoice_rule(vec![RuleAction::Move {
            destination: "Receipts".into(),
        }])];

        let resolved = resolve_destinations(&client, rules).await.unwrap();
        assert_eq!(
            resolved[0].actions[0],
            RuleAction::Move {
                destination: "Label_99".into()
            }
        );
    }

    #[tokio::test]
    async fn resolve_destinations_passes_ids_through() {
        let client = MockClient::default();
        let rules = vec![invoice_rule(vec![
            RuleAction::Move {
                destination: "Label_7".into(),
            },
            RuleAction::Move {
                destination: "SPAM".into(),
            },
        ])];

        // Would fail with LabelNotFound if either hit the client.
        let resolved = resolve_destinations(&client, rules).await.unwrap();
        assert_eq!(resolved[0].actions.len(), 2);
    }

    #[tokio::test]
    async fn resolve_destinations_fails_fast_on_unknown_names() {
        let client = MockClient::default();
        let rules = vec![invoice_rule(vec![RuleAction::Move {
            destination: "No Such Folder".into(),
        }])];

        let err = resolve_destinations(&client, rules).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Client(ClientError::LabelNotFound(_))
        ));
    }
}
