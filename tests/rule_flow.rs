//! End-to-end run through the public API: rules loaded from a file,
//! records in a real (in-memory) store, actions dispatched against a mock
//! mail client.

use std::io::Write;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use tempfile::NamedTempFile;

use mailsweep::client::MailClient;
use mailsweep::error::ClientError;
use mailsweep::pipeline::{self, RuleProcessor};
use mailsweep::rules::load_rules;
use mailsweep::store::{LibSqlStore, NewEmailRecord, RecordStore};

// ── Mock mail client ────────────────────────────────────────────────

#[derive(Default)]
struct RecordingClient {
    calls: Mutex<Vec<String>>,
    fail_on: Option<String>,
}

impl RecordingClient {
    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn maybe_fail(&self, message_id: &str) -> Result<(), ClientError> {
        if self.fail_on.as_deref() == Some(message_id) {
            return Err(ClientError::Api {
                status: 404,
                message: "message no longer exists".into(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl MailClient for RecordingClient {
    async fn mark_as_read(&self, message_id: &str) -> Result<(), ClientError> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("mark_as_read:{message_id}"));
        self.maybe_fail(message_id)
    }

    async fn add_label(&self, message_id: &str, label_id: &str) -> Result<(), ClientError> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("add_label:{message_id}:{label_id}"));
        self.maybe_fail(message_id)
    }

    async fn resolve_label(&self, name: &str) -> Result<String, ClientError> {
        match name {
            "Receipts" => Ok("Label_31".into()),
            other => Err(ClientError::LabelNotFound(other.into())),
        }
    }
}

// ── Fixtures ────────────────────────────────────────────────────────

fn record(message_id: &str, sender: &str, subject: &str, snippet: &str) -> NewEmailRecord {
    NewEmailRecord {
        message_id: message_id.into(),
        sender: sender.into(),
        recipients: "me@example.com".into(),
        subject: subject.into(),
        date: Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
        snippet: snippet.into(),
        is_read: false,
        labels: vec!["INBOX".into(), "UNREAD".into()],
    }
}

async fn seeded_store() -> Arc<LibSqlStore> {
    let store = LibSqlStore::new_memory().await.unwrap();
    store
        .insert_record(&record(
            "g1",
            "billing@acme.com",
            "Invoice #42",
            "Your invoice is attached.",
        ))
        .await
        .unwrap();
    store
        .insert_record(&record(
            "g2",
            "friend@example.org",
            "Lunch tomorrow?",
            "Are you free around noon?",
        ))
        .await
        .unwrap();
    store
        .insert_record(&record(
            "g3",
            "updates@newsletter.shop",
            "Weekly deals",
            "Click here to unsubscribe.",
        ))
        .await
        .unwrap();
    Arc::new(store)
}

fn rules_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

const RULES: &str = r#"[
    {
        "name": "archive-invoices",
        "criteria": [
            {"field": "subject", "predicate": "contains", "value": "Invoice"},
            {"field": "sender", "predicate": "contains", "value": "@acme.com"}
        ],
        "actions": ["mark_as_read", {"move": {"destination": "Receipts"}}]
    },
    {
        "name": "mute-newsletters",
        "condition": "any",
        "criteria": [
            {"field": "sender", "predicate": "contains", "value": "newsletter"},
            {"field": "content", "predicate": "contains", "value": "unsubscribe"}
        ],
        "actions": ["mark_as_read"]
    }
]"#;

// ── Tests ───────────────────────────────────────────────────────────

#[tokio::test]
async fn full_run_applies_the_right_actions_to_the_right_records() {
    let file = rules_file(RULES);
    let rules = load_rules(file.path()).unwrap();

    let client = Arc::new(RecordingClient::default());
    let rules = pipeline::resolve_destinations(client.as_ref(), rules)
        .await
        .unwrap();

    let store = seeded_store().await;
    let processor = RuleProcessor::new(store.clone(), client.clone());
    let summary = processor.run(&rules).await.unwrap();

    assert_eq!(summary.records_considered, 3);
    assert_eq!(summary.matched, 2);
    assert_eq!(summary.actions_attempted, 3);
    assert_eq!(summary.actions_failed, 0);

    // Invoice got both actions with the destination resolved; the
    // newsletter only mark-as-read; the personal mail nothing.
    assert_eq!(
        client.calls(),
        vec![
            "mark_as_read:g1",
            "add_label:g1:Label_31",
            "mark_as_read:g3",
        ]
    );

    // Mirror state reflects the successful actions.
    let records = store.query().await.unwrap();
    assert!(records[0].is_read);
    assert!(records[0].labels.iter().any(|l| l == "Label_31"));
    assert!(!records[1].is_read);
    assert!(records[2].is_read);
}

#[tokio::test]
async fn one_record_failing_does_not_stop_the_rest() {
    let file = rules_file(RULES);
    let rules = load_rules(file.path()).unwrap();

    let client = Arc::new(RecordingClient {
        calls: Mutex::new(Vec::new()),
        fail_on: Some("g1".into()),
    });
    let rules = pipeline::resolve_destinations(client.as_ref(), rules)
        .await
        .unwrap();

    let store = seeded_store().await;
    let processor = RuleProcessor::new(store.clone(), client.clone());
    let summary = processor.run(&rules).await.unwrap();

    // Both of g1's actions fail; g3 still receives its action.
    assert_eq!(summary.matched, 2);
    assert_eq!(summary.actions_attempted, 3);
    assert_eq!(summary.actions_failed, 2);
    assert!(summary.failures.iter().all(|f| f.message_id == "g1"));
    assert!(client.calls().contains(&"mark_as_read:g3".to_string()));

    let records = store.query().await.unwrap();
    assert!(!records[0].is_read);
    assert!(records[2].is_read);
}

#[tokio::test]
async fn rerunning_after_success_is_idempotent() {
    let file = rules_file(RULES);
    let rules = load_rules(file.path()).unwrap();

    let client = Arc::new(RecordingClient::default());
    let rules = pipeline::resolve_destinations(client.as_ref(), rules)
        .await
        .unwrap();

    let store = seeded_store().await;
    let processor = RuleProcessor::new(store.clone(), client.clone());

    let first = processor.run(&rules).await.unwrap();
    let second = processor.run(&rules).await.unwrap();

    // Matching is on content, not read state, so both runs act; the
    // provider treats the repeats as no-op successes.
    assert_eq!(first.matched, second.matched);
    assert_eq!(second.actions_failed, 0);

    let records = store.query().await.unwrap();
    // The resolved label was appended once, not twice.
    assert_eq!(
        records[0].labels.iter().filter(|l| *l == "Label_31").count(),
        1
    );
}

#[tokio::test]
async fn unknown_move_destination_halts_before_any_side_effect() {
    let file = rules_file(
        r#"[{
            "name": "bad-destination",
            "criteria": [{"field": "subject", "predicate": "contains", "value": "Invoice"}],
            "actions": [{"move": {"destination": "No Such Folder"}}]
        }]"#,
    );
    let rules = load_rules(file.path()).unwrap();

    let client = Arc::new(RecordingClient::default());
    let result = pipeline::resolve_destinations(client.as_ref(), rules).await;

    assert!(result.is_err());
    assert!(client.calls().is_empty());
}
