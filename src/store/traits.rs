//! `RecordStore` trait — async interface for the email record store.
//!
//! The store is written by ingestion and read by the rule run. During a run
//! the only writes are the provider-state mirror updates (`mark_read`,
//! `add_label`) issued after a successful action.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::DatabaseError;

/// One persisted message summary.
///
/// Created once at ingestion and immutable afterwards, except for `is_read`
/// and `labels`, which mirror provider-side state and are updated after a
/// successful action.
#[derive(Debug, Clone, PartialEq)]
pub struct EmailRecord {
    /// Store-assigned id, monotonic per insertion order.
    pub id: i64,
    /// Provider-native message id; unique, immutable.
    pub message_id: String,
    pub sender: String,
    pub recipients: String,
    pub subject: String,
    /// Parsed receive timestamp; never raw header text.
    pub date: DateTime<Utc>,
    /// Body snippet; the default text-search field.
    pub snippet: String,
    pub is_read: bool,
    pub labels: Vec<String>,
}

/// A record as produced by ingestion, before the store assigns an id.
#[derive(Debug, Clone)]
pub struct NewEmailRecord {
    pub message_id: String,
    pub sender: String,
    pub recipients: String,
    pub subject: String,
    pub date: DateTime<Utc>,
    pub snippet: String,
    pub is_read: bool,
    pub labels: Vec<String>,
}

/// Backend-agnostic record store.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert a record, deduplicated on `message_id`.
    ///
    /// Returns `true` if the record was stored, `false` if a record with the
    /// same `message_id` already existed.
    async fn insert_record(&self, record: &NewEmailRecord) -> Result<bool, DatabaseError>;

    /// All records in insertion order.
    async fn query(&self) -> Result<Vec<EmailRecord>, DatabaseError>;

    /// Mirror a successful mark-as-read: clear the unread flag.
    async fn mark_read(&self, id: i64) -> Result<(), DatabaseError>;

    /// Mirror a successful move: attach `label` if not already present.
    async fn add_label(&self, id: i64, label: &str) -> Result<(), DatabaseError>;

    /// Administrative wipe of all stored records.
    ///
    /// Never called implicitly; the binary invokes it only when explicitly
    /// asked to reset between runs.
    async fn reset(&self) -> Result<(), DatabaseError>;
}
