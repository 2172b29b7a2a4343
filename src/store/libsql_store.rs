//! libSQL backend — async `RecordStore` implementation.
//!
//! Supports local file and in-memory databases. The store has an explicit
//! lifecycle: opened at run start, `reset()` only when asked. Nothing
//! happens in `Drop`.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::info;

use crate::error::DatabaseError;
use crate::store::migrations;
use crate::store::traits::{EmailRecord, NewEmailRecord, RecordStore};

/// libSQL record store.
///
/// Holds a single connection reused for all operations;
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlStore {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlStore {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Open(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Open(format!("Failed to open libSQL database: {e}")))?;

        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Open(format!("Failed to create connection: {e}")))?;

        let store = Self {
            db: Arc::new(db),
            conn,
        };
        migrations::run_migrations(&store.conn).await?;
        info!(path = %path.display(), "Record store opened");
        Ok(store)
    }

    /// Create an in-memory store (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| DatabaseError::Open(format!("Failed to create in-memory database: {e}")))?;

        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Open(format!("Failed to create connection: {e}")))?;

        let store = Self {
            db: Arc::new(db),
            conn,
        };
        migrations::run_migrations(&store.conn).await?;
        Ok(store)
    }
}

// ── Row mapping ─────────────────────────────────────────────────────

/// Parse an RFC 3339 string from the DB; records are written with
/// `to_rfc3339()` so anything else indicates corruption.
fn parse_stored_date(s: &str) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DatabaseError::Serialization(format!("Bad stored date '{s}': {e}")))
}

fn row_to_record(row: &libsql::Row) -> Result<EmailRecord, DatabaseError> {
    let get_err = |e: libsql::Error| DatabaseError::Query(format!("Failed to read column: {e}"));

    let id: i64 = row.get(0).map_err(get_err)?;
    let message_id: String = row.get(1).map_err(get_err)?;
    let sender: String = row.get(2).map_err(get_err)?;
    let recipients: String = row.get(3).map_err(get_err)?;
    let subject: String = row.get(4).map_err(get_err)?;
    let date_str: String = row.get(5).map_err(get_err)?;
    let snippet: String = row.get(6).map_err(get_err)?;
    let is_read: i64 = row.get(7).map_err(get_err)?;
    let labels_str: String = row.get(8).map_err(get_err)?;

    let labels: Vec<String> = serde_json::from_str(&labels_str)
        .map_err(|e| DatabaseError::Serialization(format!("Bad labels column: {e}")))?;

    Ok(EmailRecord {
        id,
        message_id,
        sender,
        recipients,
        subject,
        date: parse_stored_date(&date_str)?,
        snippet,
        is_read: is_read != 0,
        labels,
    })
}

const RECORD_COLUMNS: &str =
    "id, message_id, sender, recipients, subject, date, snippet, is_read, labels";

#[async_trait]
impl RecordStore for LibSqlStore {
    async fn insert_record(&self, record: &NewEmailRecord) -> Result<bool, DatabaseError> {
        let labels = serde_json::to_string(&record.labels)
            .map_err(|e| DatabaseError::Serialization(format!("Failed to encode labels: {e}")))?;

        let affected = self
            .conn
            .execute(
                "INSERT OR IGNORE INTO emails
                    (message_id, sender, recipients, subject, date, snippet, is_read, labels)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    record.message_id.as_str(),
                    record.sender.as_str(),
                    record.recipients.as_str(),
                    record.subject.as_str(),
                    record.date.to_rfc3339(),
                    record.snippet.as_str(),
                    record.is_read as i64,
                    labels,
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("Failed to insert record: {e}")))?;

        Ok(affected > 0)
    }

    async fn query(&self) -> Result<Vec<EmailRecord>, DatabaseError> {
        let mut rows = self
            .conn
            .query(
                &format!("SELECT {RECORD_COLUMNS} FROM emails ORDER BY id"),
                (),
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("Failed to query records: {e}")))?;

        let mut records = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("Failed to read row: {e}")))?
        {
            records.push(row_to_record(&row)?);
        }
        Ok(records)
    }

    async fn mark_read(&self, id: i64) -> Result<(), DatabaseError> {
        let affected = self
            .conn
            .execute("UPDATE emails SET is_read = 1 WHERE id = ?1", params![id])
            .await
            .map_err(|e| DatabaseError::Query(format!("Failed to mark read: {e}")))?;

        if affected == 0 {
            return Err(DatabaseError::NotFound(id));
        }
        Ok(())
    }

    async fn add_label(&self, id: i64, label: &str) -> Result<(), DatabaseError> {
        let mut rows = self
            .conn
            .query("SELECT labels FROM emails WHERE id = ?1", params![id])
            .await
            .map_err(|e| DatabaseError::Query(format!("Failed to read labels: {e}")))?;

        let row = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("Failed to read labels row: {e}")))?
            .ok_or(DatabaseError::NotFound(id))?;

        let labels_str: String = row
            .get(0)
            .map_err(|e| DatabaseError::Query(format!("Failed to read labels column: {e}")))?;
        let mut labels: Vec<String> = serde_json::from_str(&labels_str)
            .map_err(|e| DatabaseError::Serialization(format!("Bad labels column: {e}")))?;

        if labels.iter().any(|l| l == label) {
            return Ok(());
        }
        labels.push(label.to_string());

        let encoded = serde_json::to_string(&labels)
            .map_err(|e| DatabaseError::Serialization(format!("Failed to encode labels: {e}")))?;
        self.conn
            .execute(
                "UPDATE emails SET labels = ?1 WHERE id = ?2",
                params![encoded, id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("Failed to update labels: {e}")))?;
        Ok(())
    }

    async fn reset(&self) -> Result<(), DatabaseError> {
        self.conn
            .execute("DELETE FROM emails", ())
            .await
            .map_err(|e| DatabaseError::Query(format!("Failed to reset store: {e}")))?;
        info!("Record store reset");
        Ok(())
    }
}
