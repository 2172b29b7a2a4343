//! Ingestion — fetch message metadata from the provider and persist
//! normalized records.
//!
//! Runs before rule processing and is the only writer of new records.
//! Per-message failures (missing or unparseable headers) are logged and
//! skipped; only listing/storage failures abort the pass.

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::client::gmail::{GmailClient, MessageMetadata, UNREAD_LABEL};
use crate::error::{Error, IngestError};
use crate::store::traits::{NewEmailRecord, RecordStore};

/// What to fetch.
#[derive(Debug, Clone)]
pub struct IngestQuery {
    /// Provider labels to list under (e.g. `INBOX`).
    pub label_ids: Vec<String>,
    pub max_results: u32,
}

/// Counts from one ingest pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// Message ids returned by the listing.
    pub listed: usize,
    /// Newly stored records.
    pub stored: usize,
    /// Already present (same provider message id).
    pub duplicates: usize,
    /// Skipped because fetch or normalization failed.
    pub skipped: usize,
}

/// Fetch up to `max_results` messages and store the new ones.
pub async fn ingest(
    client: &GmailClient,
    store: &dyn RecordStore,
    query: &IngestQuery,
) -> Result<IngestReport, Error> {
    let ids = client.list_messages(&query.label_ids, query.max_results).await?;
    let mut report = IngestReport {
        listed: ids.len(),
        ..Default::default()
    };

    for message_id in &ids {
        let metadata = match client.get_metadata(message_id).await {
            Ok(meta) => meta,
            Err(e) => {
                warn!(message_id = %message_id, error = %e, "Failed to fetch message; skipping");
                report.skipped += 1;
                continue;
            }
        };

        let record = match normalize(&metadata) {
            Ok(record) => record,
            Err(e) => {
                warn!(message_id = %message_id, error = %e, "Failed to normalize message; skipping");
                report.skipped += 1;
                continue;
            }
        };

        if store.insert_record(&record).await? {
            debug!(message_id = %message_id, "Stored message");
            report.stored += 1;
        } else {
            report.duplicates += 1;
        }
    }

    info!(
        listed = report.listed,
        stored = report.stored,
        duplicates = report.duplicates,
        skipped = report.skipped,
        "Ingest complete"
    );
    Ok(report)
}

/// Turn raw message metadata into a record.
///
/// Headers the provider omitted become empty strings, except `Date`, which
/// must parse: a record without a normalized timestamp is never stored.
pub fn normalize(metadata: &MessageMetadata) -> Result<NewEmailRecord, IngestError> {
    let date_header = metadata
        .header("Date")
        .ok_or_else(|| IngestError::MissingDate {
            message_id: metadata.id.clone(),
        })?;
    let date = parse_mail_date(date_header).ok_or_else(|| IngestError::UnparseableDate {
        message_id: metadata.id.clone(),
        value: date_header.to_string(),
    })?;

    Ok(NewEmailRecord {
        message_id: metadata.id.clone(),
        sender: metadata.header("From").unwrap_or_default().to_string(),
        recipients: metadata.header("To").unwrap_or_default().to_string(),
        subject: metadata.header("Subject").unwrap_or_default().to_string(),
        date,
        snippet: metadata.snippet.clone(),
        is_read: !metadata.label_ids.iter().any(|l| l == UNREAD_LABEL),
        labels: metadata.label_ids.clone(),
    })
}

/// Parse an email `Date` header into a UTC timestamp.
///
/// RFC 2822 is the wire format; some senders append a parenthesized zone
/// comment (`... +0000 (UTC)`) that chrono rejects, so that suffix is
/// stripped before a retry. RFC 3339 is accepted as a fallback.
pub fn parse_mail_date(value: &str) -> Option<DateTime<Utc>> {
    let trimmed = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc2822(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Some(open) = trimmed.rfind('(')
        && let Ok(dt) = DateTime::parse_from_rfc2822(trimmed[..open].trim())
    {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }
    None
}
