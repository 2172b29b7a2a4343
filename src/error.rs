//! Error types for mailsweep.

use std::path::PathBuf;

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Mail client error: {0}")]
    Client(#[from] ClientError),

    #[error("Rule error: {0}")]
    Rule(#[from] RuleError),
}

/// Configuration-related errors. Fatal: surfaced before any side effect.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required configuration: {key}. {hint}")]
    MissingRequired { key: String, hint: String },

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Rules file not found: {0}")]
    RulesNotFound(PathBuf),

    #[error("Failed to parse rules file: {0}")]
    Parse(String),

    #[error("Invalid rule '{rule}': {message}")]
    InvalidRule { rule: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Rule evaluation errors.
///
/// A clause that errors is *indeterminate*: under `All` the rule cannot
/// match, under `Any` the remaining clauses are still consulted. The engine
/// logs these and continues with other rules — they never abort a run.
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    #[error("predicate '{predicate}' is not supported on field '{field}'")]
    UnsupportedPredicate { field: String, predicate: String },

    #[error("cannot interpret '{value}' as a date (expected RFC 3339 or YYYY-MM-DD)")]
    InvalidDateComparison { value: String },
}

/// Database-related errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Failed to open database: {0}")]
    Open(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Record not found: id {0}")]
    NotFound(i64),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Mail provider client errors.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Gmail API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("No label named '{0}' exists in this mailbox")]
    LabelNotFound(String),
}

/// Per-message ingestion errors. Handled locally: the offending message is
/// logged and skipped, never fatal to the ingest pass.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("message {message_id} has no Date header")]
    MissingDate { message_id: String },

    #[error("message {message_id} has an unparseable Date header: '{value}'")]
    UnparseableDate { message_id: String, value: String },
}

/// Result type alias for mailsweep.
pub type Result<T> = std::result::Result<T, Error>;
