//! Runtime configuration, built from environment variables.

use std::path::PathBuf;

use crate::error::ConfigError;

/// Everything the binary needs besides OAuth credentials
/// (see `client::auth::AuthConfig` for those).
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Path to the JSON rules file.
    pub rules_path: PathBuf,
    /// Path to the record database.
    pub db_path: PathBuf,
    /// Provider label to ingest from.
    pub source_label: String,
    /// Maximum messages fetched per ingest pass.
    pub max_results: u32,
    /// Wipe stored records before ingesting.
    pub reset_db: bool,
}

impl AppConfig {
    /// Build from `MAILSWEEP_*` environment variables, with defaults for
    /// everything.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let rules_path = lookup("MAILSWEEP_RULES")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("rules.json"));

        let db_path = lookup("MAILSWEEP_DB")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./data/mailsweep.db"));

        let source_label = lookup("MAILSWEEP_SOURCE_LABEL").unwrap_or_else(|| "INBOX".into());

        let max_results = match lookup("MAILSWEEP_MAX_RESULTS") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
                key: "MAILSWEEP_MAX_RESULTS".into(),
                message: format!("expected a positive integer, got '{raw}'"),
            })?,
            None => 25,
        };

        let reset_db = lookup("MAILSWEEP_RESET_DB")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        Ok(Self {
            rules_path,
            db_path,
            source_label,
            max_results,
            reset_db,
        })
    }
}
