use std::sync::Arc;

use mailsweep::client::{AuthConfig, GmailClient, MailClient, TokenProvider};
use mailsweep::config::AppConfig;
use mailsweep::pipeline::{self, IngestQuery, RuleProcessor};
use mailsweep::rules::load_rules;
use mailsweep::store::{LibSqlStore, RecordStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install rustls crypto provider before any TLS usage
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = AppConfig::from_env().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        std::process::exit(1);
    });

    let auth = AuthConfig::from_env().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        eprintln!("  export GMAIL_ACCESS_TOKEN=ya29...");
        eprintln!("  # or GMAIL_REFRESH_TOKEN + GMAIL_CLIENT_ID + GMAIL_CLIENT_SECRET");
        std::process::exit(1);
    });

    eprintln!("📬 mailsweep v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Rules: {}", config.rules_path.display());
    eprintln!("   Database: {}", config.db_path.display());
    eprintln!("   Source label: {}\n", config.source_label);

    // Rules load before anything touches the network or the store, so a bad
    // file halts the run with nothing partially applied.
    let rules = load_rules(&config.rules_path)?;

    let store: Arc<dyn RecordStore> = Arc::new(LibSqlStore::new_local(&config.db_path).await?);
    if config.reset_db {
        store.reset().await?;
        eprintln!("   Store reset (MAILSWEEP_RESET_DB)");
    }

    let http = reqwest::Client::new();
    let client = Arc::new(GmailClient::new(
        http.clone(),
        TokenProvider::new(http, auth),
    ));

    // Display names in move actions become label ids up front; an unknown
    // label fails here, before any record is processed.
    let rules = pipeline::resolve_destinations(client.as_ref(), rules).await?;

    let query = IngestQuery {
        label_ids: vec![config.source_label.clone()],
        max_results: config.max_results,
    };
    let report = pipeline::ingest(client.as_ref(), store.as_ref(), &query).await?;
    eprintln!(
        "   Ingested {} new message(s) ({} listed, {} duplicate, {} skipped)",
        report.stored, report.listed, report.duplicates, report.skipped
    );

    let processor = RuleProcessor::new(Arc::clone(&store), client as Arc<dyn MailClient>);
    let summary = processor.run(&rules).await?;

    eprintln!(
        "\n   Run {}: {} record(s), {} matched, {} action(s), {} failed",
        summary.run_id,
        summary.records_considered,
        summary.matched,
        summary.actions_attempted,
        summary.actions_failed
    );
    for failure in &summary.failures {
        eprintln!(
            "   failed: {} on message {}",
            failure.action, failure.message_id
        );
    }

    Ok(())
}
