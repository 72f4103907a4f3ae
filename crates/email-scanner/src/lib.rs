//! Contact reconciliation toolkit: scan a Gmail inbox incrementally, classify
//! unseen senders with a hosted model, and keep a Google Sheet contact list
//! up to date, including unsubscribe handling.

pub mod classifier;
pub mod config;
pub mod csv_import;
pub mod engine;
pub mod gmail;
pub mod review;
pub mod scan_state;
pub mod sheets;
pub mod source;
pub mod store;

#[cfg(test)]
mod testutil;

use anyhow::Result;
use shared_types::{ScanReport, TokenGenerator};

/// Wire up the concrete Gmail / Claude / Sheets adapters from configuration
/// and run one scan pass. Used by the CLI and the cron endpoint.
pub async fn run_configured_scan(config: &config::Config, dry_run: bool) -> Result<ScanReport> {
    let tokens = TokenGenerator::new(config.secrets.unsubscribe_secret()?);
    let contacts = sheets::SheetContactStore::with_installed_flow(
        &config.credentials_path,
        &config.token_cache_path,
        config.secrets.sheet_id()?,
        tokens,
    )
    .await?;
    let mail = gmail::GmailSource::new(&config.credentials_path, &config.token_cache_path).await?;
    let classifier = classifier::ClaudeClassifier::new(
        config.secrets.anthropic_api_key()?,
        &config.classifier_model,
        &config.business,
    );

    let engine = engine::ScanEngine::new(
        &mail,
        &classifier,
        &contacts,
        scan_state::ScanStateStore::new(config.scan_state_path()),
        review::ReviewQueue::new(config.review_queue_path()),
        engine::ScanOptions::from_config(config),
    );

    engine.run(dry_run).await
}
