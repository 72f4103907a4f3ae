//! The reconciliation workflow: pull new mail, classify unseen senders,
//! apply idempotent updates to the contact list, then sweep for unsubscribe
//! requests.
//!
//! Scan state is committed once, after the whole pass, and only when at least
//! one message completed without error; an aborted or empty pass never moves
//! the watermark. Dry runs make every read and every decision but suppress
//! all writes.

use anyhow::{Context, Result};
use chrono::Utc;
use std::collections::HashSet;

use crate::classifier::Classifier;
use crate::config::Config;
use crate::review::ReviewQueue;
use crate::scan_state::{commit_state, ObservedMessage, ScanStateStore};
use crate::source::{build_scan_query, build_unsubscribe_query, MailSource};
use crate::store::ContactStore;
use shared_types::unsubscribe::is_unsubscribe_request;
use shared_types::{
    Confidence, ContactSource, ContactStatus, NewContact, ReviewEntry, ScanReport,
};

/// Engine knobs, extracted from [`Config`] so tests can build them directly.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub max_scan_results: u32,
    pub max_unsubscribe_results: u32,
    pub exclude_query_parts: Vec<String>,
    /// Substrings identifying the business's own addresses; outgoing mail
    /// must never be mistaken for an unsubscribe request.
    pub own_addresses: Vec<String>,
}

impl ScanOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_scan_results: config.max_scan_results,
            max_unsubscribe_results: config.max_unsubscribe_results,
            exclude_query_parts: config.exclude_query_parts.clone(),
            own_addresses: config.business.own_addresses.clone(),
        }
    }
}

pub struct ScanEngine<'a, M, C, S> {
    mail: &'a M,
    classifier: &'a C,
    contacts: &'a S,
    state: ScanStateStore,
    review: ReviewQueue,
    options: ScanOptions,
}

impl<'a, M, C, S> ScanEngine<'a, M, C, S>
where
    M: MailSource,
    C: Classifier,
    S: ContactStore,
{
    pub fn new(
        mail: &'a M,
        classifier: &'a C,
        contacts: &'a S,
        state: ScanStateStore,
        review: ReviewQueue,
        options: ScanOptions,
    ) -> Self {
        Self {
            mail,
            classifier,
            contacts,
            state,
            review,
            options,
        }
    }

    /// Run one full pass. With `dry_run` every decision is made identically
    /// but nothing is written anywhere.
    pub async fn run(&self, dry_run: bool) -> Result<ScanReport> {
        let previous = self.state.load()?;
        let watermark = previous.last_scan;

        let existing = self
            .contacts
            .list_all()
            .await
            .context("Failed to load existing contacts")?;
        let mut known: HashSet<String> = existing.iter().map(|c| c.email_key()).collect();
        tracing::info!("{} contacts already in the list", known.len());

        let query = build_scan_query(&self.options.exclude_query_parts, watermark);
        tracing::debug!(query = %query, "scan query");

        let refs = self
            .mail
            .search(&query, self.options.max_scan_results)
            .await
            .context("Failed to search mail source")?;
        tracing::info!("{} messages matched the scan query", refs.len());

        let processed = previous.processed_set();
        let mut report = ScanReport {
            dry_run,
            ..Default::default()
        };
        let mut observed: Vec<ObservedMessage> = Vec::new();
        let mut clean_messages = 0usize;
        let mut pending_review: Vec<ReviewEntry> = Vec::new();

        for message_ref in &refs {
            if processed.contains(message_ref.id.as_str()) {
                continue;
            }

            // A fetch failure aborts the pass before any state is committed,
            // so no watermark progress is lost.
            let message = self
                .mail
                .fetch(message_ref)
                .await
                .with_context(|| format!("Failed to fetch message {}", message_ref.id))?;

            let sender_key = message.sender_email.trim().to_lowercase();
            let message_date = message.internal_date.map(|d| d.date_naive());

            if known.contains(&sender_key) {
                report.skipped_existing += 1;
                clean_messages += 1;
                observed.push(ObservedMessage {
                    id: message.id,
                    date: message_date,
                });
                continue;
            }

            tracing::info!(
                sender = %message.sender_email,
                subject = %message.subject,
                "classifying"
            );

            let verdict = match self
                .classifier
                .classify(
                    &message.sender_name,
                    &message.sender_email,
                    &message.subject,
                    &message.excerpt,
                )
                .await
            {
                Ok(verdict) => verdict,
                Err(e) => {
                    // Per-message failure: skip it and leave its ID out of
                    // the committed set so a later scan can retry.
                    tracing::warn!(message_id = %message.id, error = %e, "classification failed");
                    report.errors += 1;
                    continue;
                }
            };

            let judgment = verdict.clamp();
            clean_messages += 1;
            observed.push(ObservedMessage {
                id: message.id.clone(),
                date: message_date,
            });

            tracing::info!(
                category = %judgment.category,
                confidence = %judgment.confidence,
                should_include = judgment.should_include,
                "classified"
            );

            if !judgment.should_include {
                report.skipped_irrelevant += 1;
                continue;
            }

            if judgment.confidence == Confidence::Low {
                report.flagged_review += 1;
                pending_review.push(ReviewEntry {
                    sender_email: message.sender_email.clone(),
                    sender_name: message.sender_name.clone(),
                    subject: message.subject.clone(),
                    classification: judgment.category,
                    reason: judgment.rationale.clone(),
                });
                tracing::info!(sender = %message.sender_email, "flagged for manual review");
                continue;
            }

            if dry_run {
                tracing::info!(sender = %message.sender_email, "would add contact");
                report.added += 1;
                known.insert(sender_key);
            } else {
                let appended = self
                    .contacts
                    .append(NewContact {
                        email: message.sender_email.clone(),
                        name: message.sender_name.clone(),
                        source: ContactSource::GmailScan,
                        classification: Some(judgment.category),
                        notes: judgment.rationale.clone(),
                    })
                    .await
                    .context("Failed to append contact")?;

                if appended {
                    tracing::info!(sender = %message.sender_email, "added contact");
                    report.added += 1;
                } else {
                    // The store re-verified uniqueness and found the address.
                    report.skipped_existing += 1;
                }
                known.insert(sender_key);
            }
        }

        if !dry_run {
            self.review.append(&pending_review)?;
        }

        if clean_messages > 0 && !dry_run {
            let today = Utc::now().date_naive();
            let next = commit_state(&previous, today, &observed);
            self.state.save(&next)?;
            tracing::info!(watermark = %today, "scan state committed");
        } else {
            tracing::debug!("scan state not committed (dry run or nothing processed cleanly)");
        }

        self.unsubscribe_pass(watermark, &mut report, dry_run)
            .await?;

        Ok(report)
    }

    /// Second sweep: a loose recall query for unsubscribe-like mail, gated by
    /// the precise phrase pattern before anything is flipped.
    async fn unsubscribe_pass(
        &self,
        watermark: Option<chrono::NaiveDate>,
        report: &mut ScanReport,
        dry_run: bool,
    ) -> Result<()> {
        let query = build_unsubscribe_query(watermark);
        tracing::debug!(query = %query, "unsubscribe query");

        let refs = self
            .mail
            .search(&query, self.options.max_unsubscribe_results)
            .await
            .context("Failed to search for unsubscribe requests")?;

        let mut flipped: HashSet<String> = HashSet::new();

        for message_ref in &refs {
            // State is already committed; one bad message must not block the
            // remaining unsubscribe requests.
            let message = match self.mail.fetch(message_ref).await {
                Ok(message) => message,
                Err(e) => {
                    tracing::warn!(message_id = %message_ref.id, error = %e, "fetch failed");
                    continue;
                }
            };

            let sender = message.sender_email.trim().to_lowercase();
            if sender.is_empty() || self.is_own_address(&sender) {
                continue;
            }
            if flipped.contains(&sender) {
                continue;
            }

            let text = format!("{} {}", message.subject, message.excerpt);
            if !is_unsubscribe_request(&text) {
                continue;
            }

            match self
                .contacts
                .find_by_email(&sender)
                .await
                .context("Failed to look up contact")?
            {
                Some(contact) if contact.status == ContactStatus::Active => {
                    if dry_run {
                        tracing::info!(sender = %sender, "would unsubscribe");
                        report.unsubscribed += 1;
                        flipped.insert(sender);
                    } else if self
                        .contacts
                        .set_status(&sender, ContactStatus::Unsubscribed)
                        .await
                        .context("Failed to update contact status")?
                    {
                        tracing::info!(sender = %sender, "unsubscribed");
                        report.unsubscribed += 1;
                        flipped.insert(sender);
                    }
                }
                Some(_) => {
                    tracing::debug!(sender = %sender, "already unsubscribed");
                }
                None => {
                    tracing::debug!(sender = %sender, "unsubscribe request from unknown sender");
                }
            }
        }

        Ok(())
    }

    fn is_own_address(&self, sender: &str) -> bool {
        self.options
            .own_addresses
            .iter()
            .any(|own| !own.is_empty() && sender.contains(&own.to_lowercase()))
    }
}
