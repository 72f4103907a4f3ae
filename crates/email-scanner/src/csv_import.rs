//! Bulk import of contacts from a CSV export.
//!
//! Column names vary wildly between exports, so the email and name columns
//! are located by a small set of normalized candidate names rather than by
//! position.

use anyhow::{Context, Result};
use csv::StringRecord;
use std::collections::HashSet;
use std::path::Path;

use crate::store::ContactStore;
use shared_types::{is_valid_email, ContactSource, NewContact};

const EMAIL_COLUMNS: [&str; 5] = ["email", "e-mail", "email_address", "emailaddress", "mail"];
const NAME_COLUMNS: [&str; 6] = [
    "name",
    "full_name",
    "fullname",
    "contact_name",
    "contactname",
    "first_name",
];

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub added: usize,
    /// Rows whose email already exists in the store.
    pub skipped: usize,
    /// Rows with a missing or malformed email.
    pub invalid: usize,
}

pub async fn import_csv<S: ContactStore>(store: &S, path: &Path) -> Result<ImportReport> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open {}", path.display()))?;

    let headers = reader.headers().context("failed to read CSV header")?.clone();
    let email_col = find_column(&headers, &EMAIL_COLUMNS).with_context(|| {
        format!(
            "could not find an email column in header {:?} (expected one of {:?})",
            headers, EMAIL_COLUMNS
        )
    })?;
    let name_col = find_column(&headers, &NAME_COLUMNS);
    if name_col.is_none() {
        tracing::warn!("no name column found, names will be blank");
    }

    let existing = store
        .list_all()
        .await
        .context("Failed to load existing contacts")?;
    let mut known: HashSet<String> = existing.iter().map(|c| c.email_key()).collect();
    tracing::info!("{} contacts already in the list", known.len());

    let mut report = ImportReport::default();

    for record in reader.records() {
        let record = record.context("failed to read CSV record")?;

        let email = record.get(email_col).unwrap_or_default().trim().to_string();
        let name = name_col
            .and_then(|i| record.get(i))
            .unwrap_or_default()
            .trim()
            .to_string();

        if email.is_empty() || !is_valid_email(&email) {
            report.invalid += 1;
            continue;
        }

        let key = email.to_lowercase();
        if known.contains(&key) {
            report.skipped += 1;
            continue;
        }

        let appended = store
            .append(NewContact {
                email: email.clone(),
                name,
                source: ContactSource::CsvImport,
                classification: None,
                notes: "Imported from CSV".to_string(),
            })
            .await
            .context("Failed to append contact")?;

        if appended {
            report.added += 1;
            known.insert(key);
            tracing::info!(email = %email, "imported");
        } else {
            report.skipped += 1;
        }
    }

    Ok(report)
}

/// Locate a column by normalized name: trimmed, lower-cased, spaces replaced
/// with underscores, any BOM stripped.
fn find_column(headers: &StringRecord, candidates: &[&str]) -> Option<usize> {
    headers.iter().position(|h| {
        let normalized = h
            .trim_start_matches('\u{feff}')
            .trim()
            .to_lowercase()
            .replace(' ', "_");
        candidates.contains(&normalized.as_str())
    })
}
