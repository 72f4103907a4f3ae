pub mod classify;
pub mod token;
pub mod unsubscribe;

pub use classify::{Category, Classification, ClassifierVerdict, Confidence};
pub use token::TokenGenerator;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static EMAIL_SHAPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}$")
        .expect("email pattern is valid")
});

/// Shape check applied before accepting an address from a CSV row or a web
/// form. Deliberately loose; the mail system is the real validator.
pub fn is_valid_email(s: &str) -> bool {
    EMAIL_SHAPE.is_match(s.trim())
}

/// One row of the contact list.
///
/// `source` and `notes` are kept as the raw strings stored in the sheet;
/// rows written by hand or by older tooling may not match the enums below.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub email: String,
    pub name: String,
    pub source: String,
    pub date_added: Option<DateTime<Utc>>,
    pub classification: Option<Category>,
    pub status: ContactStatus,
    pub unsubscribe_token: String,
    pub notes: String,
}

impl Contact {
    /// Case-insensitive key used for dedupe checks.
    pub fn email_key(&self) -> String {
        self.email.trim().to_lowercase()
    }
}

/// Input for appending a contact. Date, status and unsubscribe token are
/// filled in by the store at append time.
#[derive(Debug, Clone)]
pub struct NewContact {
    pub email: String,
    pub name: String,
    pub source: ContactSource,
    pub classification: Option<Category>,
    pub notes: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactStatus {
    Active,
    Unsubscribed,
}

impl ContactStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContactStatus::Active => "active",
            ContactStatus::Unsubscribed => "unsubscribed",
        }
    }

    /// Blank or unknown status cells count as active, matching how rows
    /// created outside the scanner are treated.
    pub fn parse(s: &str) -> Self {
        match s.trim() {
            "unsubscribed" => ContactStatus::Unsubscribed,
            _ => ContactStatus::Active,
        }
    }
}

/// How a contact entered the list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactSource {
    GmailScan,
    CsvImport,
    WebsiteForm,
    Manual,
}

impl ContactSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContactSource::GmailScan => "gmail_scan",
            ContactSource::CsvImport => "csv_import",
            ContactSource::WebsiteForm => "website_form",
            ContactSource::Manual => "manual",
        }
    }
}

/// A classifier-accepted but low-confidence candidate, queued for manual
/// disposition. Never auto-promoted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewEntry {
    pub sender_email: String,
    pub sender_name: String,
    pub subject: String,
    pub classification: Category,
    pub reason: String,
}

/// End-of-run counts for one scan pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanReport {
    pub added: usize,
    pub skipped_existing: usize,
    pub skipped_irrelevant: usize,
    pub flagged_review: usize,
    pub unsubscribed: usize,
    pub errors: usize,
    pub dry_run: bool,
}
